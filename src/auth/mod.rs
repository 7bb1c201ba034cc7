//! Authentication module.
//!
//! Verifies JWTs minted by the external identity provider and attaches the
//! resulting identity to the request. Dev mode falls back to a built-in
//! secret so local setups work without configuration.

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::Claims;
pub use config::{AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, auth_middleware};
