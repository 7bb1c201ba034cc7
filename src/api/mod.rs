//! HTTP API module.
//!
//! Router, shared state, envelope errors, and the request handlers that
//! forward to the agent service.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{AgentOp, ApiError, ApiResult, ErrorEnvelope};
pub use routes::create_router;
pub use state::AppState;
