//! Authentication error types.

use thiserror::Error;

/// Errors raised while authenticating a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token in the cookie or the Authorization header.
    #[error("no token provided")]
    MissingToken,

    /// The token failed signature or claim validation.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token's `exp` claim is in the past.
    #[error("token has expired")]
    TokenExpired,

    /// Internal authentication failure.
    #[error("authentication error: {0}")]
    Internal(String),
}
