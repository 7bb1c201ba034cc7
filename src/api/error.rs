//! Unified API error handling with enveloped responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::agent::AgentError;

/// The gateway operation an agent failure occurred in. Picks the stable
/// error code surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOp {
    CreateSession,
    ListSessions,
    RenameSession,
    DeleteSession,
    Chat,
    History,
}

impl AgentOp {
    fn error_code(self) -> &'static str {
        match self {
            Self::CreateSession => "AGENT_SESSION_CREATE_FAILED",
            Self::ListSessions => "AGENT_SESSION_LIST_FAILED",
            Self::RenameSession => "AGENT_SESSION_RENAME_FAILED",
            Self::DeleteSession => "AGENT_SESSION_DELETE_FAILED",
            Self::Chat => "AGENT_CHAT_FAILED",
            Self::History => "AGENT_HISTORY_FETCH_FAILED",
        }
    }
}

impl std::fmt::Display for AgentOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateSession => "create session",
            Self::ListSessions => "list sessions",
            Self::RenameSession => "rename session",
            Self::DeleteSession => "delete session",
            Self::Chat => "chat",
            Self::History => "history",
        };
        write!(f, "{name}")
    }
}

/// API error type with enveloped responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required fields: {0}")]
    MissingFields(&'static str),

    #[error("authentication required")]
    Unauthenticated,

    #[error("agent {op} failed: {source}")]
    Agent {
        op: AgentOp,
        #[source]
        source: AgentError,
    },

    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn agent(op: AgentOp, source: AgentError) -> Self {
        Self::Agent { op, source }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Agent { source, .. } => source.status(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "MISSING_REQUIRED_FIELDS",
            Self::Unauthenticated => "UNAUTHENTICATED",
            // A deadline expiry carries its own code regardless of which
            // operation hit it.
            Self::Agent { source, .. } if source.is_timeout() => "AGENT_TIMEOUT",
            Self::Agent { op, .. } => op.error_code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn detail(&self) -> Option<Value> {
        match self {
            Self::Agent { source, .. } => source.detail().cloned(),
            _ => None,
        }
    }
}

/// Enveloped error body: `{success: false, error, detail?}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::Internal(_) => {
                error!(error_code = code, message = %message, "API error");
            }
            ApiError::Agent { source, .. } => match source {
                AgentError::Unreachable { .. } | AgentError::Local(_) => {
                    error!(error_code = code, message = %message, "agent call failed");
                }
                AgentError::Timeout => {
                    warn!(error_code = code, message = %message, "agent call timed out");
                }
                AgentError::Rejected { .. } => {
                    tracing::debug!(error_code = code, message = %message, "agent rejection");
                }
            },
            _ => {
                tracing::debug!(error_code = code, message = %message, "client error");
            }
        }

        let body = ErrorEnvelope {
            success: false,
            error: code,
            detail: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

/// Convert auth errors to API errors. Everything the auth layer raises
/// during request handling is a 401 to the client.
impl From<crate::auth::AuthError> for ApiError {
    fn from(_: crate::auth::AuthError) -> Self {
        ApiError::Unauthenticated
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
