//! Agent client error types.
//!
//! Every failed upstream call collapses into exactly one of these variants,
//! so handlers can map a failure to an HTTP status without inspecting
//! transport details themselves.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur when talking to the agent service.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent responded, but with a non-success status.
    #[error("agent rejected the request with status {status}")]
    Rejected {
        status: StatusCode,
        /// Response body, if it could be read as JSON.
        body: Option<Value>,
    },

    /// No response at all: refused connection, DNS failure, broken transport.
    #[error("agent unreachable: {source}")]
    Unreachable {
        #[source]
        source: reqwest::Error,
    },

    /// The agent did not produce a response within the configured deadline.
    #[error("agent did not respond within the deadline")]
    Timeout,

    /// A fault on our side of the call (request construction, invalid URL).
    #[error("agent request failed locally: {0}")]
    Local(String),
}

impl AgentError {
    /// HTTP status to surface to the client for this failure.
    ///
    /// A received upstream status is mirrored verbatim; a deadline expiry
    /// maps to 504; everything else is a plain 500.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rejected { status, .. } => *status,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Unreachable { .. } | Self::Local(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream response body to forward as `detail`, when one was received.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            Self::Rejected { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Whether this failure was a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::Local(err.to_string())
        } else {
            Self::Unreachable { source: err }
        }
    }
}

impl From<tokio::time::error::Elapsed> for AgentError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}
