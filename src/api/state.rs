//! Application state shared across handlers.

use std::sync::Arc;

use crate::agent::AgentClient;
use crate::auth::AuthState;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Client for the upstream agent service.
    pub agent: Arc<AgentClient>,
    /// Authentication state.
    pub auth: AuthState,
}

impl AppState {
    /// Create new application state.
    pub fn new(agent: AgentClient, auth: AuthState) -> Self {
        Self {
            agent: Arc::new(agent),
            auth,
        }
    }
}
