//! Test utilities and common setup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use agentgate::agent::{AgentClient, AgentConfig};
use agentgate::api::{self, AppState};
use agentgate::auth::{AuthConfig, AuthState};
use axum::Router;
use tokio::net::TcpListener;

/// User ID baked into the test token.
pub const TEST_USER: &str = "usr_test";

/// Create a test AuthConfig with a JWT secret for testing.
fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Some("test-secret-for-integration-tests-minimum-32-chars".to_string()),
        ..AuthConfig::default()
    }
}

/// Create a gateway pointed at the given agent URL, plus a valid token.
pub fn test_app(agent_url: &str) -> (Router, String) {
    test_app_with_timeout(agent_url, 5)
}

/// Same as [`test_app`] with a custom initial-response deadline.
pub fn test_app_with_timeout(agent_url: &str, timeout_secs: u64) -> (Router, String) {
    let auth_state = AuthState::new(test_auth_config());
    let token = auth_state.generate_token(TEST_USER).unwrap();

    let agent = AgentClient::new(&AgentConfig {
        base_url: agent_url.to_string(),
        request_timeout_secs: timeout_secs,
    });

    let state = AppState::new(agent, auth_state);
    (api::create_router(state), token)
}

/// Serve a mock agent on an ephemeral port and return its address.
pub async fn serve_mock(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Shared request counter for mock agents.
pub fn hit_counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Reserve a port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
