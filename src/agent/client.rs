//! Agent service HTTP client.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::{AgentError, AgentResult};

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Agent service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of the agent service (e.g., "http://localhost:8001").
    pub base_url: String,
    /// Deadline for the agent's initial response, in seconds.
    ///
    /// Applies to the response head only. Once a chat stream is open it may
    /// run for as long as the agent keeps producing events.
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Client for communicating with the agent service.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct AgentClient {
    /// HTTP client.
    client: Client,
    /// Base URL for the agent service.
    base_url: String,
    /// Deadline for the initial response of every call.
    request_timeout: Duration,
}

impl AgentClient {
    /// Create a new agent client from configuration.
    pub fn new(config: &AgentConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Create a session for a user.
    pub async fn create_session(&self, user_id: &str) -> AgentResult<Value> {
        let url = format!("{}/sessions", self.base_url);
        let request = self.client.post(&url).json(&json!({ "user_id": user_id }));
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    /// List all sessions belonging to a user.
    pub async fn list_sessions(&self, user_id: &str) -> AgentResult<Value> {
        let url = format!("{}/sessions/list", self.base_url);
        let request = self.client.get(&url).query(&[("user_id", user_id)]);
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    /// Rename a session.
    pub async fn rename_session(&self, session_id: &str, title: &str) -> AgentResult<Value> {
        let url = format!("{}/sessions/{}/title", self.base_url, session_id);
        let request = self.client.patch(&url).json(&json!({ "title": title }));
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    /// Delete a session. `hard` requests permanent removal.
    pub async fn delete_session(&self, session_id: &str, hard: bool) -> AgentResult<Value> {
        let url = format!("{}/sessions/{}", self.base_url, session_id);
        let request = self
            .client
            .delete(&url)
            .query(&[("hard", if hard { "true" } else { "false" })]);
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    /// Fetch the message history of a session.
    pub async fn history(&self, session_id: &str) -> AgentResult<Value> {
        let url = format!("{}/sessions/{}/messages", self.base_url, session_id);
        let request = self.client.get(&url);
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    /// Open a chat event stream.
    ///
    /// Waits for the agent's response head within the deadline, checks the
    /// status, and hands the raw byte stream back to the caller. No body
    /// bytes are consumed here, so the caller decides the full response
    /// shape before the first event is relayed.
    pub async fn open_chat(
        &self,
        session_id: &str,
        text: &str,
    ) -> AgentResult<BoxStream<'static, Result<Bytes, reqwest::Error>>> {
        let url = format!("{}/chat", self.base_url);
        debug!("opening chat stream for session {session_id}");

        let request = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&json!({ "session_id": session_id, "text": text }));
        let response = self.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.ok();
            return Err(AgentError::Rejected { status, body });
        }

        Ok(response.bytes_stream().boxed())
    }

    /// Send a request, bounding the wait for the response head.
    async fn send(&self, request: reqwest::RequestBuilder) -> AgentResult<reqwest::Response> {
        let response = tokio::time::timeout(self.request_timeout, request.send()).await??;
        Ok(response)
    }

    /// Check the status and parse the JSON body, or classify the rejection.
    async fn handle_response(&self, response: reqwest::Response) -> AgentResult<Value> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| AgentError::Local(format!("failed to parse agent response: {e}")))
        } else {
            let body = response.json::<Value>().await.ok();
            Err(AgentError::Rejected { status, body })
        }
    }
}
