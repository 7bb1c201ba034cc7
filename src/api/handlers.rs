//! API request handlers.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::agent::ChatRelay;
use crate::auth::CurrentUser;

use super::error::{AgentOp, ApiError, ApiResult};
use super::state::AppState;

/// Wrap a successful upstream body in the gateway envelope.
fn ok(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Create a new agent session for the authenticated user.
pub async fn create_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Value>> {
    info!(user_id = %user.user_id(), "creating agent session");
    let data = state
        .agent
        .create_session(user.user_id())
        .await
        .map_err(|e| ApiError::agent(AgentOp::CreateSession, e))?;
    Ok(ok(data))
}

/// List the authenticated user's agent sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let data = state
        .agent
        .list_sessions(user.user_id())
        .await
        .map_err(|e| ApiError::agent(AgentOp::ListSessions, e))?;
    Ok(ok(data))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

/// Rename an agent session.
pub async fn rename_session(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(session_id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> ApiResult<Json<Value>> {
    let data = state
        .agent
        .rename_session(&session_id, &request.title)
        .await
        .map_err(|e| ApiError::agent(AgentOp::RenameSession, e))?;
    Ok(ok(data))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub hard: bool,
}

/// Delete an agent session. `?hard=true` requests permanent removal.
pub async fn delete_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<Value>> {
    info!(
        user_id = %user.user_id(),
        session_id = %session_id,
        hard = params.hard,
        "deleting agent session"
    );
    let data = state
        .agent
        .delete_session(&session_id, params.hard)
        .await
        .map_err(|e| ApiError::agent(AgentOp::DeleteSession, e))?;
    Ok(ok(data))
}

/// Fetch the message history of an agent session.
pub async fn session_messages(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let data = state
        .agent
        .history(&session_id)
        .await
        .map_err(|e| ApiError::agent(AgentOp::History, e))?;
    Ok(ok(data))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// `sessionId` is accepted for older clients.
    #[serde(default, alias = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub text: String,
}

/// Bridge a chat request into a live event stream.
///
/// Everything that can fail does so before the first byte is written: the
/// response is committed as `text/event-stream` only once the agent has
/// accepted the request. From then on failures surface as one in-band
/// terminal error event, never as rewritten headers.
pub async fn chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if request.session_id.trim().is_empty() || request.text.trim().is_empty() {
        return Err(ApiError::MissingFields("session_id, text"));
    }

    debug!(
        user_id = %user.user_id(),
        session_id = %request.session_id,
        "opening chat stream"
    );

    let stream = state
        .agent
        .open_chat(&request.session_id, &request.text)
        .await
        .map_err(|e| ApiError::agent(AgentOp::Chat, e))?;

    let body = Body::from_stream(ChatRelay::new(stream));

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .header("X-Accel-Buffering", "no") // Disable nginx buffering if present
        .body(body)
        .map_err(|e| ApiError::internal(format!("failed to build stream response: {e}")))
}
