//! Gateway integration tests.
//!
//! Each test stands up a real mock agent on an ephemeral port and drives
//! the gateway router directly with `tower::ServiceExt::oneshot`.

use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query},
    http::{Method, Request, Response, StatusCode, header},
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{TEST_USER, hit_counter, serve_mock, test_app, test_app_with_timeout, unused_port};

fn authed_request(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Test that health endpoint works without authentication.
#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = test_app("http://127.0.0.1:1");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

/// Test that protected endpoints require authentication.
#[tokio::test]
async fn test_chat_requires_auth() {
    let (app, _) = test_app("http://127.0.0.1:1");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/agent/chat")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"session_id": "s1", "text": "hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "UNAUTHENTICATED");
}

/// Test that a garbage token is rejected.
#[tokio::test]
async fn test_invalid_token_rejected() {
    let (app, _) = test_app("http://127.0.0.1:1");

    let response = app
        .oneshot(authed_request(
            Method::GET,
            "/api/agent/sessions/list",
            "not-a-real-token",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Test that empty chat fields are rejected before any upstream contact.
#[tokio::test]
async fn test_chat_missing_fields_skips_upstream() {
    let hits = hit_counter();
    let h = hits.clone();
    let mock = Router::new().route(
        "/chat",
        post(move || {
            let h = h.clone();
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            }
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    for body in [
        json!({}),
        json!({"session_id": "", "text": "hi"}),
        json!({"session_id": "s1", "text": "   "}),
    ] {
        let response = app
            .clone()
            .oneshot(authed_request(
                Method::POST,
                "/api/agent/chat",
                &token,
                Some(body),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "MISSING_REQUIRED_FIELDS");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

/// Test the streaming happy path: chunks arrive in order under SSE headers.
#[tokio::test]
async fn test_chat_streams_events_in_order() {
    let mock = Router::new().route(
        "/chat",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["session_id"], "s1");
            assert_eq!(body["text"], "hello");
            let chunks: Vec<Result<Bytes, Infallible>> = vec![
                Ok(Bytes::from("data: {\"type\":\"delta\",\"content\":\"hel\"}\n\n")),
                Ok(Bytes::from("data: {\"type\":\"delta\",\"content\":\"lo\"}\n\n")),
            ];
            Response::builder()
                .header("Content-Type", "text/event-stream")
                .body(Body::from_stream(futures::stream::iter(chunks)))
                .unwrap()
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::POST,
            "/api/agent/chat",
            &token,
            Some(json!({"session_id": "s1", "text": "hello"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    assert_eq!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let text = std::str::from_utf8(&body).unwrap();
    assert_eq!(
        text,
        "data: {\"type\":\"delta\",\"content\":\"hel\"}\n\ndata: {\"type\":\"delta\",\"content\":\"lo\"}\n\n"
    );
}

/// Test that the deprecated `sessionId` field name still works.
#[tokio::test]
async fn test_chat_accepts_legacy_session_id_field() {
    let mock = Router::new().route(
        "/chat",
        post(|| async {
            let chunks: Vec<Result<Bytes, Infallible>> =
                vec![Ok(Bytes::from("data: {\"type\":\"done\"}\n\n"))];
            Response::builder()
                .header("Content-Type", "text/event-stream")
                .body(Body::from_stream(futures::stream::iter(chunks)))
                .unwrap()
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::POST,
            "/api/agent/chat",
            &token,
            Some(json!({"sessionId": "s1", "text": "hello"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test that a pre-stream rejection surfaces as a JSON error, not a stream.
#[tokio::test]
async fn test_chat_upstream_rejection_is_json_error() {
    let mock = Router::new().route(
        "/chat",
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "agent busy"})),
            )
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::POST,
            "/api/agent/chat",
            &token,
            Some(json!({"session_id": "s1", "text": "hello"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("application/json"));

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "AGENT_CHAT_FAILED");
    assert_eq!(json["detail"]["error"], "agent busy");
}

/// Test that an unreachable agent maps to a 500 with the chat code.
#[tokio::test]
async fn test_chat_unreachable_agent() {
    let port = unused_port().await;
    let (app, token) = test_app(&format!("http://127.0.0.1:{port}"));

    let response = app
        .oneshot(authed_request(
            Method::POST,
            "/api/agent/chat",
            &token,
            Some(json!({"session_id": "s1", "text": "hello"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "AGENT_CHAT_FAILED");
}

/// Test that a slow agent trips the deadline with the timeout code.
#[tokio::test]
async fn test_chat_deadline_expiry() {
    let mock = Router::new().route(
        "/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app_with_timeout(&format!("http://{addr}"), 1);

    let response = app
        .oneshot(authed_request(
            Method::POST,
            "/api/agent/chat",
            &token,
            Some(json!({"session_id": "s1", "text": "hello"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "AGENT_TIMEOUT");
}

/// Test that session creation forwards the authenticated user's ID.
#[tokio::test]
async fn test_create_session_forwards_user_id() {
    let mock = Router::new().route(
        "/sessions",
        post(|Json(body): Json<Value>| async move {
            Json(json!({"id": "sess_1", "user_id": body["user_id"]}))
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::POST,
            "/api/agent/sessions",
            &token,
            Some(json!({})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["id"], "sess_1");
    assert_eq!(json["data"]["user_id"], TEST_USER);
}

/// Test that the session list is scoped to the authenticated user.
#[tokio::test]
async fn test_list_sessions_forwards_user_id() {
    let mock = Router::new().route(
        "/sessions/list",
        get(
            |Query(params): Query<std::collections::HashMap<String, String>>| async move {
                Json(json!([{"id": "s1", "user_id": params["user_id"]}]))
            },
        ),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::GET,
            "/api/agent/sessions/list",
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"][0]["user_id"], TEST_USER);
}

/// Test that rename forwards the title verbatim.
#[tokio::test]
async fn test_rename_session_forwards_title() {
    let mock = Router::new().route(
        "/sessions/{session_id}/title",
        patch(
            |Path(session_id): Path<String>, Json(body): Json<Value>| async move {
                Json(json!({"id": session_id, "title": body["title"]}))
            },
        ),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::PATCH,
            "/api/agent/sessions/s1/title",
            &token,
            Some(json!({"title": "Trip planning"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["id"], "s1");
    assert_eq!(json["data"]["title"], "Trip planning");
}

/// Test that the hard-delete flag reaches the agent.
#[tokio::test]
async fn test_delete_session_forwards_hard_flag() {
    let mock = Router::new().route(
        "/sessions/{session_id}",
        delete(
            |Path(session_id): Path<String>,
             Query(params): Query<std::collections::HashMap<String, String>>| async move {
                Json(json!({"deleted": session_id, "hard": params["hard"]}))
            },
        ),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::DELETE,
            "/api/agent/sessions/s1?hard=true",
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["deleted"], "s1");
    assert_eq!(json["data"]["hard"], "true");
}

/// Test that a delete rejection mirrors the agent's status and body.
#[tokio::test]
async fn test_delete_session_mirrors_upstream_error() {
    let mock = Router::new().route(
        "/sessions/{session_id}",
        delete(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "session not found"})),
            )
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::DELETE,
            "/api/agent/sessions/missing",
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "AGENT_SESSION_DELETE_FAILED");
    assert_eq!(json["detail"]["error"], "session not found");
}

/// Test that an unreachable agent maps list failures to the list code.
#[tokio::test]
async fn test_list_sessions_unreachable_agent() {
    let port = unused_port().await;
    let (app, token) = test_app(&format!("http://127.0.0.1:{port}"));

    let response = app
        .oneshot(authed_request(
            Method::GET,
            "/api/agent/sessions/list",
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "AGENT_SESSION_LIST_FAILED");
}

/// Test fetching session history through the gateway.
#[tokio::test]
async fn test_session_messages() {
    let mock = Router::new().route(
        "/sessions/{session_id}/messages",
        get(|Path(session_id): Path<String>| async move {
            Json(json!([
                {"session_id": session_id, "role": "user", "text": "hi"},
                {"session_id": session_id, "role": "assistant", "text": "hello"},
            ]))
        }),
    );
    let addr = serve_mock(mock).await;
    let (app, token) = test_app(&format!("http://{addr}"));

    let response = app
        .oneshot(authed_request(
            Method::GET,
            "/api/agent/sessions/s1/messages",
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"][1]["role"], "assistant");
}
