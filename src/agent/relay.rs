//! Chat stream relay.
//!
//! Bridges the agent's live event stream onto the client response body.
//! Chunks pass through untouched and in arrival order; the agent already
//! frames its output as `data: ...\n\n` events, so the relay only ever
//! produces one frame of its own: the terminal error event emitted when the
//! upstream breaks mid-stream.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use log::{debug, warn};

/// Stable code carried by the terminal error event.
pub const CHAT_STREAM_ERROR_CODE: &str = "AGENT_CHAT_FAILED";

/// Render a terminal SSE error event for the given code.
pub fn error_event(code: &str) -> Bytes {
    let payload = serde_json::json!({ "type": "error", "content": code });
    Bytes::from(format!("data: {payload}\n\n"))
}

enum RelayState {
    /// Passing upstream chunks through.
    Streaming,
    /// Upstream broke; one terminal event is still owed to the client.
    Failing(Bytes),
    /// Torn down. No further reads or writes.
    Closed,
}

/// Relay for a single chat request.
///
/// Owns the upstream byte stream for its whole life. Dropping the relay
/// (axum drops the response body when the client disconnects) releases the
/// upstream connection immediately, which makes the agent abort generation.
pub struct ChatRelay {
    upstream: Option<BoxStream<'static, Result<Bytes, String>>>,
    state: RelayState,
}

impl ChatRelay {
    /// Wrap an upstream chunk stream.
    pub fn new<S, E>(upstream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        Self {
            upstream: Some(upstream.map(|r| r.map_err(|e| e.to_string())).boxed()),
            state: RelayState::Streaming,
        }
    }

    /// Tear down the relay. Safe to call more than once; only the first
    /// call releases the upstream connection.
    pub fn close(&mut self) {
        if self.upstream.take().is_some() {
            debug!("chat relay closed, upstream connection released");
        }
        self.state = RelayState::Closed;
    }

}

impl Stream for ChatRelay {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                RelayState::Closed => return Poll::Ready(None),
                RelayState::Failing(event) => {
                    let event = event.clone();
                    this.close();
                    return Poll::Ready(Some(Ok(event)));
                }
                RelayState::Streaming => {
                    let Some(upstream) = this.upstream.as_mut() else {
                        this.state = RelayState::Closed;
                        return Poll::Ready(None);
                    };
                    match upstream.poll_next_unpin(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Some(Ok(chunk))) => return Poll::Ready(Some(Ok(chunk))),
                        Poll::Ready(Some(Err(reason))) => {
                            warn!("chat stream broke mid-relay: {reason}");
                            // Release the upstream now; the pending terminal
                            // event no longer needs it.
                            this.upstream.take();
                            this.state = RelayState::Failing(error_event(CHAT_STREAM_ERROR_CODE));
                        }
                        Poll::Ready(None) => {
                            this.close();
                            return Poll::Ready(None);
                        }
                    }
                }
            }
        }
    }
}

impl Drop for ChatRelay {
    fn drop(&mut self) {
        self.close();
    }
}
