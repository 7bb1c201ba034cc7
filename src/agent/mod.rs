//! Agent service integration.
//!
//! Client, error classification, and the chat stream relay for the remote
//! conversational agent service.

mod client;
mod error;
mod relay;

pub use client::{AgentClient, AgentConfig};
pub use error::{AgentError, AgentResult};
pub use relay::{CHAT_STREAM_ERROR_CODE, ChatRelay, error_event};
