//! Agentgate Library
//!
//! Core components of the agent gateway: the upstream agent client, the
//! chat stream relay, the HTTP API, and JWT authentication.

pub mod agent;
pub mod api;
pub mod auth;
