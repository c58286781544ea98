//! HTTP/WebSocket surface for the orchestrator — the tool/command layer's
//! way in, plus the ingress endpoint the execution host posts status events
//! to.

pub mod handlers;
pub mod server;

pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
