//! Ollama gateway: bearer-token authenticated reverse proxy for a local
//! inference server.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! in `tests/` drive them through the library target.

use crate::middleware::auth::Authenticator;
use crate::proxy::forward::ForwardingEngine;

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod proxy;
pub mod store;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub auth: Authenticator,
    pub engine: ForwardingEngine,
}
