//! Ollama Gateway - exposes a local Ollama server through an authenticated HTTP gateway.
//!
//! The gateway supervises the Ollama backend as a child process, blocks serving
//! behind a readiness gate, and then either relays authenticated HTTP traffic to
//! the backend or exports the backend port through an external tunnel client.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod logging;
pub mod proxy;
pub mod state;
pub mod supervisor;
pub mod tunnel;

pub use config::Config;
pub use error::{Error, Result};
pub use proxy::ProxyClient;
pub use state::AppState;
pub use supervisor::BackendProcess;
