//! Gateway initialization and shutdown.
//!
//! Explicit `initialize` / `shutdown` pair invoked by the gateway's own main
//! routine. Each serving entry point runs through `initialize` itself, so the
//! readiness gate is re-run wherever the backend is freshly started.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::error::Result;
use crate::health;
use crate::supervisor::{BackendProcess, BackendState};

/// Handle to an initialized gateway: a supervised, healthy backend.
pub struct Gateway {
    pub backend: Arc<BackendProcess>,
    shutdown_timeout_secs: u64,
}

/// Start the backend and block until it is healthy.
///
/// Fails fatally (terminating the child) if the backend exits during startup
/// or the configured startup timeout elapses.
pub async fn initialize(config: &Config) -> Result<Gateway> {
    let backend = Arc::new(BackendProcess::start(
        &config.backend.command,
        &config.backend.args,
    )?);

    let client = Client::new();
    let gate = health::await_healthy(
        &client,
        &config.backend.base_url(),
        Some(backend.as_ref()),
        Duration::from_secs(config.backend.poll_interval_secs),
        config.backend.startup_timeout_secs.map(Duration::from_secs),
    )
    .await;

    if let Err(e) = gate {
        backend.terminate(config.backend.shutdown_timeout_secs).await;
        return Err(e);
    }

    backend.set_state(BackendState::Running).await;

    Ok(Gateway {
        backend,
        shutdown_timeout_secs: config.backend.shutdown_timeout_secs,
    })
}

impl Gateway {
    /// Terminate the backend and reclaim resources.
    pub async fn shutdown(self) {
        self.backend.terminate(self.shutdown_timeout_secs).await;
    }
}
