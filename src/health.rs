//! Readiness gate for the backend server.
//!
//! The gate is a blocking barrier run at the start of each serving entry
//! point, never a background task. Nothing is forwarded to the backend before
//! the gate has reported healthy once.

use std::time::{Duration, Instant};

use reqwest::Client;

use crate::error::{Error, Result};
use crate::supervisor::BackendProcess;

/// Timeout applied to each individual readiness probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of a single readiness probe. Derived per poll, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// No probe has completed yet.
    Unknown,
}

/// Probe the backend root endpoint once.
///
/// A response with a success status is healthy; an error status or any
/// connection-level failure is unhealthy.
pub async fn probe(client: &Client, base_url: &str) -> HealthStatus {
    let url = format!("{}/", base_url.trim_end_matches('/'));

    match client.get(&url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) if response.status().is_success() => HealthStatus::Healthy,
        Ok(response) => {
            tracing::debug!("Probe to {} returned {}", url, response.status());
            HealthStatus::Unhealthy
        }
        Err(e) => {
            tracing::debug!("Probe to {} failed: {}", url, e);
            HealthStatus::Unhealthy
        }
    }
}

/// Block until the backend reports healthy.
///
/// Polls at a fixed interval, logging a waiting line each iteration. Fails
/// fatally when the supervised process exits during startup or when the
/// optional timeout elapses.
pub async fn await_healthy(
    client: &Client,
    base_url: &str,
    backend: Option<&BackendProcess>,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<()> {
    let start = Instant::now();
    let mut last = HealthStatus::Unknown;

    loop {
        if let Some(bound) = timeout {
            if start.elapsed() > bound {
                return Err(Error::Startup(format!(
                    "backend at {} not healthy after {:?}",
                    base_url,
                    start.elapsed()
                )));
            }
        }

        if let Some(backend) = backend {
            if !backend.is_alive().await {
                return Err(Error::Startup(
                    "backend process exited during startup".to_string(),
                ));
            }
        }

        let status = probe(client, base_url).await;
        if status != last {
            tracing::debug!("Backend health: {:?} -> {:?}", last, status);
            last = status;
        }

        if status == HealthStatus::Healthy {
            tracing::info!("Backend at {} is healthy ({:?})", base_url, start.elapsed());
            return Ok(());
        }

        tracing::info!("Waiting for backend to become ready ...");
        tokio::time::sleep(poll_interval).await;
    }
}
