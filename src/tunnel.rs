//! Tunnel export: publish the backend port through an external tunnel client.
//!
//! The tunnel client (e.g. cloudflared) runs as a child process; the mapping
//! lives exactly as long as that process. Teardown is guaranteed on every
//! exit path: `close` on the normal paths, `kill_on_drop` otherwise.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::RwLock;

use crate::config::{Config, TunnelConfig};
use crate::error::{Error, Result};
use crate::supervisor::BackendProcess;

const IDLE_TICK: Duration = Duration::from_secs(1);

/// A public-endpoint-to-local-port mapping owned by this process.
pub struct Tunnel {
    pub public_url: String,
    pub local_port: u16,
    process: RwLock<Option<Child>>,
}

/// Spawn the tunnel client for `port` and wait for it to publish its URL.
pub async fn export(config: &TunnelConfig, port: u16) -> Result<Tunnel> {
    let mut cmd = Command::new(&config.command);
    for arg in &config.args {
        cmd.arg(arg.replace("{port}", &port.to_string()));
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        Error::Startup(format!(
            "failed to spawn tunnel client '{}': {}",
            config.command, e
        ))
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Internal("tunnel client stdout not captured".to_string()))?;

    let public_url = match tokio::time::timeout(
        Duration::from_secs(config.url_timeout_secs),
        read_public_url(stdout),
    )
    .await
    {
        Ok(Some(url)) => url,
        Ok(None) => {
            let _ = child.kill().await;
            return Err(Error::Startup(
                "tunnel client exited before publishing a URL".to_string(),
            ));
        }
        Err(_timeout) => {
            let _ = child.kill().await;
            return Err(Error::Startup(format!(
                "tunnel client did not publish a URL within {}s",
                config.url_timeout_secs
            )));
        }
    };

    Ok(Tunnel {
        public_url,
        local_port: port,
        process: RwLock::new(Some(child)),
    })
}

async fn read_public_url(stdout: tokio::process::ChildStdout) -> Option<String> {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!("tunnel client: {}", line);
        if let Some(url) = extract_url(&line) {
            return Some(url);
        }
    }
    None
}

/// Pull the first http(s) URL out of a tunnel client output line.
fn extract_url(line: &str) -> Option<String> {
    line.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != ':' && c != '/'))
        .find(|token| token.starts_with("https://") || token.starts_with("http://"))
        .map(str::to_string)
}

impl Tunnel {
    pub async fn is_alive(&self) -> bool {
        let mut process = self.process.write().await;
        match *process {
            Some(ref mut child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Tear the tunnel down by terminating the client process.
    pub async fn close(&self) {
        let mut process_guard = self.process.write().await;
        if let Some(mut child) = process_guard.take() {
            #[cfg(unix)]
            {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;

                if let Some(pid) = child.id() {
                    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                }
            }

            match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(_) => tracing::info!("Tunnel to port {} closed", self.local_port),
                Err(_timeout) => {
                    tracing::warn!("Tunnel client didn't stop gracefully, killing");
                    let _ = child.kill().await;
                }
            }
        }
    }
}

/// Export the backend port and keep the tunnel alive until termination.
///
/// Idles in a fixed 1-second loop; backend or tunnel-client death surfaces as
/// an error rather than leaving a dead mapping being served.
pub async fn export_and_serve(config: &Config, backend: &BackendProcess) -> Result<()> {
    let tunnel = export(&config.tunnel, config.backend.port).await?;

    tracing::info!(
        "Tunnel established: {} -> localhost:{}",
        tunnel.public_url,
        tunnel.local_port
    );
    println!("tunnel.url = {}", tunnel.public_url);

    let result = idle(backend, &tunnel).await;
    tunnel.close().await;
    result
}

async fn idle(backend: &BackendProcess, tunnel: &Tunnel) -> Result<()> {
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    return Err(Error::Internal(format!("failed to listen for shutdown signal: {}", e)));
                }
                tracing::info!("Shutdown signal received, closing tunnel");
                return Ok(());
            }
            _ = tokio::time::sleep(IDLE_TICK) => {
                if !backend.is_alive().await {
                    return Err(Error::Startup(
                        "backend process exited while tunnel was active".to_string(),
                    ));
                }
                if !tunnel.is_alive().await {
                    return Err(Error::Startup(
                        "tunnel client exited unexpectedly".to_string(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_url_plain() {
        assert_eq!(
            extract_url("https://rapid-example.trycloudflare.com"),
            Some("https://rapid-example.trycloudflare.com".to_string())
        );
    }

    #[test]
    fn test_extract_url_embedded_in_log_line() {
        let line = "2024-01-01T00:00:00Z INF |  https://rapid-example.trycloudflare.com  |";
        assert_eq!(
            extract_url(line),
            Some("https://rapid-example.trycloudflare.com".to_string())
        );
    }

    #[test]
    fn test_extract_url_none() {
        assert_eq!(extract_url("Starting tunnel client ..."), None);
        assert_eq!(extract_url(""), None);
    }

    #[tokio::test]
    async fn test_export_missing_binary_fails() {
        let config = TunnelConfig {
            command: "/nonexistent/tunnel-client".to_string(),
            args: vec![],
            url_timeout_secs: 1,
        };
        match export(&config, 11434).await {
            Err(Error::Startup(msg)) => assert!(msg.contains("tunnel client")),
            _ => panic!("Expected Startup error"),
        }
    }

    #[tokio::test]
    async fn test_export_reads_url_from_stdout() {
        let config = TunnelConfig {
            command: "echo".to_string(),
            args: vec![
                "INF box | https://unit-test.trycloudflare.com |".to_string(),
                "{port}".to_string(),
            ],
            url_timeout_secs: 5,
        };
        let tunnel = export(&config, 11434).await.unwrap();
        assert_eq!(tunnel.public_url, "https://unit-test.trycloudflare.com");
        assert_eq!(tunnel.local_port, 11434);
        tunnel.close().await;
    }

    #[tokio::test]
    async fn test_export_fails_when_client_exits_without_url() {
        let config = TunnelConfig {
            command: "true".to_string(),
            args: vec![],
            url_timeout_secs: 5,
        };
        match export(&config, 11434).await {
            Err(Error::Startup(msg)) => assert!(msg.contains("before publishing")),
            _ => panic!("Expected Startup error"),
        }
    }
}
