//! Backend process supervision.
//!
//! The Ollama server runs as a child process owned by the gateway. Its
//! stdout/stderr are inherited so backend logs show up alongside gateway logs.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Liveness state of the supervised backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// Process spawned, readiness gate not yet passed.
    Starting,
    /// Readiness gate passed, backend is serving.
    Running,
    /// Process has exited.
    Exited,
}

/// Handle to the running backend child process.
pub struct BackendProcess {
    command: String,
    state: RwLock<BackendState>,
    process: RwLock<Option<Child>>,
}

impl BackendProcess {
    /// Spawn the backend. Non-blocking: returns as soon as the process starts.
    pub fn start(command: &str, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            Error::Startup(format!("failed to spawn backend '{}': {}", command, e))
        })?;

        tracing::info!(
            "Spawned backend '{} {}' (pid: {:?})",
            command,
            args.join(" "),
            child.id()
        );

        Ok(Self {
            command: command.to_string(),
            state: RwLock::new(BackendState::Starting),
            process: RwLock::new(Some(child)),
        })
    }

    pub async fn state(&self) -> BackendState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: BackendState) {
        *self.state.write().await = state;
    }

    /// Check if the backend process is still alive.
    pub async fn is_alive(&self) -> bool {
        let mut process = self.process.write().await;
        let alive = if let Some(ref mut child) = *process {
            match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    tracing::error!("Backend '{}' exited with {}", self.command, status);
                    false
                }
                Err(e) => {
                    tracing::error!("Error checking backend '{}': {}", self.command, e);
                    false
                }
            }
        } else {
            false
        };
        drop(process);

        if !alive {
            self.set_state(BackendState::Exited).await;
        }
        alive
    }

    /// Terminate the backend gracefully, killing it after the timeout.
    pub async fn terminate(&self, timeout_secs: u64) {
        let mut process_guard = self.process.write().await;
        if let Some(mut child) = process_guard.take() {
            // Try SIGTERM first on Unix
            #[cfg(unix)]
            {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;

                if let Some(pid) = child.id() {
                    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                }
            }

            let wait_result =
                tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await;

            match wait_result {
                Ok(Ok(status)) => {
                    tracing::debug!("Backend '{}' exited with {}", self.command, status);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Error waiting for backend '{}': {}", self.command, e);
                }
                Err(_timeout) => {
                    tracing::warn!("Backend '{}' didn't stop gracefully, killing", self.command);
                    let _ = child.kill().await;
                }
            }
        }
        drop(process_guard);

        self.set_state(BackendState::Exited).await;
    }
}
