//! Configuration for the gateway.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub tunnel: TunnelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Backend inference server configuration.
///
/// The backend is spawned as a child process and reached only over loopback.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Command used to launch the backend server.
    #[serde(default = "default_backend_command")]
    pub command: String,
    #[serde(default = "default_backend_args")]
    pub args: Vec<String>,
    /// Port the backend binds on localhost.
    #[serde(default = "default_backend_port")]
    pub port: u16,
    /// Interval between readiness probes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Bound on the readiness gate. Unset means wait indefinitely.
    #[serde(default)]
    pub startup_timeout_secs: Option<u64>,
    /// Timeout applied to each forwarded request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout before the child is killed.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl BackendConfig {
    /// Loopback base URL of the backend server.
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: default_backend_command(),
            args: default_backend_args(),
            port: default_backend_port(),
            poll_interval_secs: default_poll_interval(),
            startup_timeout_secs: None,
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

/// Bearer token configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret compared against presented bearer tokens.
    /// Typically set via the GATEWAY__AUTH__TOKEN environment variable.
    pub token: String,
}

// The token must never end up in logs, so Debug redacts it.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"[redacted]")
            .finish()
    }
}

/// External tunnel client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelConfig {
    /// Tunnel client binary, e.g. "cloudflared".
    #[serde(default = "default_tunnel_command")]
    pub command: String,
    /// Arguments passed to the tunnel client. The literal "{port}" is
    /// replaced with the backend port.
    #[serde(default = "default_tunnel_args")]
    pub args: Vec<String>,
    /// How long to wait for the client to publish its URL.
    #[serde(default = "default_url_timeout")]
    pub url_timeout_secs: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            command: default_tunnel_command(),
            args: default_tunnel_args(),
            url_timeout_secs: default_url_timeout(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_backend_command() -> String {
    "ollama".to_string()
}
fn default_backend_args() -> Vec<String> {
    vec!["serve".to_string()]
}
fn default_backend_port() -> u16 {
    11434
}
fn default_poll_interval() -> u64 {
    1
}
fn default_request_timeout() -> u64 {
    60
}
fn default_shutdown_timeout() -> u64 {
    10
}
fn default_tunnel_command() -> String {
    "cloudflared".to_string()
}
fn default_tunnel_args() -> Vec<String> {
    vec![
        "tunnel".to_string(),
        "--url".to_string(),
        "http://localhost:{port}".to_string(),
    ]
}
fn default_url_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (GATEWAY__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
