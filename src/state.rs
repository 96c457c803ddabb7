//! Shared application state.

use crate::config::Config;
use crate::proxy::ProxyClient;

/// Shared application state passed to all handlers.
///
/// Immutable after startup; handlers only read from it.
pub struct AppState {
    pub config: Config,
    pub proxy: ProxyClient,
}

impl AppState {
    pub fn new(config: Config, proxy: ProxyClient) -> Self {
        Self { config, proxy }
    }
}
