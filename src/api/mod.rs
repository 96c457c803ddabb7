//! Gateway HTTP surface.

pub mod echo;
pub mod forward;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the gateway router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(forward::root))
        .route("/api/tags", get(forward::tags))
        .route("/echo", post(echo::echo))
}
