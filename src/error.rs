//! Error types for the gateway.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend failed to launch or never became healthy. Fatal at startup.
    #[error("Startup failure: {0}")]
    Startup(String),

    /// Missing, malformed, or mismatching bearer token.
    /// Reason strings must never contain the presented or configured token.
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Network-level failure reaching the backend during forwarding.
    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    /// Backend was reachable but returned a non-success status.
    /// The gateway surfaces the backend's own status code.
    #[error("Backend returned {0}")]
    Backend(StatusCode),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Startup(_) => (StatusCode::SERVICE_UNAVAILABLE, "startup_failure"),
            Error::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Error::BackendUnreachable(_) => (StatusCode::BAD_GATEWAY, "backend_unreachable"),
            Error::Backend(code) => (*code, "backend_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        match self {
            Error::Unauthorized(_) => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
