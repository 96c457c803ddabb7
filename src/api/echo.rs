//! Diagnostic echo endpoint.

use axum::Json;
use serde_json::Value;

/// POST /echo - returns the submitted JSON body unchanged.
///
/// Deliberately unauthenticated: it is a connectivity probe for the gateway
/// itself and never touches the backend.
pub async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}
