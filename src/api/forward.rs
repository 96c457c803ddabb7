//! Authenticated forwarding endpoints.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use axum::Json;

use crate::auth;
use crate::error::{Error, Result};
use crate::proxy::RawResponse;
use crate::state::AppState;

/// GET / - raw pass-through to the backend root.
///
/// The backend body and status come back verbatim, including error statuses.
pub async fn root(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response> {
    auth::authenticate(&headers, &state.config.auth.token)?;

    let path = with_query("/", query.as_deref());
    let raw = state.proxy.forward_raw(Method::GET, &path, None).await?;
    into_response(raw)
}

/// GET /api/tags - structured forward of the backend model listing.
///
/// Parses the backend JSON on success; a non-success backend status is
/// surfaced as the gateway's own error code.
pub async fn tags(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    auth::authenticate(&headers, &state.config.auth.token)?;

    let path = with_query("/api/tags", query.as_deref());
    let body = state.proxy.forward_json(Method::GET, &path).await?;
    Ok(Json(body))
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    }
}

fn into_response(raw: RawResponse) -> Result<Response> {
    let mut builder = Response::builder().status(raw.status);
    if let Some(content_type) = raw.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from(raw.body))
        .map_err(|e| Error::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query() {
        assert_eq!(with_query("/api/tags", None), "/api/tags");
        assert_eq!(with_query("/api/tags", Some("limit=5")), "/api/tags?limit=5");
        assert_eq!(with_query("/", Some("a=1&b=2")), "/?a=1&b=2");
    }
}
