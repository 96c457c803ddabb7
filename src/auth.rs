//! Bearer token authentication.
//!
//! Every authenticated request is checked independently and statelessly
//! against the configured secret. The secret and presented tokens must never
//! appear in logs or error bodies.

use axum::http::{header, HeaderMap};

use crate::error::{Error, Result};

/// Validate the `Authorization: Bearer <token>` header against the secret.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<()> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(Error::Unauthorized("missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid Authorization header"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(Error::Unauthorized("expected Bearer authorization scheme"))?;

    if token != secret {
        return Err(Error::Unauthorized("incorrect bearer token"));
    }

    Ok(())
}
