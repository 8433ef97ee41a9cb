//! Shared-secret gate for the admin API.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Deserialize)]
struct AdminKeyQuery {
    #[serde(rename = "adminKey")]
    admin_key: Option<String>,
}

/// Compare two secrets without leaking where they differ.
///
/// Both sides are hashed first so the comparison runs over equal-length
/// digests regardless of input length.
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Extractor that admits a request only when it presents the admin key in
/// the `x-admin-key` header or the `adminKey` query parameter.
///
/// With no key configured every request is rejected.
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized("invalid admin key".to_owned());

        let Some(expected) = state.config().admin_key.as_ref() else {
            tracing::warn!("Admin request rejected: no admin key configured");
            return Err(unauthorized());
        };

        let from_header = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let provided = match from_header {
            Some(key) => Some(key),
            None => Query::<AdminKeyQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.admin_key),
        };

        match provided {
            Some(key) if keys_match(&key, expected.expose_secret()) => Ok(Self),
            _ => Err(unauthorized()),
        }
    }
}
