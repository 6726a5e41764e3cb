//! Bearer-token authentication.
//!
//! Token digests are computed once at startup (see `bootstrap`).
//! - [`require_api_token`] gates every route except `/v1/health`. The
//!   admin token is accepted there too, since a request carries a single
//!   `Authorization` header.
//! - [`AdminGuard`] additionally gates settings writes.
//!
//! With neither token set every check passes (dev mode). With only the API
//! token set, settings writes are refused with 403.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Hash the presented bearer token and compare in constant time, so the
/// token length does not leak either.
fn bearer_matches(headers: &HeaderMap, expected_hash: &[u8]) -> bool {
    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    let provided_hash = Sha256::digest(provided.as_bytes());
    bool::from(provided_hash.ct_eq(expected_hash))
}

/// Axum middleware for protected routes. Attach via
/// `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected_hash) = &state.api_token_hash {
        let admin_ok = state
            .admin_token_hash
            .as_deref()
            .is_some_and(|admin_hash| bearer_matches(req.headers(), admin_hash));
        if !admin_ok && !bearer_matches(req.headers(), expected_hash) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid or missing API token" })),
            )
                .into_response();
        }
    }
    next.run(req).await
}

/// Extractor enforcing the admin token. Handlers opt in with
/// `_admin: AdminGuard`.
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match (&state.admin_token_hash, &state.api_token_hash) {
            (Some(expected_hash), _) if !bearer_matches(&parts.headers, expected_hash) => Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid admin token" })),
            )),
            (Some(_), _) | (None, None) => Ok(AdminGuard),
            // API auth is on but no admin token exists: writes stay disabled.
            (None, Some(_)) => Err((
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "settings writes are disabled; no admin token configured" })),
            )),
        }
    }
}
