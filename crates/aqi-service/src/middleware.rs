//! API key authentication.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::api::ApiError;
use crate::config::SecurityConfig;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API key authentication middleware.
///
/// Every request must carry an `X-API-Key` header equal to the configured
/// shared secret. Missing and wrong keys are indistinguishable to the
/// caller, and with no secret configured every request is rejected.
pub async fn api_key_auth(
    headers: HeaderMap,
    State(config): State<Arc<SecurityConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    if key_matches(config.api_key.as_deref(), provided) {
        next.run(request).await
    } else {
        warn!("API key authentication failed for {}", request.uri().path());
        ApiError::Unauthorized.into_response()
    }
}

/// Constant-time comparison of the provided key against the expected one.
fn key_matches(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(provided.as_bytes()).into()
        }
        _ => false,
    }
}
