//! # Authentication Module
//!
//! Optional API key check for the Tatame HTTP API.
//!
//! When `TATAME_API_KEY` is set, every request except `/health` must send
//! the key in the Authorization header, with or without a Bearer prefix:
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Paths reachable without a key (load balancer probes).
const PUBLIC_PATHS: &[&str] = &["/health"];

/// The configured API key, or `None` when unset or empty.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("TATAME_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Token carried by an Authorization header value.
fn presented_token(header_value: &str) -> &str {
    header_value
        .strip_prefix("Bearer ")
        .unwrap_or(header_value)
}

/// Constant-time key comparison.
///
/// Both sides are zero-padded to the same length so the comparison does
/// not leak the expected key's length through timing.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let len = provided.len().max(expected.len());
    let mut lhs = vec![0u8; len];
    let mut rhs = vec![0u8; len];
    lhs[..provided.len()].copy_from_slice(provided);
    rhs[..expected.len()].copy_from_slice(expected);

    let same_bytes: bool = lhs.ct_eq(&rhs).into();
    same_bytes && provided.len() == expected.len()
}

/// API key authentication middleware.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };
    if PUBLIC_PATHS.iter().any(|p| *p == request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let verdict = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|value| keys_match(presented_token(value).as_bytes(), expected.as_bytes()));

    let reason = match verdict {
        Some(true) => return Ok(next.run(request).await),
        Some(false) => "invalid_api_key",
        None => "missing_authorization_header",
    };

    tracing::warn!(
        event = "auth_failure",
        reason,
        path = %request.uri().path(),
        "Authentication failed"
    );
    Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
}

// =============================================================================
// TESTS
// =============================================================================
