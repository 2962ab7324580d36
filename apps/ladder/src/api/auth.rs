//! # Authentication Module
//!
//! Two independent checks guard the HTTP API:
//!
//! 1. An optional service key. If `LADDER_API_KEY` is set, every request
//!    except `/health` must send `Authorization: Bearer <key>`.
//! 2. The caller identity. The identity collaborator in front of the service
//!    forwards the authenticated principal in the `X-Ladder-Principal`
//!    header as `startup:<id>` or `incubator:<id>`. Ladder trusts it as
//!    given and never issues credentials itself.

use super::error::ApiError;
use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use ladder_core::Principal;
use subtle::ConstantTimeEq;

/// Header carrying the caller principal.
pub const PRINCIPAL_HEADER: &str = "x-ladder-principal";

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Get API key from environment variable.
///
/// Returns `Some(key)` if `LADDER_API_KEY` is set and non-empty,
/// `None` otherwise (disabling key authentication).
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("LADDER_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Compare two keys in constant time over the longer length.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
///
/// `/health` is always allowed; everything else needs the bearer key.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) => {
            // Accept both "Bearer <key>" and a raw "<key>"
            let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);

            if keys_match(provided.as_bytes(), expected.as_bytes()) {
                Ok(next.run(request).await)
            } else {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "invalid_api_key",
                    "Authentication failed: invalid API key"
                );
                Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// PRINCIPAL EXTRACTOR
// =============================================================================

/// The caller identity of a request, taken from [`PRINCIPAL_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentPrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(PRINCIPAL_HEADER) else {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_principal",
                "Missing principal header"
            );
            return Err(ApiError::Unauthenticated(format!(
                "missing {} header",
                PRINCIPAL_HEADER
            )));
        };

        let parsed = value
            .to_str()
            .ok()
            .and_then(|raw| raw.parse::<Principal>().ok());
        match parsed {
            Some(principal) => Ok(CurrentPrincipal(principal)),
            None => {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "malformed_principal",
                    "Malformed principal header"
                );
                Err(ApiError::Unauthenticated(format!(
                    "malformed {} header",
                    PRINCIPAL_HEADER
                )))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_requires_equal_length_and_bytes() {
        assert!(keys_match(b"secret", b"secret"));
        assert!(!keys_match(b"secret", b"secreT"));
        assert!(!keys_match(b"secret", b"secret-longer"));
        assert!(!keys_match(b"", b"secret"));
        assert!(keys_match(b"", b""));
    }
}
