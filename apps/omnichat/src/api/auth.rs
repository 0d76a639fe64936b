//! # Authentication Module
//!
//! Personal-access-token authentication for the livechat HTTP API.
//!
//! ## Usage
//!
//! Clients send the product's credential header pair:
//! ```text
//! X-User-Id: <account id>
//! X-Auth-Token: <personal access token>
//! ```
//!
//! The middleware resolves the account, compares tokens in constant time,
//! and attaches a [`Caller`] to the request extensions. Handlers read the
//! caller instead of an ambient request-global user object; the per-request
//! context is explicit.

use super::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use omnichat_core::UserAccount;
use subtle::ConstantTimeEq;

/// Header carrying the account id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the personal access token.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

// =============================================================================
// CALLER CONTEXT
// =============================================================================

/// The authenticated caller, attached to every request that passes the
/// middleware. Permission checks happen per-endpoint against this account.
#[derive(Debug, Clone)]
pub struct Caller {
    pub account: UserAccount,
}

// =============================================================================
// TOKEN COMPARISON
// =============================================================================

/// Constant-time token equality.
///
/// Pads both tokens to the same length so `ct_eq` always runs over the same
/// number of bytes, preventing length-leaking side channels.
#[must_use]
pub fn tokens_match(provided: &str, expected: &str) -> bool {
    let provided_bytes = provided.as_bytes();
    let expected_bytes = expected.as_bytes();

    let max_len = provided_bytes.len().max(expected_bytes.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
    padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided_bytes.len() == expected_bytes.len()
}

// =============================================================================
// AUTH MIDDLEWARE
// =============================================================================

/// Access-token authentication middleware.
///
/// - `/health` is always allowed (for load balancer health checks)
/// - All other endpoints require the `X-User-Id`/`X-Auth-Token` pair to
///   resolve to an account whose stored token matches
pub async fn access_token_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    // Always allow health endpoint (for load balancer checks)
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    // Copy both headers out before the registry lock is awaited; the
    // request body must not be borrowed across a suspension point.
    let (user_id, token) = {
        let headers = request.headers();
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        (header_str(USER_ID_HEADER), header_str(AUTH_TOKEN_HEADER))
    };

    let (Some(user_id), Some(token)) = (user_id, token) else {
        tracing::warn!(
            event = "auth_failure",
            reason = "missing_credential_headers",
            "Missing X-User-Id/X-Auth-Token headers"
        );
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
    };

    let account = {
        let registry = state.registry.read().await;
        match registry.account_by_id(&omnichat_core::UserId(user_id.clone())) {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(event = "auth_failure", error = %e, "Account lookup failed");
                return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"));
            }
        }
    };

    let valid = account.as_ref().is_some_and(|account| {
        account
            .auth_token
            .as_deref()
            .is_some_and(|expected| tokens_match(&token, expected))
    });

    if !valid {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_credentials",
            user_id = %user_id,
            "Authentication failed: unknown account or token mismatch"
        );
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    // `valid` implies the account is present.
    if let Some(account) = account {
        request.extensions_mut().insert(Caller { account });
    }
    Ok(next.run(request).await)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match_exact() {
        assert!(tokens_match("secret-token", "secret-token"));
    }

    #[test]
    fn test_tokens_match_rejects_wrong_token() {
        assert!(!tokens_match("secret-token", "other-token"));
    }

    #[test]
    fn test_tokens_match_rejects_prefix() {
        assert!(!tokens_match("secret", "secret-token"));
        assert!(!tokens_match("secret-token", "secret"));
    }

    #[test]
    fn test_tokens_match_rejects_empty() {
        assert!(!tokens_match("", "secret-token"));
    }
}
