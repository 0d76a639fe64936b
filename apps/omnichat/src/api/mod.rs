//! # Omnichat HTTP API Module
//!
//! This module implements the livechat HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET  /v1/livechat/users/{type}` - List agents or managers
//! - `POST /v1/livechat/users/{type}` - Grant a livechat role by username
//! - `GET  /v1/livechat/users/{type}/{id}` - Fetch one member of the type
//! - `DELETE /v1/livechat/users/{type}/{id}` - Revoke the livechat role
//! - `GET  /v1/livechat/agents/{agentId}/departments` - Agent's assignments
//! - `GET  /v1/livechat/triggers` - List trigger rules
//! - `GET  /v1/livechat/triggers/{id}` - Fetch one trigger
//! - `GET  /v1/video-conferences/{id}` - Fetch a call in plugin-SDK shape
//! - `POST /v1/export` - Export the directory in canonical format
//! - `GET  /v1/status` - Directory counters
//! - `GET  /health` - Health check (unauthenticated)
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `OMNICHAT_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `OMNICHAT_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//!
//! Authentication is always on: every `/v1/*` request must carry the
//! `X-User-Id`/`X-Auth-Token` header pair of a provisioned account.

pub mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::{AUTH_TOKEN_HEADER, Caller, USER_ID_HEADER, tokens_match};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `omnichat::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    agent_departments_handler, create_user_handler, delete_user_handler, export_handler,
    get_call_handler, get_trigger_handler, get_user_handler, health_handler, list_triggers_handler,
    list_users_handler, status_handler,
};
#[allow(unused_imports)]
pub use types::{
    CallResponse, CreateUserRequest, CreateUserResponse, DepartmentAgentJson, DepartmentsResponse,
    ErrorResponse, ExportResponse, HealthResponse, OkResponse, StatusResponse, TriggerJson,
    TriggerResponse, TriggersListResponse, UserJson, UserResponse, UsersListResponse,
};

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use omnichat_core::{OmnichatError, Registry};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the directory registry.
#[derive(Clone)]
pub struct AppState {
    /// The registry containing the directory and permission grants.
    pub registry: Arc<RwLock<Registry>>,
}

impl AppState {
    /// Create new app state with a registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `OMNICHAT_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
///
/// # Security Note
///
/// The default is restrictive (localhost only). Set `OMNICHAT_CORS_ORIGINS=*`
/// explicitly only for development or if you understand the security implications.
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("OMNICHAT_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            // Explicit wildcard - warn about security implications
            tracing::warn!(
                "CORS: Allowing ALL origins (OMNICHAT_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            // Parse comma-separated origins
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in OMNICHAT_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                cors_with_origins(allowed_origins)
            }
        }
        None => {
            // No configuration - default to localhost only (restrictive)
            tracing::info!("CORS: No OMNICHAT_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    cors_with_origins(origins)
}

fn cors_with_origins(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(AUTH_TOKEN_HEADER),
        ])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - protects against DoS (if enabled)
/// 5. Authentication - resolves the caller account (always on)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/v1/status", get(handlers::status_handler))
        .route(
            "/v1/livechat/users/{user_type}",
            get(handlers::list_users_handler).post(handlers::create_user_handler),
        )
        .route(
            "/v1/livechat/users/{user_type}/{id}",
            get(handlers::get_user_handler).delete(handlers::delete_user_handler),
        )
        .route(
            "/v1/livechat/agents/{agent_id}/departments",
            get(handlers::agent_departments_handler),
        )
        .route("/v1/livechat/triggers", get(handlers::list_triggers_handler))
        .route(
            "/v1/livechat/triggers/{id}",
            get(handlers::get_trigger_handler),
        )
        .route("/v1/video-conferences/{id}", get(handlers::get_call_handler))
        .route("/v1/export", post(handlers::export_handler));

    // Apply authentication middleware (innermost - runs last on request)
    router = router.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        auth::access_token_auth_middleware,
    ));

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, registry: Registry) -> Result<(), OmnichatError> {
    let state = AppState::new(registry);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| OmnichatError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Omnichat HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| OmnichatError::IoError(format!("Server error: {}", e)))
}
