//! # API Endpoint Handlers
//!
//! This module implements the livechat HTTP endpoint handlers.
//!
//! Two authorization-failure renderings exist side by side because the wire
//! contract demands both: the listing endpoints answer 400 with the
//! `error-not-authorized` code, the user-management endpoints answer a bare
//! 403. Validation failures are always 400 with a descriptive string, and a
//! valid-but-absent resource is a success carrying null/empty data.

use super::{
    AppState,
    auth::Caller,
    types::{
        CallResponse, CreateUserRequest, CreateUserResponse, DepartmentsResponse, ErrorResponse,
        ExportResponse, HealthResponse, OkResponse, PageQuery, StatusResponse, TriggerResponse,
        TriggersListResponse, UserResponse, UsersListResponse,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use omnichat_core::{
    CallId, OmnichatError, Permission, TriggerId, UserId, UserType,
    export::{canonical_checksum, export_canonical},
    to_app_video_conference,
};

// =============================================================================
// PERMISSION REQUIREMENTS
// =============================================================================

/// Any one of these authorizes listing agents.
const AGENT_LIST_PERMISSIONS: [Permission; 3] = [
    Permission::EditOmnichannelContact,
    Permission::TransferLivechatGuest,
    Permission::ManageLivechatAgents,
];

/// Any one of these authorizes listing managers.
const MANAGER_LIST_PERMISSIONS: [Permission; 2] = [
    Permission::ViewLivechatManager,
    Permission::ManageLivechatAgents,
];

// =============================================================================
// FAILURE RENDERINGS
// =============================================================================

/// 400 + `error-not-authorized`, used by the listing endpoints.
fn not_authorized() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::not_authorized()),
    )
        .into_response()
}

/// Bare 403, used by the user-management endpoints.
fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(ErrorResponse::forbidden())).into_response()
}

/// 400 with a descriptive validation message.
fn bad_request(msg: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::message(msg))).into_response()
}

/// Map a directory error to its HTTP rendering.
///
/// Validation-class errors surface their message; storage errors stay
/// generic so internals never leak to clients.
fn directory_error(e: &OmnichatError) -> Response {
    match e {
        OmnichatError::IoError(_) | OmnichatError::SerializationError(_) => {
            tracing::error!(error = %e, "Directory storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::message("Internal server error")),
            )
                .into_response()
        }
        _ => bad_request(e.to_string()),
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Directory counters.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let registry = state.registry.read().await;
    match registry.metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            Json(StatusResponse {
                success: true,
                agents: metrics.agent_count,
                managers: metrics.manager_count,
                departments: metrics.department_count,
                triggers: metrics.trigger_count,
            }),
        )
            .into_response(),
        Err(e) => directory_error(&e),
    }
}

// =============================================================================
// LIVECHAT USERS HANDLERS
// =============================================================================

/// `GET livechat/users/{type}` — list agents or managers.
///
/// The permission set depends on the type, so the segment is validated
/// first; an unsupported type never reaches the store.
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(type_segment): Path<String>,
    Query(page): Query<PageQuery>,
) -> Response {
    let user_type = match UserType::parse(&type_segment) {
        Ok(t) => t,
        Err(e) => return bad_request(e.to_string()),
    };

    let registry = state.registry.read().await;
    let required: &[Permission] = match user_type {
        UserType::Agent => &AGENT_LIST_PERMISSIONS,
        UserType::Manager => &MANAGER_LIST_PERMISSIONS,
    };
    if !registry.has_any_permission(&caller.account, required) {
        return not_authorized();
    }

    let page = page.to_page();
    match registry.list_users(user_type, page) {
        Ok((users, total)) => {
            let users = users.into_iter().map(Into::into).collect();
            (
                StatusCode::OK,
                Json(UsersListResponse::new(users, page.offset, total)),
            )
                .into_response()
        }
        Err(e) => directory_error(&e),
    }
}

/// `POST livechat/users/{type}` — grant the livechat role to an existing
/// account, addressed by username.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(type_segment): Path<String>,
    Json(request): Json<CreateUserRequest>,
) -> Response {
    let mut registry = state.registry.write().await;
    if !registry.has_permission(&caller.account, Permission::ViewLivechatManager) {
        return forbidden();
    }

    let user_type = match UserType::parse(&type_segment) {
        Ok(t) => t,
        Err(e) => return bad_request(e.to_string()),
    };

    match registry.add_user_to_type(user_type, &request.username) {
        Ok(account) => (StatusCode::OK, Json(CreateUserResponse::new(account))).into_response(),
        Err(e) => directory_error(&e),
    }
}

/// `GET livechat/users/{type}/{id}` — fetch one member of the type.
///
/// An account that exists but lacks the role is a success with a null
/// user; an id matching no account at all is a validation error.
pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((type_segment, id)): Path<(String, String)>,
) -> Response {
    let registry = state.registry.read().await;
    if !registry.has_permission(&caller.account, Permission::ViewLivechatManager) {
        return forbidden();
    }

    let user_type = match UserType::parse(&type_segment) {
        Ok(t) => t,
        Err(e) => return bad_request(e.to_string()),
    };

    match registry.user_in_type(user_type, &UserId(id)) {
        Ok(user) => (
            StatusCode::OK,
            Json(UserResponse {
                success: true,
                user: user.map(Into::into),
            }),
        )
            .into_response(),
        Err(e) => directory_error(&e),
    }
}

/// `DELETE livechat/users/{type}/{id}` — revoke the livechat role.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((type_segment, id)): Path<(String, String)>,
) -> Response {
    let mut registry = state.registry.write().await;
    if !registry.has_permission(&caller.account, Permission::ViewLivechatManager) {
        return forbidden();
    }

    let user_type = match UserType::parse(&type_segment) {
        Ok(t) => t,
        Err(e) => return bad_request(e.to_string()),
    };

    match registry.remove_user_from_type(user_type, &UserId(id)) {
        Ok(()) => (StatusCode::OK, Json(OkResponse::default())).into_response(),
        Err(e) => directory_error(&e),
    }
}

// =============================================================================
// DEPARTMENTS HANDLER
// =============================================================================

/// `GET livechat/agents/{agentId}/departments`.
///
/// Never a validation error: an unknown agent id is a well-formed question
/// with an empty answer.
pub async fn agent_departments_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(agent_id): Path<String>,
) -> Response {
    let registry = state.registry.read().await;
    if !registry.has_permission(&caller.account, Permission::ViewLRoom) {
        return not_authorized();
    }

    match registry.departments_for_agent(&UserId(agent_id)) {
        Ok(assignments) => (
            StatusCode::OK,
            Json(DepartmentsResponse {
                success: true,
                departments: assignments.into_iter().map(Into::into).collect(),
            }),
        )
            .into_response(),
        Err(e) => directory_error(&e),
    }
}

// =============================================================================
// TRIGGERS HANDLERS
// =============================================================================

/// `GET livechat/triggers` — list trigger rules.
pub async fn list_triggers_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(page): Query<PageQuery>,
) -> Response {
    let registry = state.registry.read().await;
    if !registry.has_permission(&caller.account, Permission::ViewLivechatManager) {
        return not_authorized();
    }

    let page = page.to_page();
    match registry.list_triggers(page) {
        Ok((triggers, total)) => {
            let triggers = triggers.into_iter().map(Into::into).collect();
            (
                StatusCode::OK,
                Json(TriggersListResponse::new(triggers, page.offset, total)),
            )
                .into_response()
        }
        Err(e) => directory_error(&e),
    }
}

/// `GET livechat/triggers/{id}` — fetch one trigger; null when absent.
pub async fn get_trigger_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Response {
    let registry = state.registry.read().await;
    if !registry.has_permission(&caller.account, Permission::ViewLivechatManager) {
        return not_authorized();
    }

    match registry.find_trigger(&TriggerId(id)) {
        Ok(trigger) => (
            StatusCode::OK,
            Json(TriggerResponse {
                success: true,
                trigger: trigger.map(Into::into),
            }),
        )
            .into_response(),
        Err(e) => directory_error(&e),
    }
}

// =============================================================================
// VIDEO CONFERENCE HANDLER
// =============================================================================

/// `GET video-conferences/{id}` — fetch a call in the plugin-SDK shape.
pub async fn get_call_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let registry = state.registry.read().await;
    match registry.find_video_conference(&CallId(id)) {
        Ok(call) => (
            StatusCode::OK,
            Json(CallResponse {
                success: true,
                call: to_app_video_conference(call.as_ref()),
            }),
        )
            .into_response(),
        Err(e) => directory_error(&e),
    }
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// `POST export` — canonical snapshot of the directory.
///
/// Management-class authorization, bare 403 on failure. Personal access
/// tokens are redacted before the snapshot leaves the process; full
/// backups (tokens included) go through the CLI against the local
/// database only.
pub async fn export_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Response {
    let registry = state.registry.read().await;

    if !registry.has_permission(&caller.account, Permission::ViewLivechatManager) {
        return forbidden();
    }

    let mut snapshot = match registry.export_snapshot() {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResponse::error(format!(
                    "Failed to build directory snapshot: {}",
                    e
                ))),
            )
                .into_response();
        }
    };

    for account in &mut snapshot.accounts {
        account.auth_token = None;
    }

    match (export_canonical(&snapshot), canonical_checksum(&snapshot)) {
        (Ok(data), Ok(checksum)) => {
            (StatusCode::OK, Json(ExportResponse::new(data, checksum))).into_response()
        }
        (Err(e), _) | (_, Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        )
            .into_response(),
    }
}
