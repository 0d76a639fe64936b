//! # API Request/Response Types
//!
//! This module defines the JSON structures for the livechat HTTP API.
//!
//! Every response carries a `success` flag; authorization failures carry
//! nothing else besides the contract's error code, so a denied caller never
//! learns whether the resource exists.

use omnichat_core::{
    AppVideoConference, DepartmentAgent, Page, Trigger, UserAccount, UserStatus,
    types::{TriggerAction, TriggerCondition},
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Query parameters accepted by listing endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<usize>,
    pub count: Option<usize>,
}

impl PageQuery {
    /// Resolve to a concrete page window with the crate defaults.
    #[must_use]
    pub fn to_page(self) -> Page {
        let default = Page::default();
        Page::new(
            self.offset.unwrap_or(default.offset),
            self.count.unwrap_or(default.count),
        )
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Generic failure body: `success: false` plus an optional error code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    /// The contract's authorization-failure code.
    #[must_use]
    pub fn not_authorized() -> Self {
        Self {
            success: false,
            error: Some("error-not-authorized".to_string()),
        }
    }

    /// Bare `success: false`, used where the contract names no code.
    #[must_use]
    pub fn forbidden() -> Self {
        Self {
            success: false,
            error: None,
        }
    }

    #[must_use]
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// USER PAYLOADS
// =============================================================================

/// A user as the livechat API exposes it.
///
/// Deliberately narrower than the account record: no roles, no token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserJson {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub name: String,
    pub status: UserStatus,
}

impl From<UserAccount> for UserJson {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id.0,
            username: account.username,
            name: account.name,
            status: account.status,
        }
    }
}

/// `GET livechat/users/{type}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersListResponse {
    pub success: bool,
    pub users: Vec<UserJson>,
    pub offset: usize,
    pub total: usize,
    pub count: usize,
}

impl UsersListResponse {
    #[must_use]
    pub fn new(users: Vec<UserJson>, offset: usize, total: usize) -> Self {
        let count = users.len();
        Self {
            success: true,
            users,
            offset,
            total,
            count,
        }
    }
}

/// `POST livechat/users/{type}` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

/// The created-user payload: only the fields the contract promises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUserJson {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
}

/// `POST livechat/users/{type}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub user: CreatedUserJson,
}

impl CreateUserResponse {
    #[must_use]
    pub fn new(account: UserAccount) -> Self {
        Self {
            success: true,
            user: CreatedUserJson {
                id: account.id.0,
                username: account.username,
            },
        }
    }
}

/// `GET livechat/users/{type}/{id}` response. `user` is null when the
/// account exists but does not belong to the requested type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: Option<UserJson>,
}

/// `DELETE livechat/users/{type}/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub success: bool,
}

impl Default for OkResponse {
    fn default() -> Self {
        Self { success: true }
    }
}

// =============================================================================
// DEPARTMENT PAYLOADS
// =============================================================================

/// A department-assignment row as returned by
/// `GET livechat/agents/{agentId}/departments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentAgentJson {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "departmentId")]
    pub department_id: String,
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub username: String,
    pub count: u64,
    pub order: u64,
}

impl From<DepartmentAgent> for DepartmentAgentJson {
    fn from(assignment: DepartmentAgent) -> Self {
        Self {
            id: assignment.id,
            department_id: assignment.department_id.0,
            agent_id: assignment.agent_id.0,
            username: assignment.username,
            count: assignment.count,
            order: assignment.order,
        }
    }
}

/// `GET livechat/agents/{agentId}/departments` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentsResponse {
    pub success: bool,
    pub departments: Vec<DepartmentAgentJson>,
}

// =============================================================================
// TRIGGER PAYLOADS
// =============================================================================

/// A trigger as the livechat API exposes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerJson {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    #[serde(rename = "runOnce")]
    pub run_once: bool,
    pub conditions: Vec<TriggerCondition>,
    pub actions: Vec<TriggerAction>,
}

impl From<Trigger> for TriggerJson {
    fn from(trigger: Trigger) -> Self {
        Self {
            id: trigger.id.0,
            name: trigger.name,
            description: trigger.description,
            enabled: trigger.enabled,
            run_once: trigger.run_once,
            conditions: trigger.conditions,
            actions: trigger.actions,
        }
    }
}

/// `GET livechat/triggers` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggersListResponse {
    pub success: bool,
    pub triggers: Vec<TriggerJson>,
    pub offset: usize,
    pub total: usize,
    pub count: usize,
}

impl TriggersListResponse {
    #[must_use]
    pub fn new(triggers: Vec<TriggerJson>, offset: usize, total: usize) -> Self {
        let count = triggers.len();
        Self {
            success: true,
            triggers,
            offset,
            total,
            count,
        }
    }
}

/// `GET livechat/triggers/{id}` response. `trigger` is null when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub trigger: Option<TriggerJson>,
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Directory counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub agents: usize,
    pub managers: usize,
    pub departments: usize,
    pub triggers: usize,
}

// =============================================================================
// VIDEO CONFERENCE RESPONSE
// =============================================================================

/// `GET video-conferences/{id}` response, in the plugin-SDK shape.
/// `call` is null when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponse {
    pub success: bool,
    pub call: Option<AppVideoConference>,
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// `POST export` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>, // Base64 encoded canonical stream
    pub checksum: Option<u64>,
    pub error: Option<String>,
}

impl ExportResponse {
    #[must_use]
    pub fn new(data: Vec<u8>, checksum: u64) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                &data,
            )),
            checksum: Some(checksum),
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            checksum: None,
            error: Some(msg.into()),
        }
    }
}
