//! # Core Types Module
//!
//! This module contains the fundamental type definitions for the directory:
//! - Identifier newtypes (`UserId`, `DepartmentId`, `TriggerId`, `CallId`)
//! - Account, department, trigger, and video-conference records
//! - Error types (`OmnichatError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Carry no floating-point fields
//! - Are minted from monotonic counters, never randomness

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a user account.
///
/// Serialized on the wire as the `_id` field of user payloads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a department.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub String);

impl DepartmentId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a trigger rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub String);

impl TriggerId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a video-conference call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub String);

impl CallId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ROLES & USER TYPES
// =============================================================================

/// A role an account can hold.
///
/// Roles are the unit the permission engine grants against. The livechat
/// user *type* (`agent`/`manager`) is derived from role membership, it is
/// never stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    User,
    LivechatAgent,
    LivechatManager,
}

impl Role {
    /// Stable wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::LivechatAgent => "livechat-agent",
            Self::LivechatManager => "livechat-manager",
        }
    }
}

/// The closed set of livechat user types addressable through the API.
///
/// Any other `{type}` path segment is a validation error, not a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Agent,
    Manager,
}

impl UserType {
    /// Parse a `{type}` path segment.
    ///
    /// # Errors
    ///
    /// Returns `OmnichatError::InvalidUserType` for anything outside the
    /// closed set.
    pub fn parse(segment: &str) -> Result<Self, OmnichatError> {
        match segment {
            "agent" => Ok(Self::Agent),
            "manager" => Ok(Self::Manager),
            other => Err(OmnichatError::InvalidUserType(other.to_string())),
        }
    }

    /// The role that membership in this user type is derived from.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Agent => Role::LivechatAgent,
            Self::Manager => Role::LivechatManager,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Manager => "manager",
        }
    }
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Presence status of an account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Away,
    Busy,
    #[default]
    Offline,
}

/// A user account in the directory.
///
/// Accounts are created through the directory (CLI seed or core API); the
/// livechat endpoints only grant or revoke livechat roles on accounts that
/// already exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Stable identifier, minted from a monotonic counter.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Presence status.
    pub status: UserStatus,
    /// Roles held by this account.
    pub roles: BTreeSet<Role>,
    /// Personal access token used by the HTTP layer for authentication.
    /// Never serialized into API payloads.
    pub auth_token: Option<String>,
}

impl UserAccount {
    /// Whether this account holds the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether this account belongs to the given livechat user type.
    #[must_use]
    pub fn is_in(&self, user_type: UserType) -> bool {
        self.has_role(user_type.role())
    }
}

// =============================================================================
// DEPARTMENTS
// =============================================================================

/// A department groups agents for conversation routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub enabled: bool,
    pub description: String,
    /// Number of agents currently assigned.
    pub num_agents: u64,
}

/// Links an agent to a department.
///
/// Invariant: every assignment returned for an agent query carries that
/// agent's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentAgent {
    /// Identifier of the assignment record itself.
    pub id: String,
    pub department_id: DepartmentId,
    pub agent_id: UserId,
    /// Denormalized agent username, kept for display without a second lookup.
    pub username: String,
    /// Open-conversation counter used by the router.
    pub count: u64,
    /// Routing priority within the department (lower is served first).
    pub order: u64,
}

// =============================================================================
// TRIGGERS
// =============================================================================

/// A condition under which a trigger fires (e.g. `page-url`, `time-on-site`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub name: String,
    pub value: String,
}

/// The action a fired trigger performs (e.g. `send-message`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAction {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// A configured rule that initiates a proactive chat action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    /// When set, the trigger fires at most once per visitor.
    pub run_once: bool,
    pub conditions: Vec<TriggerCondition>,
    pub actions: Vec<TriggerAction>,
}

// =============================================================================
// VIDEO CONFERENCES
// =============================================================================

/// Internal video-conference record.
///
/// The app-SDK facing representation lives in [`crate::convert`]; the two are
/// copied field-for-field with no transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConference {
    pub id: CallId,
    /// Room the call belongs to.
    pub rid: String,
    pub created_by: UserId,
    pub title: Option<String>,
    /// Provider-defined status code.
    pub status: i64,
    pub url: Option<String>,
    pub provider_name: String,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Omnichat directory.
///
/// - No silent failures
/// - Use `Result<T, OmnichatError>` for fallible operations
/// - The directory should never panic; all errors must be recoverable
#[derive(Debug, Error)]
pub enum OmnichatError {
    /// The `{type}` path segment is outside the closed `agent`/`manager` set.
    #[error("Invalid type")]
    InvalidUserType(String),

    /// No account exists with the given username.
    #[error("Invalid username: {0}")]
    UnknownUsername(String),

    /// No account exists with the given id.
    #[error("Invalid user id: {0}")]
    UnknownUser(UserId),

    /// The account exists but does not hold the required role.
    #[error("User {user} is not a {role:?}")]
    NotInRole { user: UserId, role: Role },

    /// An account with this username already exists.
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    /// A field failed validation (empty, oversized, malformed).
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// The requested department does not exist.
    #[error("Department not found: {0}")]
    DepartmentNotFound(DepartmentId),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_parse_closed_set() {
        assert_eq!(UserType::parse("agent").ok(), Some(UserType::Agent));
        assert_eq!(UserType::parse("manager").ok(), Some(UserType::Manager));
        assert!(matches!(
            UserType::parse("invalid-type"),
            Err(OmnichatError::InvalidUserType(_))
        ));
        // Not case-insensitive: the wire contract is exact
        assert!(UserType::parse("Agent").is_err());
    }

    #[test]
    fn test_invalid_type_error_message_is_contract_literal() {
        let err = UserType::parse("bot").expect_err("must reject");
        assert_eq!(err.to_string(), "Invalid type");
    }

    #[test]
    fn test_user_type_role_mapping() {
        assert_eq!(UserType::Agent.role(), Role::LivechatAgent);
        assert_eq!(UserType::Manager.role(), Role::LivechatManager);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::LivechatAgent.as_str(), "livechat-agent");
        assert_eq!(Role::LivechatManager.as_str(), "livechat-manager");
    }

    #[test]
    fn test_account_type_membership() {
        let account = UserAccount {
            id: UserId("usr-1".to_string()),
            username: "alice".to_string(),
            name: "Alice".to_string(),
            status: UserStatus::default(),
            roles: [Role::User, Role::LivechatAgent].into_iter().collect(),
            auth_token: None,
        };
        assert!(account.is_in(UserType::Agent));
        assert!(!account.is_in(UserType::Manager));
    }
}
