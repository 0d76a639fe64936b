//! # Registry Module
//!
//! The high-level directory API the HTTP layer and CLI talk to.
//!
//! A `Registry` pairs a storage backend with the runtime permission grants.
//! Grants are volatile by design: they are administrative configuration that
//! the operator reseeds on startup, never user data, so they live outside the
//! snapshot.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `BTreeMap`-backed (fast, volatile unless explicitly exported)
//! - `Persistent`: redb-backed, disk-backed ACID storage

use crate::directory::{DirectorySnapshot, DirectoryStore, MemoryDirectory};
use crate::permissions::{Permission, PermissionGrants};
use crate::primitives::{MAX_NAME_LENGTH, MAX_USERNAME_LENGTH, Page};
use crate::storage::RedbDirectory;
use crate::types::{
    CallId, Department, DepartmentAgent, DepartmentId, OmnichatError, Role, Trigger, TriggerId,
    UserAccount, UserId, UserStatus, UserType, VideoConference,
};
use std::collections::BTreeSet;
use std::path::Path;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Registry.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory directory (fast, volatile).
    InMemory(MemoryDirectory),
    /// Disk-backed directory using redb (ACID, persistent).
    Persistent(RedbDirectory),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryDirectory::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbDirectory (database handle) cannot be safely cloned.

// =============================================================================
// REGISTRY
// =============================================================================

/// The livechat directory: accounts, roles, grants, departments, triggers.
#[derive(Debug, Default)]
pub struct Registry {
    backend: StorageBackend,
    grants: PermissionGrants,
}

impl Registry {
    /// Create a new empty registry with in-memory storage and stock grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry over an existing in-memory directory.
    #[must_use]
    pub fn with_directory(directory: MemoryDirectory) -> Self {
        Self {
            backend: StorageBackend::InMemory(directory),
            grants: PermissionGrants::default(),
        }
    }

    /// Create a registry with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path. All directory
    /// changes are persisted to disk automatically.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, OmnichatError> {
        let redb = RedbDirectory::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(redb),
            grants: PermissionGrants::default(),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn store(&self) -> &dyn DirectoryStore {
        match &self.backend {
            StorageBackend::InMemory(directory) => directory,
            StorageBackend::Persistent(redb) => redb,
        }
    }

    fn store_mut(&mut self) -> &mut dyn DirectoryStore {
        match &mut self.backend {
            StorageBackend::InMemory(directory) => directory,
            StorageBackend::Persistent(redb) => redb,
        }
    }

    // =========================================================================
    // PERMISSION GRANTS
    // =========================================================================

    /// Read access to the permission grants.
    #[must_use]
    pub fn grants(&self) -> &PermissionGrants {
        &self.grants
    }

    /// Mutable access to the permission grants (admin reconfiguration).
    pub fn grants_mut(&mut self) -> &mut PermissionGrants {
        &mut self.grants
    }

    /// Whether the account holds the permission.
    #[must_use]
    pub fn has_permission(&self, account: &UserAccount, permission: Permission) -> bool {
        self.grants.has_permission(account, permission)
    }

    /// Whether the account holds at least one of the permissions.
    #[must_use]
    pub fn has_any_permission(&self, account: &UserAccount, permissions: &[Permission]) -> bool {
        self.grants.has_any_permission(account, permissions)
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    /// Create a new account with the given roles.
    ///
    /// Ids are minted as `usr-{n}` from the backend's monotonic counter.
    ///
    /// # Errors
    ///
    /// `InvalidField` for empty/oversized username or name,
    /// `DuplicateUsername` when the login name is taken.
    pub fn create_account(
        &mut self,
        username: &str,
        name: &str,
        roles: impl IntoIterator<Item = Role>,
    ) -> Result<UserAccount, OmnichatError> {
        if username.is_empty() {
            return Err(OmnichatError::InvalidField("username is empty".to_string()));
        }
        if username.len() > MAX_USERNAME_LENGTH {
            return Err(OmnichatError::InvalidField(format!(
                "username length {} exceeds maximum {} bytes",
                username.len(),
                MAX_USERNAME_LENGTH
            )));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(OmnichatError::InvalidField(format!(
                "name length {} exceeds maximum {} bytes",
                name.len(),
                MAX_NAME_LENGTH
            )));
        }

        let seq = self.store_mut().next_seq("usr")?;
        let mut role_set: BTreeSet<Role> = roles.into_iter().collect();
        role_set.insert(Role::User);
        let account = UserAccount {
            id: UserId(format!("usr-{seq}")),
            username: username.to_string(),
            name: name.to_string(),
            status: UserStatus::default(),
            roles: role_set,
            auth_token: None,
        };
        self.store_mut().insert_account(account.clone())?;
        Ok(account)
    }

    /// Add roles to an existing account. Roles already held are kept.
    pub fn add_roles(
        &mut self,
        id: &UserId,
        roles: impl IntoIterator<Item = Role>,
    ) -> Result<UserAccount, OmnichatError> {
        let mut account = self
            .store()
            .account_by_id(id)?
            .ok_or_else(|| OmnichatError::UnknownUser(id.clone()))?;
        account.roles.extend(roles);
        self.store_mut().update_account(account.clone())?;
        Ok(account)
    }

    /// Attach a personal access token to an account.
    pub fn set_auth_token(&mut self, id: &UserId, token: &str) -> Result<(), OmnichatError> {
        let mut account = self
            .store()
            .account_by_id(id)?
            .ok_or_else(|| OmnichatError::UnknownUser(id.clone()))?;
        account.auth_token = Some(token.to_string());
        self.store_mut().update_account(account)
    }

    /// Look up an account by id.
    pub fn account_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, OmnichatError> {
        self.store().account_by_id(id)
    }

    /// Look up an account by username.
    pub fn account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, OmnichatError> {
        self.store().account_by_username(username)
    }

    // =========================================================================
    // LIVECHAT USER TYPES
    // =========================================================================

    /// Grant the livechat role for `user_type` to the account owning
    /// `username`. Idempotent: granting an already-held role succeeds.
    ///
    /// # Errors
    ///
    /// `UnknownUsername` when no account owns the username.
    pub fn add_user_to_type(
        &mut self,
        user_type: UserType,
        username: &str,
    ) -> Result<UserAccount, OmnichatError> {
        let mut account = self
            .store()
            .account_by_username(username)?
            .ok_or_else(|| OmnichatError::UnknownUsername(username.to_string()))?;
        account.roles.insert(user_type.role());
        self.store_mut().update_account(account.clone())?;
        Ok(account)
    }

    /// Revoke the livechat role for `user_type` from the account with `id`.
    /// Revoking an agent also drops the agent's department assignments.
    ///
    /// # Errors
    ///
    /// `UnknownUser` when the id matches no account, `NotInRole` when the
    /// account does not hold the role.
    pub fn remove_user_from_type(
        &mut self,
        user_type: UserType,
        id: &UserId,
    ) -> Result<(), OmnichatError> {
        let mut account = self
            .store()
            .account_by_id(id)?
            .ok_or_else(|| OmnichatError::UnknownUser(id.clone()))?;
        if !account.roles.remove(&user_type.role()) {
            return Err(OmnichatError::NotInRole {
                user: id.clone(),
                role: user_type.role(),
            });
        }
        self.store_mut().update_account(account)?;
        if user_type == UserType::Agent {
            self.store_mut().remove_assignments_for_agent(id)?;
        }
        Ok(())
    }

    /// Fetch the account with `id` if it belongs to `user_type`.
    ///
    /// Returns `Ok(None)` when the account exists but lacks the role —
    /// a valid-but-absent resource, not an error.
    ///
    /// # Errors
    ///
    /// `UnknownUser` when the id matches no account at all.
    pub fn user_in_type(
        &self,
        user_type: UserType,
        id: &UserId,
    ) -> Result<Option<UserAccount>, OmnichatError> {
        let account = self
            .store()
            .account_by_id(id)?
            .ok_or_else(|| OmnichatError::UnknownUser(id.clone()))?;
        if account.is_in(user_type) {
            Ok(Some(account))
        } else {
            Ok(None)
        }
    }

    /// List accounts of a livechat user type, paginated.
    ///
    /// Returns the page plus the pre-pagination total. Ordering is by
    /// account id, which is deterministic across backends.
    pub fn list_users(
        &self,
        user_type: UserType,
        page: Page,
    ) -> Result<(Vec<UserAccount>, usize), OmnichatError> {
        let all = self.store().accounts_in_role(user_type.role())?;
        let total = all.len();
        Ok((page.slice(&all), total))
    }

    // =========================================================================
    // DEPARTMENTS
    // =========================================================================

    /// Create a department. Ids are minted as `dep-{n}`.
    pub fn create_department(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<Department, OmnichatError> {
        if name.is_empty() {
            return Err(OmnichatError::InvalidField(
                "department name is empty".to_string(),
            ));
        }
        let seq = self.store_mut().next_seq("dep")?;
        let department = Department {
            id: DepartmentId(format!("dep-{seq}")),
            name: name.to_string(),
            enabled: true,
            description: description.to_string(),
            num_agents: 0,
        };
        self.store_mut().insert_department(department.clone())?;
        Ok(department)
    }

    /// Assign an agent to a department.
    ///
    /// # Errors
    ///
    /// `DepartmentNotFound` for an unknown department, `UnknownUser` for an
    /// unknown agent id, `NotInRole` when the account is not an agent.
    pub fn assign_agent_to_department(
        &mut self,
        department_id: &DepartmentId,
        agent_id: &UserId,
    ) -> Result<DepartmentAgent, OmnichatError> {
        let mut department = self
            .store()
            .department_by_id(department_id)?
            .ok_or_else(|| OmnichatError::DepartmentNotFound(department_id.clone()))?;
        let agent = self
            .store()
            .account_by_id(agent_id)?
            .ok_or_else(|| OmnichatError::UnknownUser(agent_id.clone()))?;
        if !agent.is_in(UserType::Agent) {
            return Err(OmnichatError::NotInRole {
                user: agent_id.clone(),
                role: Role::LivechatAgent,
            });
        }

        let seq = self.store_mut().next_seq("dag")?;
        let assignment = DepartmentAgent {
            id: format!("dag-{seq}"),
            department_id: department_id.clone(),
            agent_id: agent_id.clone(),
            username: agent.username,
            count: 0,
            order: department.num_agents,
        };
        self.store_mut().insert_assignment(assignment.clone())?;

        department.num_agents = department.num_agents.saturating_add(1);
        self.store_mut().update_department(department)?;
        Ok(assignment)
    }

    /// Department assignments held by an agent.
    ///
    /// An unknown agent id yields an empty list, never an error: the caller
    /// asked a well-formed question with an empty answer.
    pub fn departments_for_agent(
        &self,
        agent_id: &UserId,
    ) -> Result<Vec<DepartmentAgent>, OmnichatError> {
        self.store().assignments_for_agent(agent_id)
    }

    /// All departments, unpaginated (the admin UI loads them in one go).
    pub fn list_departments(&self) -> Result<Vec<Department>, OmnichatError> {
        self.store().list_departments()
    }

    // =========================================================================
    // TRIGGERS
    // =========================================================================

    /// Create a trigger rule. Ids are minted as `trg-{n}`.
    pub fn create_trigger(&mut self, spec: TriggerSpec) -> Result<Trigger, OmnichatError> {
        if spec.name.is_empty() {
            return Err(OmnichatError::InvalidField(
                "trigger name is empty".to_string(),
            ));
        }
        let seq = self.store_mut().next_seq("trg")?;
        let trigger = Trigger {
            id: TriggerId(format!("trg-{seq}")),
            name: spec.name,
            description: spec.description,
            enabled: spec.enabled,
            run_once: spec.run_once,
            conditions: spec.conditions,
            actions: spec.actions,
        };
        self.store_mut().insert_trigger(trigger.clone())?;
        Ok(trigger)
    }

    /// List triggers, paginated, with the pre-pagination total.
    pub fn list_triggers(&self, page: Page) -> Result<(Vec<Trigger>, usize), OmnichatError> {
        let all = self.store().list_triggers()?;
        let total = all.len();
        Ok((page.slice(&all), total))
    }

    /// Fetch a trigger by id. Absence is `Ok(None)`.
    pub fn find_trigger(&self, id: &TriggerId) -> Result<Option<Trigger>, OmnichatError> {
        self.store().trigger_by_id(id)
    }

    // =========================================================================
    // VIDEO CONFERENCES
    // =========================================================================

    /// Insert or replace a video-conference record.
    pub fn upsert_video_conference(
        &mut self,
        call: VideoConference,
    ) -> Result<(), OmnichatError> {
        self.store_mut().upsert_call(call)
    }

    /// Fetch a video-conference record by call id. Absence is `Ok(None)`.
    pub fn find_video_conference(
        &self,
        id: &CallId,
    ) -> Result<Option<VideoConference>, OmnichatError> {
        self.store().call_by_id(id)
    }

    // =========================================================================
    // SNAPSHOT & METRICS
    // =========================================================================

    /// Copy the full directory contents out of the backend.
    pub fn export_snapshot(&self) -> Result<DirectorySnapshot, OmnichatError> {
        self.store().snapshot()
    }

    /// Replace the directory contents with a snapshot.
    pub fn import_snapshot(&mut self, snapshot: DirectorySnapshot) -> Result<(), OmnichatError> {
        self.store_mut().restore(snapshot)
    }

    /// Directory counters for the status surface.
    pub fn metrics(&self) -> Result<DirectoryMetrics, OmnichatError> {
        Ok(DirectoryMetrics {
            agent_count: self.store().accounts_in_role(Role::LivechatAgent)?.len(),
            manager_count: self.store().accounts_in_role(Role::LivechatManager)?.len(),
            department_count: self.store().list_departments()?.len(),
            trigger_count: self.store().list_triggers()?.len(),
        })
    }
}

// =============================================================================
// SUPPORT TYPES
// =============================================================================

/// Input for [`Registry::create_trigger`].
#[derive(Debug, Clone, Default)]
pub struct TriggerSpec {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub run_once: bool,
    pub conditions: Vec<crate::types::TriggerCondition>,
    pub actions: Vec<crate::types::TriggerAction>,
}

/// Directory counters reported by the status endpoint and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryMetrics {
    pub agent_count: usize,
    pub manager_count: usize,
    pub department_count: usize,
    pub trigger_count: usize,
}
