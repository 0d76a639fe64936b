//! # Directory Store
//!
//! Storage abstraction for the directory plus the in-memory implementation.
//!
//! The [`DirectoryStore`] trait is the seam between the high-level
//! [`crate::registry::Registry`] operations and the two backends:
//! [`MemoryDirectory`] here and [`crate::storage::RedbDirectory`] for
//! disk-backed storage. Every method is fallible; the in-memory backend
//! simply never produces I/O errors.
//!
//! Iteration order is deterministic for both backends: records are keyed by
//! their string ids in ordered maps / ordered tables.

use crate::types::{
    CallId, Department, DepartmentAgent, DepartmentId, OmnichatError, Role, Trigger, TriggerId,
    UserAccount, UserId, VideoConference,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A complete, order-independent copy of the directory contents.
///
/// Used for canonical export/import and for migrating between backends.
/// Counters are included so id minting stays monotonic after a restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub accounts: Vec<UserAccount>,
    pub departments: Vec<Department>,
    pub assignments: Vec<DepartmentAgent>,
    pub triggers: Vec<Trigger>,
    pub calls: Vec<VideoConference>,
    pub counters: BTreeMap<String, u64>,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Operations every directory backend must provide.
pub trait DirectoryStore {
    // --- accounts ---

    /// Insert a new account. Fails on duplicate username.
    fn insert_account(&mut self, account: UserAccount) -> Result<(), OmnichatError>;

    /// Replace an existing account record (matched by id).
    fn update_account(&mut self, account: UserAccount) -> Result<(), OmnichatError>;

    fn account_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, OmnichatError>;

    fn account_by_username(&self, username: &str) -> Result<Option<UserAccount>, OmnichatError>;

    /// All accounts holding `role`, ordered by id.
    fn accounts_in_role(&self, role: Role) -> Result<Vec<UserAccount>, OmnichatError>;

    // --- departments ---

    fn insert_department(&mut self, department: Department) -> Result<(), OmnichatError>;

    fn update_department(&mut self, department: Department) -> Result<(), OmnichatError>;

    fn department_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, OmnichatError>;

    fn list_departments(&self) -> Result<Vec<Department>, OmnichatError>;

    // --- department assignments ---

    fn insert_assignment(&mut self, assignment: DepartmentAgent) -> Result<(), OmnichatError>;

    /// All assignments for one agent, ordered by assignment id.
    fn assignments_for_agent(&self, agent: &UserId)
    -> Result<Vec<DepartmentAgent>, OmnichatError>;

    /// Drop every assignment held by the agent, returning how many were
    /// removed.
    fn remove_assignments_for_agent(&mut self, agent: &UserId) -> Result<usize, OmnichatError>;

    fn list_assignments(&self) -> Result<Vec<DepartmentAgent>, OmnichatError>;

    // --- triggers ---

    fn insert_trigger(&mut self, trigger: Trigger) -> Result<(), OmnichatError>;

    fn trigger_by_id(&self, id: &TriggerId) -> Result<Option<Trigger>, OmnichatError>;

    fn list_triggers(&self) -> Result<Vec<Trigger>, OmnichatError>;

    // --- video conferences ---

    fn upsert_call(&mut self, call: VideoConference) -> Result<(), OmnichatError>;

    fn call_by_id(&self, id: &CallId) -> Result<Option<VideoConference>, OmnichatError>;

    fn list_calls(&self) -> Result<Vec<VideoConference>, OmnichatError>;

    // --- counters & snapshot ---

    /// Advance and return the named monotonic counter (starts at 1).
    fn next_seq(&mut self, kind: &str) -> Result<u64, OmnichatError>;

    /// Copy the full directory contents out of the backend.
    fn snapshot(&self) -> Result<DirectorySnapshot, OmnichatError>;

    /// Replace the backend contents with the snapshot.
    fn restore(&mut self, snapshot: DirectorySnapshot) -> Result<(), OmnichatError>;
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// In-memory directory backend.
///
/// Fast and volatile; the server uses it unless a database path is given.
/// All maps are `BTreeMap` so listing order is stable across runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    accounts: BTreeMap<UserId, UserAccount>,
    username_index: BTreeMap<String, UserId>,
    departments: BTreeMap<DepartmentId, Department>,
    assignments: BTreeMap<String, DepartmentAgent>,
    triggers: BTreeMap<TriggerId, Trigger>,
    calls: BTreeMap<CallId, VideoConference>,
    counters: BTreeMap<String, u64>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectoryStore for MemoryDirectory {
    fn insert_account(&mut self, account: UserAccount) -> Result<(), OmnichatError> {
        if self.username_index.contains_key(&account.username) {
            return Err(OmnichatError::DuplicateUsername(account.username));
        }
        self.username_index
            .insert(account.username.clone(), account.id.clone());
        self.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    fn update_account(&mut self, account: UserAccount) -> Result<(), OmnichatError> {
        let Some(existing) = self.accounts.get(&account.id) else {
            return Err(OmnichatError::UnknownUser(account.id));
        };
        // Keep the username index coherent if the login name changed.
        if existing.username != account.username {
            self.username_index.remove(&existing.username);
            self.username_index
                .insert(account.username.clone(), account.id.clone());
        }
        self.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    fn account_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, OmnichatError> {
        Ok(self.accounts.get(id).cloned())
    }

    fn account_by_username(&self, username: &str) -> Result<Option<UserAccount>, OmnichatError> {
        Ok(self
            .username_index
            .get(username)
            .and_then(|id| self.accounts.get(id))
            .cloned())
    }

    fn accounts_in_role(&self, role: Role) -> Result<Vec<UserAccount>, OmnichatError> {
        Ok(self
            .accounts
            .values()
            .filter(|account| account.has_role(role))
            .cloned()
            .collect())
    }

    fn insert_department(&mut self, department: Department) -> Result<(), OmnichatError> {
        self.departments.insert(department.id.clone(), department);
        Ok(())
    }

    fn update_department(&mut self, department: Department) -> Result<(), OmnichatError> {
        if !self.departments.contains_key(&department.id) {
            return Err(OmnichatError::DepartmentNotFound(department.id));
        }
        self.departments.insert(department.id.clone(), department);
        Ok(())
    }

    fn department_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, OmnichatError> {
        Ok(self.departments.get(id).cloned())
    }

    fn list_departments(&self) -> Result<Vec<Department>, OmnichatError> {
        Ok(self.departments.values().cloned().collect())
    }

    fn insert_assignment(&mut self, assignment: DepartmentAgent) -> Result<(), OmnichatError> {
        self.assignments.insert(assignment.id.clone(), assignment);
        Ok(())
    }

    fn assignments_for_agent(
        &self,
        agent: &UserId,
    ) -> Result<Vec<DepartmentAgent>, OmnichatError> {
        Ok(self
            .assignments
            .values()
            .filter(|assignment| &assignment.agent_id == agent)
            .cloned()
            .collect())
    }

    fn remove_assignments_for_agent(&mut self, agent: &UserId) -> Result<usize, OmnichatError> {
        let before = self.assignments.len();
        self.assignments
            .retain(|_, assignment| &assignment.agent_id != agent);
        Ok(before - self.assignments.len())
    }

    fn list_assignments(&self) -> Result<Vec<DepartmentAgent>, OmnichatError> {
        Ok(self.assignments.values().cloned().collect())
    }

    fn insert_trigger(&mut self, trigger: Trigger) -> Result<(), OmnichatError> {
        self.triggers.insert(trigger.id.clone(), trigger);
        Ok(())
    }

    fn trigger_by_id(&self, id: &TriggerId) -> Result<Option<Trigger>, OmnichatError> {
        Ok(self.triggers.get(id).cloned())
    }

    fn list_triggers(&self) -> Result<Vec<Trigger>, OmnichatError> {
        Ok(self.triggers.values().cloned().collect())
    }

    fn upsert_call(&mut self, call: VideoConference) -> Result<(), OmnichatError> {
        self.calls.insert(call.id.clone(), call);
        Ok(())
    }

    fn call_by_id(&self, id: &CallId) -> Result<Option<VideoConference>, OmnichatError> {
        Ok(self.calls.get(id).cloned())
    }

    fn list_calls(&self) -> Result<Vec<VideoConference>, OmnichatError> {
        Ok(self.calls.values().cloned().collect())
    }

    fn next_seq(&mut self, kind: &str) -> Result<u64, OmnichatError> {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
        Ok(*counter)
    }

    fn snapshot(&self) -> Result<DirectorySnapshot, OmnichatError> {
        Ok(DirectorySnapshot {
            accounts: self.accounts.values().cloned().collect(),
            departments: self.departments.values().cloned().collect(),
            assignments: self.assignments.values().cloned().collect(),
            triggers: self.triggers.values().cloned().collect(),
            calls: self.calls.values().cloned().collect(),
            counters: self.counters.clone(),
        })
    }

    fn restore(&mut self, snapshot: DirectorySnapshot) -> Result<(), OmnichatError> {
        let mut fresh = Self::new();
        for account in snapshot.accounts {
            fresh.insert_account(account)?;
        }
        for department in snapshot.departments {
            fresh.insert_department(department)?;
        }
        for assignment in snapshot.assignments {
            fresh.insert_assignment(assignment)?;
        }
        for trigger in snapshot.triggers {
            fresh.insert_trigger(trigger)?;
        }
        for call in snapshot.calls {
            fresh.upsert_call(call)?;
        }
        fresh.counters = snapshot.counters;
        *self = fresh;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserStatus;
    use std::collections::BTreeSet;

    fn account(id: &str, username: &str, roles: &[Role]) -> UserAccount {
        UserAccount {
            id: UserId(id.to_string()),
            username: username.to_string(),
            name: username.to_string(),
            status: UserStatus::default(),
            roles: roles.iter().copied().collect(),
            auth_token: None,
        }
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut store = MemoryDirectory::new();
        store
            .insert_account(account("usr-1", "alice", &[Role::User]))
            .expect("first insert");
        let err = store
            .insert_account(account("usr-2", "alice", &[Role::User]))
            .expect_err("duplicate must fail");
        assert!(matches!(err, OmnichatError::DuplicateUsername(_)));
    }

    #[test]
    fn test_username_index_follows_rename() {
        let mut store = MemoryDirectory::new();
        store
            .insert_account(account("usr-1", "alice", &[Role::User]))
            .expect("insert");

        let mut renamed = account("usr-1", "alicia", &[Role::User]);
        renamed.roles = BTreeSet::from([Role::User]);
        store.update_account(renamed).expect("update");

        assert!(store.account_by_username("alice").expect("lookup").is_none());
        assert!(
            store
                .account_by_username("alicia")
                .expect("lookup")
                .is_some()
        );
    }

    #[test]
    fn test_accounts_in_role_filters() {
        let mut store = MemoryDirectory::new();
        store
            .insert_account(account("usr-1", "alice", &[Role::User, Role::LivechatAgent]))
            .expect("insert");
        store
            .insert_account(account("usr-2", "bob", &[Role::User]))
            .expect("insert");

        let agents = store.accounts_in_role(Role::LivechatAgent).expect("list");
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].username, "alice");
    }

    #[test]
    fn test_remove_assignments_for_agent() {
        let mut store = MemoryDirectory::new();
        let assignment = DepartmentAgent {
            id: "dag-1".to_string(),
            department_id: DepartmentId("dep-1".to_string()),
            agent_id: UserId("usr-1".to_string()),
            username: "alice".to_string(),
            count: 0,
            order: 0,
        };
        store.insert_assignment(assignment).expect("insert");

        let removed = store
            .remove_assignments_for_agent(&UserId("usr-1".to_string()))
            .expect("remove");
        assert_eq!(removed, 1);
        assert!(
            store
                .assignments_for_agent(&UserId("usr-1".to_string()))
                .expect("list")
                .is_empty()
        );
    }

    #[test]
    fn test_next_seq_is_monotonic_per_kind() {
        let mut store = MemoryDirectory::new();
        assert_eq!(store.next_seq("usr").expect("seq"), 1);
        assert_eq!(store.next_seq("usr").expect("seq"), 2);
        assert_eq!(store.next_seq("dep").expect("seq"), 1);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut store = MemoryDirectory::new();
        store
            .insert_account(account("usr-1", "alice", &[Role::LivechatAgent]))
            .expect("insert");
        store.next_seq("usr").expect("seq");

        let snapshot = store.snapshot().expect("snapshot");
        let mut restored = MemoryDirectory::new();
        restored.restore(snapshot.clone()).expect("restore");

        assert_eq!(restored.snapshot().expect("snapshot"), snapshot);
    }
}
