//! # redb-backed Directory Storage
//!
//! A disk-backed directory store using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! Records are serialized with postcard. String ids are the table keys, so
//! range iteration yields the same deterministic order as the in-memory
//! backend's `BTreeMap`s.

use crate::directory::{DirectorySnapshot, DirectoryStore};
use crate::types::{
    CallId, Department, DepartmentAgent, DepartmentId, OmnichatError, Role, Trigger, TriggerId,
    UserAccount, UserId, VideoConference,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for accounts: user id -> serialized `UserAccount`.
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Table for the username index: username -> user id.
const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

/// Table for departments: department id -> serialized `Department`.
const DEPARTMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("departments");

/// Table for department assignments: assignment id -> serialized `DepartmentAgent`.
const ASSIGNMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("assignments");

/// Table for triggers: trigger id -> serialized `Trigger`.
const TRIGGERS: TableDefinition<&str, &[u8]> = TableDefinition::new("triggers");

/// Table for video conferences: call id -> serialized `VideoConference`.
const CALLS: TableDefinition<&str, &[u8]> = TableDefinition::new("calls");

/// Table for id-minting counters: kind -> last issued value.
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// All record tables, used when clearing the database on restore.
const RECORD_TABLES: [TableDefinition<'static, &str, &[u8]>; 5] =
    [ACCOUNTS, DEPARTMENTS, ASSIGNMENTS, TRIGGERS, CALLS];

fn io_err(e: impl std::fmt::Display) -> OmnichatError {
    OmnichatError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, OmnichatError> {
    postcard::to_stdvec(value).map_err(|e| OmnichatError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, OmnichatError> {
    postcard::from_bytes(bytes).map_err(|e| OmnichatError::SerializationError(e.to_string()))
}

/// A disk-backed directory store using redb.
pub struct RedbDirectory {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDirectory").finish_non_exhaustive()
    }
}

impl RedbDirectory {
    /// Open or create a directory database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OmnichatError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables so first reads never fail on missing tables
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            for table in RECORD_TABLES {
                let _ = write_txn.open_table(table).map_err(io_err)?;
            }
            let _ = write_txn.open_table(USERNAMES).map_err(io_err)?;
            let _ = write_txn.open_table(COUNTERS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Write one serialized record into a table.
    fn put_record<T: Serialize>(
        &mut self,
        table: TableDefinition<'_, &str, &[u8]>,
        key: &str,
        value: &T,
    ) -> Result<(), OmnichatError> {
        let bytes = encode(value)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut t = write_txn.open_table(table).map_err(io_err)?;
            t.insert(key, bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    /// Read one record from a table.
    fn get_record<T: DeserializeOwned>(
        &self,
        table: TableDefinition<'_, &str, &[u8]>,
        key: &str,
    ) -> Result<Option<T>, OmnichatError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let t = read_txn.open_table(table).map_err(io_err)?;
        match t.get(key).map_err(io_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Read every record in a table, in key order.
    fn all_records<T: DeserializeOwned>(
        &self,
        table: TableDefinition<'_, &str, &[u8]>,
    ) -> Result<Vec<T>, OmnichatError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let t = read_txn.open_table(table).map_err(io_err)?;
        let mut records = Vec::new();
        for entry in t.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }
}

impl DirectoryStore for RedbDirectory {
    fn insert_account(&mut self, account: UserAccount) -> Result<(), OmnichatError> {
        let bytes = encode(&account)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut names = write_txn.open_table(USERNAMES).map_err(io_err)?;
            if names.get(account.username.as_str()).map_err(io_err)?.is_some() {
                return Err(OmnichatError::DuplicateUsername(account.username));
            }
            names
                .insert(account.username.as_str(), account.id.as_str())
                .map_err(io_err)?;
            let mut accounts = write_txn.open_table(ACCOUNTS).map_err(io_err)?;
            accounts
                .insert(account.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn update_account(&mut self, account: UserAccount) -> Result<(), OmnichatError> {
        let bytes = encode(&account)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS).map_err(io_err)?;
            let previous = match accounts.get(account.id.as_str()).map_err(io_err)? {
                Some(guard) => decode::<UserAccount>(guard.value())?,
                None => return Err(OmnichatError::UnknownUser(account.id)),
            };
            accounts
                .insert(account.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
            if previous.username != account.username {
                let mut names = write_txn.open_table(USERNAMES).map_err(io_err)?;
                names.remove(previous.username.as_str()).map_err(io_err)?;
                names
                    .insert(account.username.as_str(), account.id.as_str())
                    .map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)
    }

    fn account_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, OmnichatError> {
        self.get_record(ACCOUNTS, id.as_str())
    }

    fn account_by_username(&self, username: &str) -> Result<Option<UserAccount>, OmnichatError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let names = read_txn.open_table(USERNAMES).map_err(io_err)?;
        let Some(id_guard) = names.get(username).map_err(io_err)? else {
            return Ok(None);
        };
        let accounts = read_txn.open_table(ACCOUNTS).map_err(io_err)?;
        match accounts.get(id_guard.value()).map_err(io_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn accounts_in_role(&self, role: Role) -> Result<Vec<UserAccount>, OmnichatError> {
        let accounts: Vec<UserAccount> = self.all_records(ACCOUNTS)?;
        Ok(accounts
            .into_iter()
            .filter(|account| account.has_role(role))
            .collect())
    }

    fn insert_department(&mut self, department: Department) -> Result<(), OmnichatError> {
        let id = department.id.clone();
        self.put_record(DEPARTMENTS, id.as_str(), &department)
    }

    fn update_department(&mut self, department: Department) -> Result<(), OmnichatError> {
        if self
            .get_record::<Department>(DEPARTMENTS, department.id.as_str())?
            .is_none()
        {
            return Err(OmnichatError::DepartmentNotFound(department.id));
        }
        let id = department.id.clone();
        self.put_record(DEPARTMENTS, id.as_str(), &department)
    }

    fn department_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, OmnichatError> {
        self.get_record(DEPARTMENTS, id.as_str())
    }

    fn list_departments(&self) -> Result<Vec<Department>, OmnichatError> {
        self.all_records(DEPARTMENTS)
    }

    fn insert_assignment(&mut self, assignment: DepartmentAgent) -> Result<(), OmnichatError> {
        let id = assignment.id.clone();
        self.put_record(ASSIGNMENTS, &id, &assignment)
    }

    fn assignments_for_agent(
        &self,
        agent: &UserId,
    ) -> Result<Vec<DepartmentAgent>, OmnichatError> {
        let assignments: Vec<DepartmentAgent> = self.all_records(ASSIGNMENTS)?;
        Ok(assignments
            .into_iter()
            .filter(|assignment| &assignment.agent_id == agent)
            .collect())
    }

    fn remove_assignments_for_agent(&mut self, agent: &UserId) -> Result<usize, OmnichatError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let removed;
        {
            let mut table = write_txn.open_table(ASSIGNMENTS).map_err(io_err)?;
            let mut doomed = Vec::new();
            for entry in table.iter().map_err(io_err)? {
                let (key, value) = entry.map_err(io_err)?;
                let assignment: DepartmentAgent = decode(value.value())?;
                if &assignment.agent_id == agent {
                    doomed.push(key.value().to_string());
                }
            }
            removed = doomed.len();
            for key in doomed {
                table.remove(key.as_str()).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(removed)
    }

    fn list_assignments(&self) -> Result<Vec<DepartmentAgent>, OmnichatError> {
        self.all_records(ASSIGNMENTS)
    }

    fn insert_trigger(&mut self, trigger: Trigger) -> Result<(), OmnichatError> {
        let id = trigger.id.clone();
        self.put_record(TRIGGERS, id.as_str(), &trigger)
    }

    fn trigger_by_id(&self, id: &TriggerId) -> Result<Option<Trigger>, OmnichatError> {
        self.get_record(TRIGGERS, id.as_str())
    }

    fn list_triggers(&self) -> Result<Vec<Trigger>, OmnichatError> {
        self.all_records(TRIGGERS)
    }

    fn upsert_call(&mut self, call: VideoConference) -> Result<(), OmnichatError> {
        let id = call.id.clone();
        self.put_record(CALLS, id.as_str(), &call)
    }

    fn call_by_id(&self, id: &CallId) -> Result<Option<VideoConference>, OmnichatError> {
        self.get_record(CALLS, id.as_str())
    }

    fn list_calls(&self) -> Result<Vec<VideoConference>, OmnichatError> {
        self.all_records(CALLS)
    }

    fn next_seq(&mut self, kind: &str) -> Result<u64, OmnichatError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let next;
        {
            let mut counters = write_txn.open_table(COUNTERS).map_err(io_err)?;
            let current = counters
                .get(kind)
                .map_err(io_err)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            next = current.saturating_add(1);
            counters.insert(kind, next).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(next)
    }

    fn snapshot(&self) -> Result<DirectorySnapshot, OmnichatError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let counters_table = read_txn.open_table(COUNTERS).map_err(io_err)?;
        let mut counters = std::collections::BTreeMap::new();
        for entry in counters_table.iter().map_err(io_err)? {
            let (key, value) = entry.map_err(io_err)?;
            counters.insert(key.value().to_string(), value.value());
        }
        Ok(DirectorySnapshot {
            accounts: self.all_records(ACCOUNTS)?,
            departments: self.all_records(DEPARTMENTS)?,
            assignments: self.all_records(ASSIGNMENTS)?,
            triggers: self.all_records(TRIGGERS)?,
            calls: self.all_records(CALLS)?,
            counters,
        })
    }

    fn restore(&mut self, snapshot: DirectorySnapshot) -> Result<(), OmnichatError> {
        // Wipe and recreate tables inside a single transaction so a failed
        // restore never leaves a half-written directory behind.
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            for table in RECORD_TABLES {
                let _ = write_txn.delete_table(table).map_err(io_err)?;
            }
            let _ = write_txn.delete_table(USERNAMES).map_err(io_err)?;
            let _ = write_txn.delete_table(COUNTERS).map_err(io_err)?;

            let mut accounts = write_txn.open_table(ACCOUNTS).map_err(io_err)?;
            let mut names = write_txn.open_table(USERNAMES).map_err(io_err)?;
            for account in &snapshot.accounts {
                let bytes = encode(account)?;
                accounts
                    .insert(account.id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
                names
                    .insert(account.username.as_str(), account.id.as_str())
                    .map_err(io_err)?;
            }

            let mut departments = write_txn.open_table(DEPARTMENTS).map_err(io_err)?;
            for department in &snapshot.departments {
                let bytes = encode(department)?;
                departments
                    .insert(department.id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut assignments = write_txn.open_table(ASSIGNMENTS).map_err(io_err)?;
            for assignment in &snapshot.assignments {
                let bytes = encode(assignment)?;
                assignments
                    .insert(assignment.id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut triggers = write_txn.open_table(TRIGGERS).map_err(io_err)?;
            for trigger in &snapshot.triggers {
                let bytes = encode(trigger)?;
                triggers
                    .insert(trigger.id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut calls = write_txn.open_table(CALLS).map_err(io_err)?;
            for call in &snapshot.calls {
                let bytes = encode(call)?;
                calls
                    .insert(call.id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut counters = write_txn.open_table(COUNTERS).map_err(io_err)?;
            for (kind, value) in &snapshot.counters {
                counters.insert(kind.as_str(), *value).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)
    }
}

// =============================================================================
// TESTS
// =============================================================================
