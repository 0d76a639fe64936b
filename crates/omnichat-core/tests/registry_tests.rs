//! Integration tests for the Registry against both storage backends.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use omnichat_core::{
    OmnichatError, Page, Registry, Role, TriggerSpec, UserId, UserType,
    types::TriggerCondition,
};

fn registry_with_accounts() -> Registry {
    let mut registry = Registry::new();
    registry
        .create_account("alice", "Alice", [Role::LivechatAgent])
        .unwrap();
    registry
        .create_account("bob", "Bob", [Role::LivechatManager])
        .unwrap();
    registry.create_account("carol", "Carol", []).unwrap();
    registry
}

// =============================================================================
// LIVECHAT USER TYPE TESTS
// =============================================================================

#[test]
fn test_add_user_to_type_grants_role() {
    let mut registry = registry_with_accounts();

    let user = registry.add_user_to_type(UserType::Agent, "carol").unwrap();
    assert!(user.has_role(Role::LivechatAgent));
    assert_eq!(user.username, "carol");

    // The returned id matches the pre-existing account
    let stored = registry.account_by_username("carol").unwrap().unwrap();
    assert_eq!(stored.id, user.id);
}

#[test]
fn test_add_user_to_type_is_idempotent() {
    let mut registry = registry_with_accounts();

    let first = registry.add_user_to_type(UserType::Agent, "alice").unwrap();
    let second = registry.add_user_to_type(UserType::Agent, "alice").unwrap();
    assert_eq!(first.id, second.id);

    let (agents, total) = registry.list_users(UserType::Agent, Page::default()).unwrap();
    assert_eq!(total, 1);
    assert_eq!(agents.len(), 1);
}

#[test]
fn test_add_user_unknown_username_fails() {
    let mut registry = registry_with_accounts();

    let err = registry
        .add_user_to_type(UserType::Agent, "mr-not-valid")
        .unwrap_err();
    assert!(matches!(err, OmnichatError::UnknownUsername(_)));
}

#[test]
fn test_user_in_type_null_for_non_member() {
    let registry = registry_with_accounts();
    let carol = registry.account_by_username("carol").unwrap().unwrap();

    // Valid account without the role: absent resource, not an error
    let result = registry.user_in_type(UserType::Agent, &carol.id).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_user_in_type_unknown_id_is_error() {
    let registry = registry_with_accounts();

    let err = registry
        .user_in_type(UserType::Agent, &UserId("invalid-id".to_string()))
        .unwrap_err();
    assert!(matches!(err, OmnichatError::UnknownUser(_)));
}

#[test]
fn test_remove_user_from_type() {
    let mut registry = registry_with_accounts();
    let alice = registry.account_by_username("alice").unwrap().unwrap();

    registry.remove_user_from_type(UserType::Agent, &alice.id).unwrap();
    assert!(
        registry
            .user_in_type(UserType::Agent, &alice.id)
            .unwrap()
            .is_none()
    );

    // Second removal fails: the role is no longer held
    let err = registry
        .remove_user_from_type(UserType::Agent, &alice.id)
        .unwrap_err();
    assert!(matches!(err, OmnichatError::NotInRole { .. }));
}

#[test]
fn test_remove_agent_drops_department_assignments() {
    let mut registry = registry_with_accounts();
    let alice = registry.account_by_username("alice").unwrap().unwrap();
    let dept = registry.create_department("Support", "").unwrap();
    registry
        .assign_agent_to_department(&dept.id, &alice.id)
        .unwrap();
    assert_eq!(registry.departments_for_agent(&alice.id).unwrap().len(), 1);

    registry.remove_user_from_type(UserType::Agent, &alice.id).unwrap();
    assert!(registry.departments_for_agent(&alice.id).unwrap().is_empty());
}

// =============================================================================
// DEPARTMENT TESTS
// =============================================================================

#[test]
fn test_departments_for_unknown_agent_is_empty_not_error() {
    let registry = registry_with_accounts();

    let rows = registry
        .departments_for_agent(&UserId("invalid-id".to_string()))
        .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_assignments_carry_queried_agent_id() {
    let mut registry = registry_with_accounts();
    let alice = registry.account_by_username("alice").unwrap().unwrap();
    registry.add_user_to_type(UserType::Agent, "carol").unwrap();
    let carol = registry.account_by_username("carol").unwrap().unwrap();

    let support = registry.create_department("Support", "").unwrap();
    let sales = registry.create_department("Sales", "").unwrap();
    registry.assign_agent_to_department(&support.id, &alice.id).unwrap();
    registry.assign_agent_to_department(&sales.id, &alice.id).unwrap();
    registry.assign_agent_to_department(&sales.id, &carol.id).unwrap();

    let rows = registry.departments_for_agent(&alice.id).unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.agent_id, alice.id);
    }
}

#[test]
fn test_assign_non_agent_fails() {
    let mut registry = registry_with_accounts();
    let carol = registry.account_by_username("carol").unwrap().unwrap();
    let dept = registry.create_department("Support", "").unwrap();

    let err = registry
        .assign_agent_to_department(&dept.id, &carol.id)
        .unwrap_err();
    assert!(matches!(err, OmnichatError::NotInRole { .. }));
}

#[test]
fn test_assignment_bumps_department_agent_count() {
    let mut registry = registry_with_accounts();
    let alice = registry.account_by_username("alice").unwrap().unwrap();
    let dept = registry.create_department("Support", "").unwrap();
    registry.assign_agent_to_department(&dept.id, &alice.id).unwrap();

    let departments = registry.list_departments().unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0].num_agents, 1);
}

// =============================================================================
// TRIGGER TESTS
// =============================================================================

#[test]
fn test_trigger_listing_and_lookup() {
    let mut registry = Registry::new();
    let created = registry
        .create_trigger(TriggerSpec {
            name: "welcome".to_string(),
            description: "greet visitors".to_string(),
            enabled: true,
            run_once: true,
            conditions: vec![TriggerCondition {
                name: "time-on-site".to_string(),
                value: "30".to_string(),
            }],
            actions: vec![],
        })
        .unwrap();

    let (triggers, total) = registry.list_triggers(Page::default()).unwrap();
    assert_eq!(total, 1);
    assert_eq!(triggers[0].id, created.id);

    let found = registry.find_trigger(&created.id).unwrap();
    assert_eq!(found, Some(created));
}

#[test]
fn test_list_users_pagination_totals() {
    let mut registry = Registry::new();
    for n in 0..7 {
        registry
            .create_account(&format!("agent{n}"), "Agent", [Role::LivechatAgent])
            .unwrap();
    }

    let (page, total) = registry
        .list_users(UserType::Agent, Page::new(5, 5))
        .unwrap();
    assert_eq!(total, 7);
    assert_eq!(page.len(), 2);
}

// =============================================================================
// PERSISTENT BACKEND TESTS
// =============================================================================

#[test]
fn test_redb_backend_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("directory.redb");

    let alice_id;
    {
        let mut registry = Registry::with_redb(&path).unwrap();
        assert!(registry.is_persistent());
        let alice = registry
            .create_account("alice", "Alice", [Role::LivechatAgent])
            .unwrap();
        alice_id = alice.id;
    }

    let registry = Registry::with_redb(&path).unwrap();
    let loaded = registry.user_in_type(UserType::Agent, &alice_id).unwrap();
    assert_eq!(loaded.map(|u| u.username), Some("alice".to_string()));
}

#[test]
fn test_snapshot_migrates_between_backends() {
    let mut memory = registry_with_accounts();
    memory
        .create_trigger(TriggerSpec {
            name: "welcome".to_string(),
            ..TriggerSpec::default()
        })
        .unwrap();
    let snapshot = memory.export_snapshot().unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let mut persistent = Registry::with_redb(dir.path().join("directory.redb")).unwrap();
    persistent.import_snapshot(snapshot.clone()).unwrap();

    assert_eq!(persistent.export_snapshot().unwrap(), snapshot);
    let metrics = persistent.metrics().unwrap();
    assert_eq!(metrics.agent_count, 1);
    assert_eq!(metrics.manager_count, 1);
    assert_eq!(metrics.trigger_count, 1);
}
