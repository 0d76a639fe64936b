//! Wire-shape tests for the livechat API JSON types.
//!
//! The JSON field names are a compatibility contract with existing clients
//! (`_id`, `departmentId`, `runOnce`, ...), so they are pinned here.

#![allow(clippy::unwrap_used, clippy::panic)]

use omnichat::api::{
    DepartmentAgentJson, ErrorResponse, TriggerJson, UserJson, UsersListResponse,
};
use omnichat_core::{
    DepartmentAgent, DepartmentId, Role, Trigger, TriggerAction, TriggerCondition, TriggerId,
    UserAccount, UserId, UserStatus,
};
use serde_json::json;

fn sample_account() -> UserAccount {
    UserAccount {
        id: UserId("usr-7".to_string()),
        username: "alice".to_string(),
        name: "Alice Agent".to_string(),
        status: UserStatus::default(),
        roles: [Role::User, Role::LivechatAgent].into_iter().collect(),
        auth_token: Some("secret".to_string()),
    }
}

// =============================================================================
// USER SHAPE
// =============================================================================

#[test]
fn test_user_json_uses_mongo_style_id() {
    let user = UserJson::from(sample_account());
    let value = serde_json::to_value(&user).unwrap();

    assert_eq!(value["_id"], "usr-7");
    assert_eq!(value["username"], "alice");
    assert_eq!(value["name"], "Alice Agent");
    assert!(value.get("id").is_none());
}

#[test]
fn test_user_json_never_carries_roles_or_token() {
    let user = UserJson::from(sample_account());
    let value = serde_json::to_value(&user).unwrap();

    assert!(value.get("roles").is_none());
    assert!(value.get("auth_token").is_none());
}

#[test]
fn test_users_list_count_tracks_page_not_total() {
    let response = UsersListResponse::new(vec![UserJson::from(sample_account())], 10, 42);

    assert!(response.success);
    assert_eq!(response.count, 1);
    assert_eq!(response.offset, 10);
    assert_eq!(response.total, 42);
}

// =============================================================================
// ERROR SHAPE
// =============================================================================

#[test]
fn test_not_authorized_shape() {
    let value = serde_json::to_value(ErrorResponse::not_authorized()).unwrap();
    assert_eq!(value, json!({ "success": false, "error": "error-not-authorized" }));
}

#[test]
fn test_forbidden_omits_error_field() {
    let value = serde_json::to_value(ErrorResponse::forbidden()).unwrap();
    assert_eq!(value, json!({ "success": false }));
}

// =============================================================================
// DEPARTMENT SHAPE
// =============================================================================

#[test]
fn test_department_assignment_field_names() {
    let assignment = DepartmentAgentJson::from(DepartmentAgent {
        id: "dag-1".to_string(),
        department_id: DepartmentId("dep-1".to_string()),
        agent_id: UserId("usr-7".to_string()),
        username: "alice".to_string(),
        count: 3,
        order: 0,
    });
    let value = serde_json::to_value(&assignment).unwrap();

    assert_eq!(value["_id"], "dag-1");
    assert_eq!(value["departmentId"], "dep-1");
    assert_eq!(value["agentId"], "usr-7");
    assert_eq!(value["count"], 3);
    assert!(value.get("department_id").is_none());
}

// =============================================================================
// TRIGGER SHAPE
// =============================================================================

#[test]
fn test_trigger_field_names() {
    let trigger = TriggerJson::from(Trigger {
        id: TriggerId("trg-1".to_string()),
        name: "welcome".to_string(),
        description: "Greets visitors".to_string(),
        enabled: true,
        run_once: true,
        conditions: vec![TriggerCondition {
            name: "page-url".to_string(),
            value: "/pricing".to_string(),
        }],
        actions: vec![TriggerAction {
            name: "send-message".to_string(),
            params: [("msg".to_string(), "Hello!".to_string())]
                .into_iter()
                .collect(),
        }],
    });
    let value = serde_json::to_value(&trigger).unwrap();

    assert_eq!(value["_id"], "trg-1");
    assert_eq!(value["runOnce"], true);
    assert!(value.get("run_once").is_none());
    assert_eq!(value["conditions"][0]["name"], "page-url");
}
