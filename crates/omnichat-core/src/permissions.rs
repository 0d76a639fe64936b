//! # Permission Engine
//!
//! A permission is granted to a set of roles; an account holds a permission
//! when the intersection of its roles with the grant set is non-empty.
//!
//! Grants are mutable at runtime (the product reconfigures them through its
//! admin surface), so the engine stores them in a plain map rather than
//! hard-coding role capabilities. [`PermissionGrants::default`] seeds the
//! stock grants.

use crate::types::{Role, UserAccount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PERMISSIONS
// =============================================================================

/// The permissions consulted by the livechat endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    ViewLivechatManager,
    ManageLivechatAgents,
    EditOmnichannelContact,
    TransferLivechatGuest,
    ViewLRoom,
}

impl Permission {
    /// Stable wire name of the permission.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewLivechatManager => "view-livechat-manager",
            Self::ManageLivechatAgents => "manage-livechat-agents",
            Self::EditOmnichannelContact => "edit-omnichannel-contact",
            Self::TransferLivechatGuest => "transfer-livechat-guest",
            Self::ViewLRoom => "view-l-room",
        }
    }

    /// All known permissions, in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::ViewLivechatManager,
            Self::ManageLivechatAgents,
            Self::EditOmnichannelContact,
            Self::TransferLivechatGuest,
            Self::ViewLRoom,
        ]
    }
}

// =============================================================================
// GRANTS
// =============================================================================

/// Runtime-mutable mapping of permission to granted roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrants {
    grants: BTreeMap<Permission, BTreeSet<Role>>,
}

impl Default for PermissionGrants {
    /// Stock grants: admin holds everything, manager holds the oversight
    /// set, agent holds the conversation-handling subset.
    fn default() -> Self {
        let mut grants = Self {
            grants: BTreeMap::new(),
        };
        for permission in Permission::all() {
            grants.grant(permission, Role::Admin);
        }
        for permission in [
            Permission::ViewLivechatManager,
            Permission::ManageLivechatAgents,
            Permission::EditOmnichannelContact,
            Permission::TransferLivechatGuest,
            Permission::ViewLRoom,
        ] {
            grants.grant(permission, Role::LivechatManager);
        }
        for permission in [
            Permission::EditOmnichannelContact,
            Permission::TransferLivechatGuest,
            Permission::ViewLRoom,
        ] {
            grants.grant(permission, Role::LivechatAgent);
        }
        grants
    }
}

impl PermissionGrants {
    /// Empty grant table. Nobody holds anything.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            grants: BTreeMap::new(),
        }
    }

    /// Add a role to a permission's grant set.
    pub fn grant(&mut self, permission: Permission, role: Role) {
        self.grants.entry(permission).or_default().insert(role);
    }

    /// Replace a permission's grant set wholesale.
    ///
    /// This mirrors the product's `updatePermission` admin operation: the
    /// new set is authoritative, including the empty set.
    pub fn set(&mut self, permission: Permission, roles: impl IntoIterator<Item = Role>) {
        self.grants.insert(permission, roles.into_iter().collect());
    }

    /// Roles currently granted a permission.
    #[must_use]
    pub fn roles_for(&self, permission: Permission) -> BTreeSet<Role> {
        self.grants.get(&permission).cloned().unwrap_or_default()
    }

    /// Whether the account holds the permission through any of its roles.
    #[must_use]
    pub fn has_permission(&self, account: &UserAccount, permission: Permission) -> bool {
        self.grants
            .get(&permission)
            .is_some_and(|roles| roles.iter().any(|role| account.has_role(*role)))
    }

    /// Whether the account holds at least one of the given permissions.
    ///
    /// Listing endpoints accept several alternative permissions; holding
    /// any single one is sufficient.
    #[must_use]
    pub fn has_any_permission(&self, account: &UserAccount, permissions: &[Permission]) -> bool {
        permissions
            .iter()
            .any(|permission| self.has_permission(account, *permission))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{UserId, UserStatus};

    fn account_with_roles(roles: &[Role]) -> UserAccount {
        UserAccount {
            id: UserId("usr-1".to_string()),
            username: "tester".to_string(),
            name: "Tester".to_string(),
            status: UserStatus::default(),
            roles: roles.iter().copied().collect(),
            auth_token: None,
        }
    }

    #[test]
    fn test_default_grants_admin_holds_everything() {
        let grants = PermissionGrants::default();
        let admin = account_with_roles(&[Role::Admin]);
        for permission in Permission::all() {
            assert!(
                grants.has_permission(&admin, permission),
                "admin must hold {}",
                permission.as_str()
            );
        }
    }

    #[test]
    fn test_default_grants_agent_subset() {
        let grants = PermissionGrants::default();
        let agent = account_with_roles(&[Role::LivechatAgent]);
        assert!(grants.has_permission(&agent, Permission::ViewLRoom));
        assert!(!grants.has_permission(&agent, Permission::ViewLivechatManager));
        assert!(!grants.has_permission(&agent, Permission::ManageLivechatAgents));
    }

    #[test]
    fn test_set_replaces_grant_including_empty() {
        let mut grants = PermissionGrants::default();
        let admin = account_with_roles(&[Role::Admin]);

        grants.set(Permission::ViewLivechatManager, []);
        assert!(!grants.has_permission(&admin, Permission::ViewLivechatManager));

        grants.set(Permission::ViewLivechatManager, [Role::Admin]);
        assert!(grants.has_permission(&admin, Permission::ViewLivechatManager));
    }

    #[test]
    fn test_has_any_permission() {
        let mut grants = PermissionGrants::empty();
        grants.grant(Permission::TransferLivechatGuest, Role::LivechatAgent);
        let agent = account_with_roles(&[Role::LivechatAgent]);

        assert!(grants.has_any_permission(
            &agent,
            &[
                Permission::EditOmnichannelContact,
                Permission::TransferLivechatGuest,
                Permission::ManageLivechatAgents,
            ]
        ));
        assert!(!grants.has_any_permission(&agent, &[Permission::ViewLivechatManager]));
    }

    #[test]
    fn test_plain_user_holds_nothing_by_default() {
        let grants = PermissionGrants::default();
        let user = account_with_roles(&[Role::User]);
        for permission in Permission::all() {
            assert!(!grants.has_permission(&user, permission));
        }
    }
}
