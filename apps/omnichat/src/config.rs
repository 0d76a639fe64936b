//! # Server Configuration
//!
//! TOML configuration for the server command. The file carries the bind
//! address plus the seed section: accounts, departments, and triggers to
//! provision into the directory before the server starts accepting
//! requests. Authentication is always on, so a fresh directory needs at
//! least one seeded account with a token to be reachable at all.
//!
//! ## Example
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 8080
//!
//! [[seed.users]]
//! username = "admin"
//! name = "Administrator"
//! roles = ["admin"]
//! token = "change-me"
//!
//! [[seed.departments]]
//! name = "Support"
//! agents = ["alice"]
//!
//! [[seed.triggers]]
//! name = "welcome"
//! enabled = true
//! ```

use omnichat_core::{OmnichatError, Registry, Role, TriggerSpec};
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// CONFIG STRUCTURES
// =============================================================================

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_enabled() -> bool {
    true
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub seed: SeedConfig,
}

/// Directory contents provisioned at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub users: Vec<SeedUser>,

    #[serde(default)]
    pub departments: Vec<SeedDepartment>,

    #[serde(default)]
    pub triggers: Vec<SeedTrigger>,
}

/// An account to provision.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,

    #[serde(default)]
    pub name: String,

    /// Role names: `admin`, `user`, `livechat-agent`, `livechat-manager`.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Personal access token. Accounts without one cannot call the API.
    #[serde(default)]
    pub token: Option<String>,
}

/// A department to provision, with its agent usernames.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedDepartment {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub agents: Vec<String>,
}

/// A trigger rule to provision.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTrigger {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub run_once: bool,
}

// =============================================================================
// LOADING
// =============================================================================

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, OmnichatError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            OmnichatError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            OmnichatError::SerializationError(format!(
                "Invalid config '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Bind address in `host:port` form.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a role name as written in the config file.
pub fn parse_role(name: &str) -> Result<Role, OmnichatError> {
    match name {
        "admin" => Ok(Role::Admin),
        "user" => Ok(Role::User),
        "livechat-agent" => Ok(Role::LivechatAgent),
        "livechat-manager" => Ok(Role::LivechatManager),
        other => Err(OmnichatError::InvalidField(format!(
            "unknown role '{}'",
            other
        ))),
    }
}

// =============================================================================
// SEEDING
// =============================================================================

/// Provision the seed section into a registry.
///
/// Idempotent over restarts against a persistent backend: an account whose
/// username already exists is updated in place (roles added, token
/// replaced), and departments/triggers whose names already exist are left
/// alone.
pub fn apply_seed(registry: &mut Registry, seed: &SeedConfig) -> Result<(), OmnichatError> {
    for user in &seed.users {
        let account = match registry.account_by_username(&user.username)? {
            Some(existing) => {
                let roles = user
                    .roles
                    .iter()
                    .map(|r| parse_role(r))
                    .collect::<Result<Vec<_>, _>>()?;
                registry.add_roles(&existing.id, roles)?
            }
            None => {
                let roles = user
                    .roles
                    .iter()
                    .map(|r| parse_role(r))
                    .collect::<Result<Vec<_>, _>>()?;
                registry.create_account(&user.username, &user.name, roles)?
            }
        };
        if let Some(token) = &user.token {
            registry.set_auth_token(&account.id, token)?;
        }
        tracing::info!(username = %user.username, id = %account.id, "Seeded account");
    }

    let existing_departments = registry.list_departments()?;
    for department in &seed.departments {
        if existing_departments.iter().any(|d| d.name == department.name) {
            continue;
        }
        let created = registry.create_department(&department.name, &department.description)?;
        for agent_username in &department.agents {
            let agent = registry
                .account_by_username(agent_username)?
                .ok_or_else(|| OmnichatError::UnknownUsername(agent_username.clone()))?;
            registry.assign_agent_to_department(&created.id, &agent.id)?;
        }
        tracing::info!(name = %department.name, id = %created.id, "Seeded department");
    }

    let existing_triggers = registry.export_snapshot()?.triggers;
    for trigger in &seed.triggers {
        if existing_triggers.iter().any(|t| t.name == trigger.name) {
            continue;
        }
        let created = registry.create_trigger(TriggerSpec {
            name: trigger.name.clone(),
            description: trigger.description.clone(),
            enabled: trigger.enabled,
            run_once: trigger.run_once,
            conditions: Vec::new(),
            actions: Vec::new(),
        })?;
        tracing::info!(name = %trigger.name, id = %created.id, "Seeded trigger");
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_names() {
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert_eq!(parse_role("livechat-agent").unwrap(), Role::LivechatAgent);
        assert!(parse_role("superuser").is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config: ServerConfig = toml::from_str("").expect("empty config is valid");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.seed.users.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let config: ServerConfig = toml::from_str(
            r#"
            host = "0.0.0.0"
            port = 9000

            [[seed.users]]
            username = "admin"
            name = "Administrator"
            roles = ["admin"]
            token = "secret"

            [[seed.departments]]
            name = "Support"
            agents = []

            [[seed.triggers]]
            name = "welcome"
            "#,
        )
        .expect("config parses");

        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.seed.users.len(), 1);
        assert_eq!(config.seed.users[0].roles, vec!["admin"]);
        assert!(config.seed.triggers[0].enabled);
    }

    #[test]
    fn test_apply_seed_provisions_accounts() {
        let mut registry = Registry::new();
        let seed = SeedConfig {
            users: vec![SeedUser {
                username: "admin".to_string(),
                name: "Administrator".to_string(),
                roles: vec!["admin".to_string()],
                token: Some("secret".to_string()),
            }],
            departments: Vec::new(),
            triggers: Vec::new(),
        };

        apply_seed(&mut registry, &seed).expect("seed applies");

        let account = registry
            .account_by_username("admin")
            .expect("lookup")
            .expect("account exists");
        assert!(account.roles.contains(&Role::Admin));
        assert_eq!(account.auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_apply_seed_is_idempotent() {
        let mut registry = Registry::new();
        let seed = SeedConfig {
            users: vec![SeedUser {
                username: "admin".to_string(),
                name: "Administrator".to_string(),
                roles: vec!["admin".to_string()],
                token: Some("secret".to_string()),
            }],
            departments: vec![SeedDepartment {
                name: "Support".to_string(),
                description: String::new(),
                agents: Vec::new(),
            }],
            triggers: vec![SeedTrigger {
                name: "welcome".to_string(),
                description: String::new(),
                enabled: true,
                run_once: false,
            }],
        };

        apply_seed(&mut registry, &seed).expect("first seed");
        apply_seed(&mut registry, &seed).expect("second seed");

        assert_eq!(registry.list_departments().expect("departments").len(), 1);
        let (_, total) = registry
            .list_triggers(omnichat_core::Page::default())
            .expect("triggers");
        assert_eq!(total, 1);
    }
}
