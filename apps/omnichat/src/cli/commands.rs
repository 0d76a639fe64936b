//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::{ServerConfig, apply_seed, parse_role};
use omnichat_core::{
    OmnichatError, Registry, UserId, UserType,
    export::{canonical_checksum, export_canonical, import_canonical},
};
use std::path::PathBuf;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for import (500 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &PathBuf, max_size: u64) -> Result<(), OmnichatError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| OmnichatError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(OmnichatError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate file path for security.
///
/// This function:
/// 1. Canonicalizes the path to resolve symlinks and ".."
/// 2. Ensures the path exists
/// 3. Ensures the path is a file (not a directory)
fn validate_file_path(path: &std::path::Path) -> Result<PathBuf, OmnichatError> {
    // Canonicalize resolves "..", symlinks, and validates existence
    let canonical = path.canonicalize().map_err(|e| {
        OmnichatError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    // Ensure it's a file, not a directory
    if !canonical.is_file() {
        return Err(OmnichatError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate output path for security.
///
/// For output files, we validate the parent directory exists and is writable.
fn validate_output_path(path: &std::path::Path) -> Result<PathBuf, OmnichatError> {
    let parent = path.parent().unwrap_or(std::path::Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        OmnichatError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(OmnichatError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| OmnichatError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &PathBuf,
    backend: &str,
    host: &str,
    port: u16,
    config_path: Option<&std::path::Path>,
) -> Result<(), OmnichatError> {
    let mut registry = load_or_create_registry(db_path, backend)?;

    let (addr, config) = match config_path {
        Some(path) => {
            let config = ServerConfig::load(path)?;
            (config.bind_addr(), Some(config))
        }
        None => (format!("{}:{}", host, port), None),
    };

    if let Some(config) = &config {
        apply_seed(&mut registry, &config.seed)?;
        save_registry(&registry, db_path)?;
    }

    println!("Omnichat Livechat Directory Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!();
    println!("Endpoints:");
    println!("  GET    /v1/livechat/users/{{type}}          - List agents/managers");
    println!("  POST   /v1/livechat/users/{{type}}          - Grant a livechat role");
    println!("  GET    /v1/livechat/users/{{type}}/{{id}}     - Fetch one member");
    println!("  DELETE /v1/livechat/users/{{type}}/{{id}}     - Revoke a livechat role");
    println!("  GET    /v1/livechat/agents/{{id}}/departments");
    println!("  GET    /v1/livechat/triggers               - List trigger rules");
    println!("  GET    /v1/video-conferences/{{id}}         - Fetch a call");
    println!("  POST   /v1/export                          - Export directory");
    println!("  GET    /health                             - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&addr, registry).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show directory status.
pub fn cmd_status(db_path: &PathBuf, backend: &str, json_mode: bool) -> Result<(), OmnichatError> {
    let registry = load_or_create_registry(db_path, backend)?;
    let metrics = registry.metrics()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "agents": metrics.agent_count,
            "managers": metrics.manager_count,
            "departments": metrics.department_count,
            "triggers": metrics.trigger_count
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Omnichat Directory Status");
    println!("=========================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Agents:      {}", metrics.agent_count);
    println!("Managers:    {}", metrics.manager_count);
    println!("Departments: {}", metrics.department_count);
    println!("Triggers:    {}", metrics.trigger_count);

    Ok(())
}

// =============================================================================
// PROVISION COMMAND
// =============================================================================

/// Create an account with roles and an access token.
pub fn cmd_provision(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    username: &str,
    name: &str,
    roles: &[String],
    token: Option<&str>,
) -> Result<(), OmnichatError> {
    let mut registry = load_or_create_registry(db_path, backend)?;

    let parsed_roles = roles
        .iter()
        .map(|r| parse_role(r))
        .collect::<Result<Vec<_>, _>>()?;

    let account = registry.create_account(username, name, parsed_roles)?;
    if let Some(token) = token {
        registry.set_auth_token(&account.id, token)?;
    }

    save_registry(&registry, db_path)?;

    if json_mode {
        let output = serde_json::json!({
            "_id": account.id.as_str(),
            "username": account.username,
            "roles": account.roles
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Provisioned account {} ({})", account.id, account.username);
    if token.is_some() {
        println!("Access token set");
    }

    Ok(())
}

// =============================================================================
// GRANT / REVOKE COMMANDS
// =============================================================================

/// Grant a livechat role to an existing account by username.
pub fn cmd_grant(
    db_path: &PathBuf,
    backend: &str,
    user_type: &str,
    username: &str,
) -> Result<(), OmnichatError> {
    let user_type = UserType::parse(user_type)?;
    let mut registry = load_or_create_registry(db_path, backend)?;

    let account = registry.add_user_to_type(user_type, username)?;
    save_registry(&registry, db_path)?;

    println!(
        "Granted {} role to {} ({})",
        user_type.role().as_str(),
        account.username,
        account.id
    );

    Ok(())
}

/// Revoke a livechat role from an account by id.
pub fn cmd_revoke(
    db_path: &PathBuf,
    backend: &str,
    user_type: &str,
    id: &str,
) -> Result<(), OmnichatError> {
    let user_type = UserType::parse(user_type)?;
    let mut registry = load_or_create_registry(db_path, backend)?;

    let id = UserId(id.to_string());
    registry.remove_user_from_type(user_type, &id)?;
    save_registry(&registry, db_path)?;

    println!("Revoked {} role from {}", user_type.role().as_str(), id);

    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Apply the seed section of a config file to the directory.
pub fn cmd_seed(
    db_path: &PathBuf,
    backend: &str,
    config_path: &std::path::Path,
) -> Result<(), OmnichatError> {
    let config = ServerConfig::load(config_path)?;
    let mut registry = load_or_create_registry(db_path, backend)?;

    apply_seed(&mut registry, &config.seed)?;
    save_registry(&registry, db_path)?;

    let metrics = registry.metrics()?;
    println!(
        "Seeded directory: {} agents, {} managers, {} departments, {} triggers",
        metrics.agent_count, metrics.manager_count, metrics.department_count, metrics.trigger_count
    );

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export directory.
pub fn cmd_export(
    db_path: &PathBuf,
    backend: &str,
    output: &std::path::Path,
    format: &str,
) -> Result<(), OmnichatError> {
    // Validate output path for security (prevents path traversal)
    let validated_output = validate_output_path(output)?;

    let registry = load_or_create_registry(db_path, backend)?;
    let snapshot = registry.export_snapshot()?;

    let data = match format {
        "canonical" => {
            let data = export_canonical(&snapshot)?;
            let checksum = canonical_checksum(&snapshot)?;
            println!("Checksum: {}", checksum);
            data
        }
        "json" => serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| OmnichatError::SerializationError(e.to_string()))?,
        _ => {
            return Err(OmnichatError::SerializationError(format!(
                "Unknown format: {}. Use: canonical, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| OmnichatError::SerializationError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);

    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import directory.
pub fn cmd_import(
    db_path: &PathBuf,
    backend: &str,
    input: &std::path::Path,
) -> Result<(), OmnichatError> {
    // Validate file path for security (prevents path traversal)
    let validated_path = validate_file_path(input)?;

    // Validate file size before reading to prevent DoS
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| OmnichatError::SerializationError(format!("Read file: {}", e)))?;

    let snapshot = import_canonical(&data)?;

    let mut registry = load_or_create_registry(db_path, backend)?;
    registry.import_snapshot(snapshot)?;
    save_registry(&registry, db_path)?;

    let metrics = registry.metrics()?;
    println!(
        "Imported directory: {} agents, {} managers, {} departments, {} triggers",
        metrics.agent_count, metrics.manager_count, metrics.department_count, metrics.trigger_count
    );

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(db_path: &PathBuf, backend: &str, force: bool) -> Result<(), OmnichatError> {
    if db_path.exists() && !force {
        return Err(OmnichatError::SerializationError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }

    match backend {
        "redb" => {
            let _registry = Registry::with_redb(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        _ => {
            let registry = Registry::new();
            save_registry(&registry, db_path)?;
            println!("Initialized new file database at {:?}", db_path);
        }
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a registry from a database path with specified backend.
pub fn load_or_create_registry(
    db_path: &PathBuf,
    backend: &str,
) -> Result<Registry, OmnichatError> {
    match backend {
        "redb" => Registry::with_redb(db_path),
        _ => {
            if db_path.exists() {
                let data = std::fs::read(db_path)
                    .map_err(|e| OmnichatError::SerializationError(format!("Read db: {}", e)))?;

                let snapshot = import_canonical(&data)?;
                let mut registry = Registry::new();
                registry.import_snapshot(snapshot)?;
                Ok(registry)
            } else {
                Ok(Registry::new())
            }
        }
    }
}

/// Save a registry to a database path.
pub fn save_registry(registry: &Registry, db_path: &PathBuf) -> Result<(), OmnichatError> {
    if registry.is_persistent() {
        // Redb backend - already persisted, nothing to do
        Ok(())
    } else {
        // File backend - export to canonical format
        let snapshot = registry.export_snapshot()?;
        let data = export_canonical(&snapshot)?;
        std::fs::write(db_path, &data)
            .map_err(|e| OmnichatError::SerializationError(format!("Write db: {}", e)))?;
        Ok(())
    }
}
