//! # Omnichat CLI Module
//!
//! This module implements the CLI interface for Omnichat.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show directory status
//! - `provision` - Create an account with roles and a token
//! - `grant` - Grant a livechat role (agent/manager) by username
//! - `revoke` - Revoke a livechat role by account id
//! - `seed` - Apply a TOML seed section to the directory
//! - `export` - Export directory to file
//! - `import` - Import directory from file
//! - `init` - Initialize new database

mod commands;

use clap::{Parser, Subcommand};
use omnichat_core::OmnichatError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Omnichat - Livechat Directory Server
///
/// The directory behind the livechat REST surface: accounts, roles,
/// permission grants, departments, and proactive-chat triggers.
#[derive(Parser, Debug)]
#[command(name = "omnichat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the directory database
    #[arg(short = 'D', long, global = true, default_value = "omnichat.db")]
    pub database: PathBuf,

    /// Storage backend: "file" (canonical file) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// TOML config file (bind address + seed accounts/departments/triggers).
        /// When given, its host/port take precedence over the flags.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show directory status
    Status,

    /// Create an account with roles and an access token
    Provision {
        /// Login name for the account
        #[arg(short, long)]
        username: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Roles: admin, user, livechat-agent, livechat-manager
        #[arg(short, long, value_delimiter = ',')]
        roles: Vec<String>,

        /// Personal access token for API calls
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Grant a livechat role to an existing account by username
    Grant {
        /// User type: "agent" or "manager"
        #[arg(short = 't', long)]
        user_type: String,

        /// Username of the account
        #[arg(short, long)]
        username: String,
    },

    /// Revoke a livechat role from an account by id
    Revoke {
        /// User type: "agent" or "manager"
        #[arg(short = 't', long)]
        user_type: String,

        /// Account id (e.g. usr-3)
        #[arg(short, long)]
        id: String,
    },

    /// Apply the seed section of a TOML config file to the directory
    Seed {
        /// TOML config file carrying a `[seed]` section
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Export directory in canonical format
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (canonical, json)
        #[arg(short = 't', long, default_value = "canonical")]
        format: String,
    },

    /// Import directory from canonical format
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), OmnichatError> {
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, config }) => {
            cmd_server(&cli.database, backend, &host, port, config.as_deref()).await
        }
        Some(Commands::Status) => cmd_status(&cli.database, backend, json_mode),
        Some(Commands::Provision {
            username,
            name,
            roles,
            token,
        }) => cmd_provision(
            &cli.database,
            backend,
            json_mode,
            &username,
            &name,
            &roles,
            token.as_deref(),
        ),
        Some(Commands::Grant {
            user_type,
            username,
        }) => cmd_grant(&cli.database, backend, &user_type, &username),
        Some(Commands::Revoke { user_type, id }) => {
            cmd_revoke(&cli.database, backend, &user_type, &id)
        }
        Some(Commands::Seed { config }) => cmd_seed(&cli.database, backend, &config),
        Some(Commands::Export { output, format }) => {
            cmd_export(&cli.database, backend, &output, &format)
        }
        Some(Commands::Import { input }) => cmd_import(&cli.database, backend, &input),
        Some(Commands::Init { force }) => cmd_init(&cli.database, backend, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, backend, json_mode)
        }
    }
}
