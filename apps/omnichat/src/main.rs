//! # Omnichat - Livechat Directory Server
//!
//! The main binary for the Omnichat livechat directory.
//!
//! This application provides:
//! - HTTP REST API server (axum-based livechat surface)
//! - CLI interface for directory operations
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    apps/omnichat (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐    │
//! │  │   CLI       │    │   HTTP API  │    │  Seed Config     │    │
//! │  │  (clap)     │    │   (axum)    │    │  (toml)          │    │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘    │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                    ┌────────────────┐                           │
//! │                    │ omnichat-core  │                           │
//! │                    │  (THE LOGIC)   │                           │
//! │                    └────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server with a seed config
//! omnichat server --config omnichat.toml
//!
//! # CLI operations
//! omnichat status
//! omnichat provision -u admin -r admin -t change-me
//! omnichat grant -t agent -u alice
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omnichat::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — OMNICHAT_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("OMNICHAT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "omnichat=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Omnichat startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ███╗   ███╗███╗   ██╗██╗ ██████╗██╗  ██╗ █████╗ ████████╗
  ██╔═══██╗████╗ ████║████╗  ██║██║██╔════╝██║  ██║██╔══██╗╚══██╔══╝
  ██║   ██║██╔████╔██║██╔██╗ ██║██║██║     ███████║███████║   ██║
  ██║   ██║██║╚██╔╝██║██║╚██╗██║██║██║     ██╔══██║██╔══██║   ██║
  ╚██████╔╝██║ ╚═╝ ██║██║ ╚████║██║╚██████╗██║  ██║██║  ██║   ██║
   ╚═════╝ ╚═╝     ╚═╝╚═╝  ╚═══╝╚═╝ ╚═════╝╚═╝  ╚═╝╚═╝  ╚═╝   ╚═╝

  Livechat Directory Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
