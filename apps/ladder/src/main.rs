//! # Ladder - Readiness Progression Server
//!
//! The main binary for the Ladder TRL / CRL progression engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for ledger inspection and review
//! - Directory loading from a TOML file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      apps/ladder (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │   HTTP API  │    │  Directory file  │     │
//! │  │  (clap)     │    │   (axum)    │    │  (toml)          │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                    ┌───────────────┐                            │
//! │                    │  ladder-core  │                            │
//! │                    │ (THE LOGIC)   │                            │
//! │                    └───────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! ladder --directory portfolio.toml server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! ladder levels --startup 7
//! ladder evidence --incubator 3 --status PENDING
//! ladder review --reviewer 3 --evidence 12 --decision APPROVED
//! ladder summary --incubator 3
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // LADDER_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("LADDER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ladder=info,tower_http=debug".into());

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

    let cli = ladder::cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = ladder::cli::execute(cli).await {
        tracing::error!(kind = e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Ladder startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗      █████╗ ██████╗ ██████╗ ███████╗██████╗
  ██║     ██╔══██╗██╔══██╗██╔══██╗██╔════╝██╔══██╗
  ██║     ███████║██║  ██║██║  ██║█████╗  ██████╔╝
  ██║     ██╔══██║██║  ██║██║  ██║██╔══╝  ██╔══██╗
  ███████╗██║  ██║██████╔╝██████╔╝███████╗██║  ██║
  ╚══════╝╚═╝  ╚═╝╚═════╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝

  Readiness Progression Server v{}

  Evidence • Review • Portfolio
"#,
        env!("CARGO_PKG_VERSION")
    );
}
