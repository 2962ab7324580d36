//! # Ladder CLI Module
//!
//! This module implements the CLI interface for Ladder.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show ledger status
//! - `init` - Initialize a new database
//! - `levels` - Show the cached TRL / CRL of a startup
//! - `claims` - List a startup's claims
//! - `evidence` - List a startup's evidence or an incubator's review queue
//! - `review` - Approve or reject evidence as an incubator
//! - `summary` - Show an incubator's portfolio summary
//! - `reconcile` - Recompute every cached level and report drift
//! - `export` - Write a JSON snapshot of the ledger

mod commands;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use ladder_core::LadderError;
use std::fmt;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Ladder - Readiness Progression Server
///
/// Tracks TRL / CRL claims and evidence for startups and rolls them up into
/// incubator portfolios.
#[derive(Parser, Debug)]
#[command(name = "ladder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the ledger database
    #[arg(short = 'D', long, global = true, default_value = "ladder.redb")]
    pub database: PathBuf,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum, default_value_t = Backend::Redb)]
    pub backend: Backend,

    /// TOML file describing incubators, startups and investment rounds
    #[arg(long, global = true)]
    pub directory: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the ledger lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// ACID redb database
    Redb,
    /// JSON snapshot file, rewritten after every successful command
    File,
    /// Volatile; nothing survives the process
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Redb => "redb",
            Backend::File => "file",
            Backend::Memory => "memory",
        })
    }
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
    },

    /// Show ledger status
    Status,

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show the cached levels of a startup
    Levels {
        #[arg(short, long)]
        startup: u64,
    },

    /// List the claims of a startup
    Claims {
        #[arg(short, long)]
        startup: u64,
    },

    /// List evidence of a startup, or across an incubator's portfolio
    #[command(group(ArgGroup::new("owner").required(true).args(["startup", "incubator"])))]
    Evidence {
        #[arg(short, long)]
        startup: Option<u64>,

        #[arg(short, long)]
        incubator: Option<u64>,

        /// Only items with this status (PENDING, APPROVED, REJECTED)
        #[arg(long)]
        status: Option<String>,
    },

    /// Approve or reject an evidence item
    Review {
        /// Reviewing incubator id
        #[arg(short, long)]
        reviewer: u64,

        /// Evidence id
        #[arg(short, long)]
        evidence: u64,

        /// APPROVED or REJECTED
        #[arg(short, long)]
        decision: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show an incubator's portfolio summary
    Summary {
        #[arg(short, long)]
        incubator: u64,
    },

    /// Recompute every cached level and report the startups that drifted
    Reconcile,

    /// Write the ledger as a JSON snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), LadderError> {
    let db = cli.database.as_path();
    let backend = cli.backend;
    let json_mode = cli.json_mode;
    let directory = cli.directory.as_deref();

    match cli.command {
        Some(Commands::Server { host, port }) => {
            cmd_server(db, backend, directory, &host, port).await
        }
        Some(Commands::Status) | None => cmd_status(db, backend, json_mode),
        Some(Commands::Init { force }) => cmd_init(db, backend, force),
        Some(Commands::Levels { startup }) => cmd_levels(db, backend, json_mode, startup),
        Some(Commands::Claims { startup }) => cmd_claims(db, backend, json_mode, startup),
        Some(Commands::Evidence {
            startup,
            incubator,
            status,
        }) => cmd_evidence(
            db,
            backend,
            directory,
            json_mode,
            startup,
            incubator,
            status.as_deref(),
        ),
        Some(Commands::Review {
            reviewer,
            evidence,
            decision,
            notes,
        }) => cmd_review(
            db, backend, directory, json_mode, reviewer, evidence, &decision, notes,
        ),
        Some(Commands::Summary { incubator }) => {
            cmd_summary(db, backend, directory, json_mode, incubator)
        }
        Some(Commands::Reconcile) => cmd_reconcile(db, backend, json_mode),
        Some(Commands::Export { output }) => cmd_export(db, backend, &output),
    }
}

// =============================================================================
// TESTS
// =============================================================================
