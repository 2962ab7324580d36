//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the ledger, runs, and (for the `file` backend)
//! writes the snapshot back if anything changed.

use super::Backend;
use crate::api::{
    self, AppState, ClaimJson, EvidenceJson, EvidenceResponse, LevelsResponse, StartupRowJson,
    SummaryResponse,
};
use crate::config::load_directory;
use crate::snapshot;
use ladder_core::{
    Command, EvidenceId, IncubatorId, LadderError, LedgerSnapshot, MemoryLedger, Outcome,
    Principal, Registry, ReviewDecision, ReviewStatus, StartupId, StaticDirectory,
};
use serde::Serialize;
use std::path::Path;

// =============================================================================
// LEDGER LOADING
// =============================================================================

/// Open the ledger at `db_path` with the chosen backend.
pub fn load_registry(db_path: &Path, backend: Backend) -> Result<Registry, LadderError> {
    match backend {
        Backend::Redb => Registry::with_redb(db_path),
        Backend::Memory => Ok(Registry::new()),
        Backend::File => {
            if !db_path.exists() {
                return Ok(Registry::new());
            }
            let snapshot = snapshot::read(db_path)?;
            Ok(Registry::with_memory(MemoryLedger::from_snapshot(snapshot)?))
        }
    }
}

/// Persist the ledger. Only the `file` backend needs an explicit write.
pub fn save_registry(
    registry: &Registry,
    db_path: &Path,
    backend: Backend,
) -> Result<(), LadderError> {
    match backend {
        Backend::File => snapshot::write(&registry.snapshot()?, db_path),
        Backend::Redb | Backend::Memory => Ok(()),
    }
}

/// Print `value` as pretty JSON.
fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &Path,
    backend: Backend,
    directory_path: Option<&Path>,
    host: &str,
    port: u16,
) -> Result<(), LadderError> {
    let registry = load_registry(db_path, backend)?;
    let directory = load_directory(directory_path)?;

    println!("Ladder Readiness Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!("  Backend:   {}", backend);
    println!("  Database:  {:?}", db_path);
    println!("  Directory: {:?}", directory_path);
    println!();
    println!("Endpoints:");
    println!("  GET/POST         /claims");
    println!("  GET/PATCH/DELETE /claims/{{id}}");
    println!("  GET/POST         /evidence");
    println!("  PATCH/DELETE     /evidence/{{id}}");
    println!("  POST             /evidence/{{id}}/review");
    println!("  GET              /startups/{{id}}/levels");
    println!("  GET              /portfolio/{{summary,startups,claims,evidence}}");
    println!("  GET              /health");
    println!();
    println!("Press Ctrl+C (or send SIGTERM) to stop");
    println!();

    let mut state = AppState::new(registry, directory);
    if backend == Backend::File {
        state = state.persist_to(db_path.to_path_buf());
    }
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS / INIT COMMANDS
// =============================================================================

/// Show ledger status.
pub fn cmd_status(db_path: &Path, backend: Backend, json_mode: bool) -> Result<(), LadderError> {
    let registry = load_registry(db_path, backend)?;
    let snapshot = registry.snapshot()?;
    let mut startups: Vec<u64> = snapshot
        .claims
        .iter()
        .map(|c| c.startup.0)
        .chain(snapshot.evidence.iter().map(|e| e.startup.0))
        .collect();
    startups.sort_unstable();
    startups.dedup();
    let pending = snapshot
        .evidence
        .iter()
        .filter(|e| e.status == ReviewStatus::Pending)
        .count();

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend.to_string(),
            "claims": snapshot.claims.len(),
            "evidence": snapshot.evidence.len(),
            "pending_evidence": pending,
            "startups": startups.len(),
        }));
        return Ok(());
    }

    println!("Ladder Ledger Status");
    println!("====================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Startups:         {}", startups.len());
    println!("Claims:           {}", snapshot.claims.len());
    println!("Evidence:         {}", snapshot.evidence.len());
    println!("Pending review:   {}", pending);

    Ok(())
}

/// Initialize a new empty database.
pub fn cmd_init(db_path: &Path, backend: Backend, force: bool) -> Result<(), LadderError> {
    if backend == Backend::Memory {
        println!("Memory backend needs no initialization");
        return Ok(());
    }

    if db_path.exists() {
        if !force {
            return Err(LadderError::Validation(format!(
                "database {:?} already exists. Use --force to overwrite.",
                db_path
            )));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| LadderError::Io(format!("cannot remove {:?}: {}", db_path, e)))?;
    }

    match backend {
        Backend::Redb => {
            Registry::with_redb(db_path)?;
        }
        Backend::File => snapshot::write(&LedgerSnapshot::default(), db_path)?,
        Backend::Memory => {}
    }

    tracing::info!(backend = %backend, "Initialized database at {:?}", db_path);
    println!("Initialized empty {} database at {:?}", backend, db_path);
    Ok(())
}

// =============================================================================
// STARTUP COMMANDS
// =============================================================================

/// Show the cached levels of a startup, as seen by the startup itself.
pub fn cmd_levels(
    db_path: &Path,
    backend: Backend,
    json_mode: bool,
    startup: u64,
) -> Result<(), LadderError> {
    let registry = load_registry(db_path, backend)?;
    let id = StartupId(startup);
    let levels = registry.levels(Principal::Startup(id), &StaticDirectory::new(), id)?;

    if json_mode {
        print_json(&LevelsResponse::new(id, levels));
        return Ok(());
    }

    println!("Startup {}", startup);
    println!("  TRL: {}", levels.trl);
    println!("  CRL: {}", levels.crl);
    Ok(())
}

pub fn cmd_claims(
    db_path: &Path,
    backend: Backend,
    json_mode: bool,
    startup: u64,
) -> Result<(), LadderError> {
    let registry = load_registry(db_path, backend)?;
    let claims = registry.claims(Principal::Startup(StartupId(startup)))?;

    if json_mode {
        let claims: Vec<ClaimJson> = claims.into_iter().map(Into::into).collect();
        print_json(&claims);
        return Ok(());
    }

    if claims.is_empty() {
        println!("No claims for startup {}", startup);
        return Ok(());
    }
    for claim in claims {
        println!(
            "#{:<6} {} {}  {}",
            claim.id.0, claim.track, claim.level, claim.title
        );
    }
    Ok(())
}

/// List evidence for one startup, or the review queue of an incubator.
pub fn cmd_evidence(
    db_path: &Path,
    backend: Backend,
    directory_path: Option<&Path>,
    json_mode: bool,
    startup: Option<u64>,
    incubator: Option<u64>,
    status: Option<&str>,
) -> Result<(), LadderError> {
    let status = status.map(str::parse::<ReviewStatus>).transpose()?;
    let registry = load_registry(db_path, backend)?;

    let items = match (startup, incubator) {
        (Some(startup), _) => {
            let mut items = registry.evidence(Principal::Startup(StartupId(startup)))?;
            if let Some(status) = status {
                items.retain(|item| item.status == status);
            }
            items
        }
        (None, Some(incubator)) => {
            let directory = load_directory(directory_path)?;
            registry.portfolio_evidence(
                Principal::Incubator(IncubatorId(incubator)),
                &directory,
                status,
            )?
        }
        (None, None) => {
            return Err(LadderError::Validation(
                "either --startup or --incubator is required".to_string(),
            ));
        }
    };

    if json_mode {
        let items: Vec<EvidenceJson> = items.into_iter().map(Into::into).collect();
        print_json(&items);
        return Ok(());
    }

    if items.is_empty() {
        println!("No evidence");
        return Ok(());
    }
    for item in items {
        println!(
            "#{:<6} startup {:<6} {} {}  {:<8}  {}",
            item.id.0,
            item.startup.0,
            item.track,
            item.level,
            item.status,
            item.description.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

// =============================================================================
// REVIEW COMMAND
// =============================================================================

/// Approve or reject evidence as `reviewer`.
pub fn cmd_review(
    db_path: &Path,
    backend: Backend,
    directory_path: Option<&Path>,
    json_mode: bool,
    reviewer: u64,
    evidence: u64,
    decision: &str,
    notes: Option<String>,
) -> Result<(), LadderError> {
    let decision: ReviewDecision = decision.parse()?;
    let directory = load_directory(directory_path)?;
    let mut registry = load_registry(db_path, backend)?;

    let outcome = registry.apply(
        Principal::Incubator(IncubatorId(reviewer)),
        &directory,
        Command::ReviewEvidence {
            id: EvidenceId(evidence),
            decision,
            notes,
        },
    )?;
    save_registry(&registry, db_path, backend)?;

    let Outcome::Evidence { item, change } = outcome else {
        return Err(LadderError::Consistency(
            "review produced an unexpected outcome".to_string(),
        ));
    };
    tracing::info!(
        event = "evidence_reviewed",
        evidence = item.id.0,
        status = %item.status,
        "Evidence reviewed"
    );

    if json_mode {
        print_json(&EvidenceResponse::new(item, change));
        return Ok(());
    }

    println!("Evidence #{} is now {}", item.id.0, item.status);
    if let Some(change) = change {
        if change.changed() {
            println!(
                "Startup {} {}: {} -> {}",
                change.startup.0, change.track, change.previous, change.current
            );
        } else {
            println!(
                "Startup {} {} stays at {}",
                change.startup.0, change.track, change.current
            );
        }
    }
    Ok(())
}

// =============================================================================
// PORTFOLIO COMMAND
// =============================================================================

/// Show an incubator's portfolio summary and per-startup rows.
pub fn cmd_summary(
    db_path: &Path,
    backend: Backend,
    directory_path: Option<&Path>,
    json_mode: bool,
    incubator: u64,
) -> Result<(), LadderError> {
    let directory = load_directory(directory_path)?;
    let registry = load_registry(db_path, backend)?;
    let principal = Principal::Incubator(IncubatorId(incubator));

    let summary: SummaryResponse = registry.summarize(principal, &directory, &directory)?.into();
    let rows: Vec<StartupRowJson> = registry
        .portfolio_startups(principal, &directory, &directory)?
        .into_iter()
        .map(Into::into)
        .collect();

    if json_mode {
        print_json(&serde_json::json!({
            "summary": summary,
            "startups": rows,
        }));
        return Ok(());
    }

    println!("Incubator {} Portfolio", incubator);
    println!("========================");
    println!("Startups:          {}", summary.startup_count);
    println!("Total target:      {}", summary.total_portfolio_target);
    println!("Total committed:   {}", summary.total_portfolio_committed);
    println!("Average TRL:       {}", summary.average_trl);
    if !rows.is_empty() {
        println!();
        println!("{:<10} {:>4} {:>4} {:>14} {:>14}", "startup", "TRL", "CRL", "goal", "committed");
        for row in rows {
            println!(
                "{:<10} {:>4} {:>4} {:>14} {:>14}",
                row.startup_id, row.trl_level, row.crl_level, row.funding_goal, row.committed
            );
        }
    }
    Ok(())
}

// =============================================================================
// MAINTENANCE COMMANDS
// =============================================================================

/// Recompute every startup's levels from its evidence.
pub fn cmd_reconcile(db_path: &Path, backend: Backend, json_mode: bool) -> Result<(), LadderError> {
    let mut registry = load_registry(db_path, backend)?;
    let drifted = registry.reconcile()?;
    save_registry(&registry, db_path, backend)?;

    for entry in &drifted {
        tracing::warn!(
            event = "level_drift",
            startup = entry.startup.0,
            derived_trl = entry.derived.trl.value(),
            derived_crl = entry.derived.crl.value(),
            "Cached levels disagreed with evidence"
        );
    }

    if json_mode {
        let rows: Vec<_> = drifted
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "startup_id": entry.startup.0,
                    "cached": entry.cached.map(|c| LevelsResponse::new(entry.startup, c)),
                    "derived": LevelsResponse::new(entry.startup, entry.derived),
                })
            })
            .collect();
        print_json(&rows);
        return Ok(());
    }

    if drifted.is_empty() {
        println!("All cached levels match their evidence");
        return Ok(());
    }
    for entry in drifted {
        let cached = entry
            .cached
            .map(|c| format!("TRL {} / CRL {}", c.trl, c.crl))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "Startup {}: cached {} -> TRL {} / CRL {}",
            entry.startup.0, cached, entry.derived.trl, entry.derived.crl
        );
    }
    Ok(())
}

/// Write the ledger as a JSON snapshot.
pub fn cmd_export(db_path: &Path, backend: Backend, output: &Path) -> Result<(), LadderError> {
    let registry = load_registry(db_path, backend)?;
    let snapshot = registry.snapshot()?;
    snapshot::write(&snapshot, output)?;
    println!(
        "Exported {} claims and {} evidence items to {:?}",
        snapshot.claims.len(),
        snapshot.evidence.len(),
        output
    );
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
