//! # ladder-core
//!
//! The readiness progression engine for Ladder - THE LOGIC.
//!
//! Startups declare TRL / CRL claims and attach evidence; incubator
//! reviewers approve or reject it; the progression engine derives each
//! startup's current level from the approved evidence; the portfolio
//! aggregator rolls levels and financial figures up per incubator.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Runs every state change as one [`Command`] inside one transaction
//! - Lets only the [`progression`] module write cached levels
//! - Uses integer arithmetic only (money in cents, averages in hundredths)

// =============================================================================
// MODULES
// =============================================================================

pub mod capability;
pub mod catalog;
pub mod command;
pub mod directory;
pub mod evidence;
pub mod memory;
pub mod portfolio;
pub mod primitives;
pub mod progression;
pub mod registry;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ClaimId, EvidenceId, EvidenceItem, IncubatorId, LadderError, Level, Principal,
    ProgressionState, ReadinessClaim, ReviewDecision, ReviewStatus, StartupId, Track,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use catalog::{CascadeReport, ClaimPatch, NewClaim};
pub use command::{Command, CommandContext, Outcome};
pub use evidence::{EvidencePatch, NewEvidence};
pub use memory::{LedgerSnapshot, MemoryLedger};
pub use progression::{LevelChange, continuous_prefix};
pub use registry::{ReconcileEntry, Registry, StorageBackend};
pub use storage::RedbLedger;
pub use store::{LedgerTxn, LedgerView};

// =============================================================================
// RE-EXPORTS: Portfolio
// =============================================================================

pub use directory::{
    FinancialSource, InvestmentRound, InvestorEntry, InvestorStatus, Money, PortfolioDirectory,
    StaticDirectory,
};
pub use portfolio::{ClaimWithEvidence, PortfolioSummary, StartupRow};
