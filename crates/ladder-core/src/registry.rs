//! # Registry
//!
//! Entry point combining a storage backend with the command pipeline.
//!
//! ## Storage Backends
//!
//! - `InMemory`: a `MemoryLedger`; each command runs on a clone that is
//!   swapped in only on success
//! - `Persistent`: a `RedbLedger`; each command runs in one redb write
//!   transaction
//!
//! Either way a failed command leaves prior state intact.

use crate::capability::{can_view_startup, require_incubator, require_startup};
use crate::catalog;
use crate::command::{Command, CommandContext, Outcome};
use crate::directory::{FinancialSource, PortfolioDirectory};
use crate::evidence;
use crate::memory::{LedgerSnapshot, MemoryLedger};
use crate::portfolio::{self, ClaimWithEvidence, PortfolioSummary, StartupRow};
use crate::progression;
use crate::storage::RedbLedger;
use crate::store::{LedgerTxn, LedgerView};
use crate::{
    ClaimId, EvidenceItem, LadderError, Principal, ProgressionState, ReadinessClaim,
    ReviewStatus, StartupId,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage backend for a Registry.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory ledger (fast, volatile).
    InMemory(MemoryLedger),
    /// Disk-backed ledger using redb (ACID, persistent).
    Persistent(RedbLedger),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryLedger::new())
    }
}

/// A startup whose cached levels disagreed with its evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileEntry {
    pub startup: StartupId,
    pub cached: Option<ProgressionState>,
    pub derived: ProgressionState,
}

/// Current unix time in seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The ledger plus the operations the outer layers call.
#[derive(Debug, Default)]
pub struct Registry {
    backend: StorageBackend,
}

impl Registry {
    /// Create an empty registry with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry around an existing in-memory ledger.
    #[must_use]
    pub fn with_memory(ledger: MemoryLedger) -> Self {
        Self {
            backend: StorageBackend::InMemory(ledger),
        }
    }

    /// Create a registry with persistent redb storage at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, LadderError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbLedger::open(path)?),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    fn transact<R>(
        &mut self,
        f: impl FnOnce(&mut dyn LedgerTxn) -> Result<R, LadderError>,
    ) -> Result<R, LadderError> {
        match &mut self.backend {
            StorageBackend::InMemory(ledger) => {
                let mut draft = ledger.clone();
                let out = f(&mut draft)?;
                *ledger = draft;
                Ok(out)
            }
            StorageBackend::Persistent(redb) => redb.write(|txn| f(txn)),
        }
    }

    /// Run `f` against a consistent view of the ledger.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&dyn LedgerView) -> Result<R, LadderError>,
    ) -> Result<R, LadderError> {
        match &self.backend {
            StorageBackend::InMemory(ledger) => f(ledger),
            StorageBackend::Persistent(redb) => redb.read(|reader| f(reader)),
        }
    }

    /// Execute a command as `principal` at the current time.
    pub fn apply(
        &mut self,
        principal: Principal,
        directory: &dyn PortfolioDirectory,
        command: Command,
    ) -> Result<Outcome, LadderError> {
        self.apply_at(principal, directory, command, unix_now())
    }

    /// Execute a command as `principal` at `now` (unix seconds).
    pub fn apply_at(
        &mut self,
        principal: Principal,
        directory: &dyn PortfolioDirectory,
        command: Command,
        now: u64,
    ) -> Result<Outcome, LadderError> {
        let ctx = CommandContext {
            principal,
            directory,
            now,
        };
        self.transact(|txn| command.execute(&ctx, txn))
    }

    /// Recompute every known startup and report the ones that drifted.
    pub fn reconcile(&mut self) -> Result<Vec<ReconcileEntry>, LadderError> {
        self.transact(|txn| {
            let mut drifted = Vec::new();
            for startup in txn.known_startups()? {
                let cached = txn.cached_levels(startup)?;
                let [trl, crl] = progression::recompute_all(&mut *txn, startup)?;
                let derived = ProgressionState {
                    trl: trl.current,
                    crl: crl.current,
                };
                if cached != Some(derived) {
                    drifted.push(ReconcileEntry {
                        startup,
                        cached,
                        derived,
                    });
                }
            }
            Ok(drifted)
        })
    }

    // =========================================================================
    // STARTUP READS
    // =========================================================================

    /// Cached levels of `startup`, visible to the startup itself and to
    /// incubators it is associated with.
    pub fn levels(
        &self,
        principal: Principal,
        directory: &dyn PortfolioDirectory,
        startup: StartupId,
    ) -> Result<ProgressionState, LadderError> {
        if !can_view_startup(principal, startup, directory) {
            return Err(LadderError::Forbidden(format!(
                "{} may not view startup {}",
                principal, startup.0
            )));
        }
        self.read(|view| progression::current_levels(view, startup))
    }

    /// Claims of the calling startup.
    pub fn claims(&self, principal: Principal) -> Result<Vec<ReadinessClaim>, LadderError> {
        let startup = require_startup(principal)?;
        self.read(|view| catalog::list_claims(view, startup))
    }

    /// One claim of the calling startup.
    pub fn claim(&self, principal: Principal, id: ClaimId) -> Result<ReadinessClaim, LadderError> {
        let startup = require_startup(principal)?;
        self.read(|view| catalog::get_claim(view, startup, id))
    }

    /// Evidence of the calling startup, newest first.
    pub fn evidence(&self, principal: Principal) -> Result<Vec<EvidenceItem>, LadderError> {
        let startup = require_startup(principal)?;
        self.read(|view| evidence::list_evidence(view, startup))
    }

    // =========================================================================
    // PORTFOLIO READS
    // =========================================================================

    pub fn summarize(
        &self,
        principal: Principal,
        directory: &dyn PortfolioDirectory,
        finance: &dyn FinancialSource,
    ) -> Result<PortfolioSummary, LadderError> {
        let incubator = require_incubator(principal)?;
        self.read(|view| portfolio::summarize(view, directory, finance, incubator))
    }

    pub fn portfolio_startups(
        &self,
        principal: Principal,
        directory: &dyn PortfolioDirectory,
        finance: &dyn FinancialSource,
    ) -> Result<Vec<StartupRow>, LadderError> {
        let incubator = require_incubator(principal)?;
        self.read(|view| portfolio::portfolio_startups(view, directory, finance, incubator))
    }

    pub fn portfolio_claims(
        &self,
        principal: Principal,
        directory: &dyn PortfolioDirectory,
    ) -> Result<Vec<ClaimWithEvidence>, LadderError> {
        let incubator = require_incubator(principal)?;
        self.read(|view| portfolio::portfolio_claims(view, directory, incubator))
    }

    pub fn portfolio_evidence(
        &self,
        principal: Principal,
        directory: &dyn PortfolioDirectory,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<EvidenceItem>, LadderError> {
        let incubator = require_incubator(principal)?;
        self.read(|view| portfolio::portfolio_evidence(view, directory, incubator, status))
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Export claims, evidence and the id counter.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LadderError> {
        match &self.backend {
            StorageBackend::InMemory(ledger) => Ok(ledger.snapshot()),
            StorageBackend::Persistent(redb) => redb.snapshot(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
