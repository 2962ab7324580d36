//! # Ledger Store
//!
//! Storage contract shared by the in-memory and the redb backends.
//!
//! Reads go through [`LedgerView`]; mutations go through [`LedgerTxn`], which
//! is only ever handed out inside a write transaction. Every command runs
//! against exactly one `LedgerTxn`, so a mutation and the recompute that
//! follows it commit together or not at all.

use crate::progression::LevelSeal;
use crate::{
    ClaimId, EvidenceId, EvidenceItem, LadderError, ProgressionState, ReadinessClaim, StartupId,
};

// =============================================================================
// READ SIDE
// =============================================================================

/// Read access to claims, evidence and cached levels.
///
/// All listings are returned in ascending id order.
pub trait LedgerView {
    /// Lookup a claim by id.
    fn claim(&self, id: ClaimId) -> Result<Option<ReadinessClaim>, LadderError>;

    /// All claims owned by `startup`.
    fn claims_of(&self, startup: StartupId) -> Result<Vec<ReadinessClaim>, LadderError>;

    /// Lookup an evidence item by id.
    fn evidence(&self, id: EvidenceId) -> Result<Option<EvidenceItem>, LadderError>;

    /// All evidence owned by `startup`.
    fn evidence_of(&self, startup: StartupId) -> Result<Vec<EvidenceItem>, LadderError>;

    /// Cached levels of `startup`, if the engine ever stored any.
    fn cached_levels(&self, startup: StartupId)
    -> Result<Option<ProgressionState>, LadderError>;

    /// Every startup with at least one claim, evidence item or cached level.
    fn known_startups(&self) -> Result<Vec<StartupId>, LadderError>;
}

// =============================================================================
// WRITE SIDE
// =============================================================================

/// Mutating access, valid for the lifetime of one write transaction.
pub trait LedgerTxn: LedgerView {
    /// Allocate a fresh id for a claim or evidence item.
    fn allocate_id(&mut self) -> Result<u64, LadderError>;

    /// Insert or replace a claim.
    fn put_claim(&mut self, claim: &ReadinessClaim) -> Result<(), LadderError>;

    /// Remove a claim. Returns the removed claim, if it existed.
    fn remove_claim(&mut self, id: ClaimId) -> Result<Option<ReadinessClaim>, LadderError>;

    /// Insert or replace an evidence item.
    fn put_evidence(&mut self, item: &EvidenceItem) -> Result<(), LadderError>;

    /// Remove an evidence item. Returns the removed item, if it existed.
    fn remove_evidence(&mut self, id: EvidenceId) -> Result<Option<EvidenceItem>, LadderError>;

    /// Overwrite the cached levels of `startup`.
    ///
    /// The seal can only be produced by the progression engine, which makes
    /// it the single writer of cached levels.
    fn store_levels(
        &mut self,
        startup: StartupId,
        state: ProgressionState,
        seal: &LevelSeal,
    ) -> Result<(), LadderError>;
}
