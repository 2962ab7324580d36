//! # In-Memory Ledger
//!
//! The volatile ledger backend. All data structures use `BTreeMap` for
//! deterministic ordering.
//!
//! Transactions are copy-on-write: the registry clones the ledger, runs the
//! command against the draft and swaps it in only when the command succeeds.

use crate::progression;
use crate::progression::LevelSeal;
use crate::store::{LedgerTxn, LedgerView};
use crate::{
    ClaimId, EvidenceId, EvidenceItem, LadderError, ProgressionState, ReadinessClaim, StartupId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory ledger of claims, evidence and cached levels.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    claims: BTreeMap<ClaimId, ReadinessClaim>,
    evidence: BTreeMap<EvidenceId, EvidenceItem>,
    levels: BTreeMap<StartupId, ProgressionState>,
    next_id: u64,
}

/// Serializable form of a [`MemoryLedger`].
///
/// Cached levels are not part of a snapshot; loading one rebuilds them
/// through the progression engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub next_id: u64,
    pub claims: Vec<ReadinessClaim>,
    pub evidence: Vec<EvidenceItem>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored claims.
    #[must_use]
    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    /// Number of stored evidence items.
    #[must_use]
    pub fn evidence_count(&self) -> usize {
        self.evidence.len()
    }

    /// Export the ledger contents.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            next_id: self.next_id,
            claims: self.claims.values().cloned().collect(),
            evidence: self.evidence.values().cloned().collect(),
        }
    }

    /// Rebuild a ledger from a snapshot and recompute every cached level.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LadderError> {
        let mut ledger = Self::new();

        let highest = snapshot
            .claims
            .iter()
            .map(|c| c.id.0)
            .chain(snapshot.evidence.iter().map(|e| e.id.0))
            .max()
            .unwrap_or(0);
        if highest > snapshot.next_id {
            return Err(LadderError::Consistency(format!(
                "snapshot id counter {} is below highest stored id {}",
                snapshot.next_id, highest
            )));
        }
        ledger.next_id = snapshot.next_id;

        for claim in snapshot.claims {
            ledger.claims.insert(claim.id, claim);
        }
        for item in snapshot.evidence {
            ledger.evidence.insert(item.id, item);
        }

        for startup in ledger.known_startups()? {
            progression::recompute_all(&mut ledger, startup)?;
        }

        Ok(ledger)
    }
}

// =============================================================================
// LEDGER TRAIT IMPLEMENTATIONS
// =============================================================================

impl LedgerView for MemoryLedger {
    fn claim(&self, id: ClaimId) -> Result<Option<ReadinessClaim>, LadderError> {
        Ok(self.claims.get(&id).cloned())
    }

    fn claims_of(&self, startup: StartupId) -> Result<Vec<ReadinessClaim>, LadderError> {
        Ok(self
            .claims
            .values()
            .filter(|c| c.startup == startup)
            .cloned()
            .collect())
    }

    fn evidence(&self, id: EvidenceId) -> Result<Option<EvidenceItem>, LadderError> {
        Ok(self.evidence.get(&id).cloned())
    }

    fn evidence_of(&self, startup: StartupId) -> Result<Vec<EvidenceItem>, LadderError> {
        Ok(self
            .evidence
            .values()
            .filter(|e| e.startup == startup)
            .cloned()
            .collect())
    }

    fn cached_levels(
        &self,
        startup: StartupId,
    ) -> Result<Option<ProgressionState>, LadderError> {
        Ok(self.levels.get(&startup).copied())
    }

    fn known_startups(&self) -> Result<Vec<StartupId>, LadderError> {
        let startups: BTreeSet<StartupId> = self
            .claims
            .values()
            .map(|c| c.startup)
            .chain(self.evidence.values().map(|e| e.startup))
            .chain(self.levels.keys().copied())
            .collect();
        Ok(startups.into_iter().collect())
    }
}

impl LedgerTxn for MemoryLedger {
    fn allocate_id(&mut self) -> Result<u64, LadderError> {
        self.next_id = self.next_id.saturating_add(1);
        Ok(self.next_id)
    }

    fn put_claim(&mut self, claim: &ReadinessClaim) -> Result<(), LadderError> {
        self.claims.insert(claim.id, claim.clone());
        Ok(())
    }

    fn remove_claim(&mut self, id: ClaimId) -> Result<Option<ReadinessClaim>, LadderError> {
        Ok(self.claims.remove(&id))
    }

    fn put_evidence(&mut self, item: &EvidenceItem) -> Result<(), LadderError> {
        self.evidence.insert(item.id, item.clone());
        Ok(())
    }

    fn remove_evidence(&mut self, id: EvidenceId) -> Result<Option<EvidenceItem>, LadderError> {
        Ok(self.evidence.remove(&id))
    }

    fn store_levels(
        &mut self,
        startup: StartupId,
        state: ProgressionState,
        _seal: &LevelSeal,
    ) -> Result<(), LadderError> {
        self.levels.insert(startup, state);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
