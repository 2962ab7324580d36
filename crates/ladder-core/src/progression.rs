//! # Progression Engine
//!
//! The single source of truth for a startup's current TRL / CRL level.
//!
//! ## Continuous-prefix rule
//!
//! `current_level(track)` is the largest level `L` such that every level
//! `1..=L` has at least one `APPROVED` evidence item on that track. A gap
//! blocks advancement past the gap. With no approved level 1 the result is
//! the baseline level 1, never 0.
//!
//! Evidence is matched by `(track, level)` only, so approved evidence counts
//! whether or not a claim for that level exists.
//!
//! ## Single writer
//!
//! Cached levels can only be written through [`LedgerTxn::store_levels`],
//! which requires a [`LevelSeal`]. Only this module can build one.

use crate::store::{LedgerTxn, LedgerView};
use crate::{LadderError, Level, ProgressionState, StartupId, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// WRITE CAPABILITY
// =============================================================================

/// Proof that a cached-level write originates from the progression engine.
#[derive(Debug)]
pub struct LevelSeal {
    _private: (),
}

impl LevelSeal {
    const fn new() -> Self {
        Self { _private: () }
    }
}

// =============================================================================
// LEVEL CHANGE
// =============================================================================

/// Result of one recompute: the cached level before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub startup: StartupId,
    pub track: Track,
    pub previous: Level,
    pub current: Level,
}

impl LevelChange {
    /// Check if the cached level moved.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }

    /// Check if the cached level dropped.
    #[must_use]
    pub fn dropped(&self) -> bool {
        self.current < self.previous
    }
}

// =============================================================================
// PURE RULE
// =============================================================================

/// Longest run of consecutive levels starting at 1, floored at the baseline.
#[must_use]
pub fn continuous_prefix(approved: &BTreeSet<Level>) -> Level {
    let mut current = Level::BASELINE;
    for level in Level::all() {
        if !approved.contains(&level) {
            break;
        }
        current = level;
    }
    current
}

// =============================================================================
// READ PATH
// =============================================================================

/// Levels on `track` with at least one approved evidence item.
pub fn approved_levels<V: LedgerView + ?Sized>(
    view: &V,
    startup: StartupId,
    track: Track,
) -> Result<BTreeSet<Level>, LadderError> {
    let mut levels = BTreeSet::new();
    for item in view.evidence_of(startup)? {
        if item.startup != startup {
            return Err(LadderError::Consistency(format!(
                "evidence {} listed under startup {} belongs to startup {}",
                item.id.0, startup.0, item.startup.0
            )));
        }
        if item.track == track && item.is_approved() {
            levels.insert(item.level);
        }
    }
    Ok(levels)
}

/// Level implied by the current evidence set, ignoring the cache.
pub fn derive_level<V: LedgerView + ?Sized>(
    view: &V,
    startup: StartupId,
    track: Track,
) -> Result<Level, LadderError> {
    approved_levels(view, startup, track).map(|levels| continuous_prefix(&levels))
}

/// Both levels implied by the current evidence set, ignoring the cache.
pub fn derive_levels<V: LedgerView + ?Sized>(
    view: &V,
    startup: StartupId,
) -> Result<ProgressionState, LadderError> {
    Ok(ProgressionState {
        trl: derive_level(view, startup, Track::Trl)?,
        crl: derive_level(view, startup, Track::Crl)?,
    })
}

/// Cached levels of `startup`; baseline when nothing was ever computed.
///
/// This is the read path every other component uses.
pub fn current_levels<V: LedgerView + ?Sized>(
    view: &V,
    startup: StartupId,
) -> Result<ProgressionState, LadderError> {
    Ok(view.cached_levels(startup)?.unwrap_or_default())
}

// =============================================================================
// WRITE PATH
// =============================================================================

/// Recompute and persist the cached level of `startup` on `track`.
///
/// Must run inside the transaction of the mutation that triggered it, after
/// the mutation has been applied.
pub fn recompute<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    startup: StartupId,
    track: Track,
) -> Result<LevelChange, LadderError> {
    let cached = txn.cached_levels(startup)?;
    let state = cached.unwrap_or_default();
    let current = derive_level(&*txn, startup, track)?;

    if cached.is_none() || state.level(track) != current {
        txn.store_levels(startup, state.with_level(track, current), &LevelSeal::new())?;
    }

    Ok(LevelChange {
        startup,
        track,
        previous: state.level(track),
        current,
    })
}

/// Recompute both tracks of `startup`.
pub fn recompute_all<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    startup: StartupId,
) -> Result<[LevelChange; 2], LadderError> {
    Ok([
        recompute(txn, startup, Track::Trl)?,
        recompute(txn, startup, Track::Crl)?,
    ])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use crate::{EvidenceId, EvidenceItem, ReviewStatus};

    fn level(n: u8) -> Level {
        Level::new(n).expect("level")
    }

    fn levels(ns: &[u8]) -> BTreeSet<Level> {
        ns.iter().map(|&n| level(n)).collect()
    }

    fn approve(ledger: &mut MemoryLedger, startup: u64, track: Track, n: u8) {
        let id = ledger.allocate_id().expect("id");
        ledger
            .put_evidence(&EvidenceItem {
                id: EvidenceId(id),
                startup: StartupId(startup),
                track,
                level: level(n),
                description: None,
                file_url: None,
                status: ReviewStatus::Approved,
                reviewer_notes: String::new(),
                created_at: 0,
                updated_at: 0,
            })
            .expect("put");
    }

    #[test]
    fn empty_set_is_baseline() {
        assert_eq!(continuous_prefix(&BTreeSet::new()), Level::BASELINE);
    }

    #[test]
    fn gap_blocks_advancement() {
        assert_eq!(continuous_prefix(&levels(&[1, 2, 4, 5])), level(2));
        assert_eq!(continuous_prefix(&levels(&[2, 3, 4])), Level::BASELINE);
        assert_eq!(continuous_prefix(&levels(&[5])), Level::BASELINE);
    }

    #[test]
    fn full_scale_reaches_top() {
        let all: BTreeSet<Level> = Level::all().collect();
        assert_eq!(continuous_prefix(&all), Level::TOP);
    }

    #[test]
    fn recompute_persists_and_reports_change() {
        let mut ledger = MemoryLedger::new();
        approve(&mut ledger, 1, Track::Trl, 1);
        approve(&mut ledger, 1, Track::Trl, 2);

        let change = recompute(&mut ledger, StartupId(1), Track::Trl).expect("recompute");
        assert_eq!(change.previous, Level::BASELINE);
        assert_eq!(change.current, level(2));
        assert!(change.changed());

        let cached = current_levels(&ledger, StartupId(1)).expect("levels");
        assert_eq!(cached.trl, level(2));
        assert_eq!(cached.crl, Level::BASELINE);
    }

    #[test]
    fn tracks_are_independent() {
        let mut ledger = MemoryLedger::new();
        approve(&mut ledger, 1, Track::Crl, 1);

        let [trl, crl] = recompute_all(&mut ledger, StartupId(1)).expect("recompute");
        assert!(!trl.changed());
        assert!(!crl.changed());
        assert_eq!(crl.current, Level::BASELINE);

        approve(&mut ledger, 1, Track::Crl, 2);
        let change = recompute(&mut ledger, StartupId(1), Track::Crl).expect("recompute");
        assert_eq!(change.current, level(2));
        assert_eq!(
            current_levels(&ledger, StartupId(1)).expect("levels").trl,
            Level::BASELINE
        );
    }

    #[test]
    fn unknown_startup_reads_baseline() {
        let ledger = MemoryLedger::new();
        assert_eq!(
            current_levels(&ledger, StartupId(99)).expect("levels"),
            ProgressionState::default()
        );
    }
}
