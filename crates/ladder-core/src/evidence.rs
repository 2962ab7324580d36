//! # Evidence Ledger
//!
//! Evidence items attached to a `(track, level)` of a startup and their
//! review workflow.
//!
//! - Submission always starts at `PENDING`, with or without a matching claim.
//! - A startup edit resets the item to `PENDING` and clears reviewer notes.
//! - Only a reviewer sets `APPROVED` or `REJECTED`.
//!
//! Every operation that can change the approved set recomputes the track
//! inside the same transaction.

use crate::capability::{can_review, owned_evidence};
use crate::directory::PortfolioDirectory;
use crate::primitives::{MAX_DESCRIPTION_LENGTH, MAX_FILE_URL_LENGTH, MAX_NOTES_LENGTH};
use crate::progression::{self, LevelChange};
use crate::store::{LedgerTxn, LedgerView};
use crate::{
    EvidenceId, EvidenceItem, IncubatorId, LadderError, Level, Principal, ReviewDecision,
    ReviewStatus, StartupId, Track,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Input of [`submit_evidence`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvidence {
    pub track: Track,
    pub level: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Input of [`update_evidence`]. Empty strings clear a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl EvidencePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.file_url.is_none()
    }
}

fn bounded_text(
    field: &str,
    value: Option<&str>,
    limit: usize,
) -> Result<Option<String>, LadderError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.len() > limit => Err(LadderError::Validation(format!(
            "{} exceeds {} bytes",
            field, limit
        ))),
        Some(v) => Ok(Some(v.to_string())),
    }
}

// =============================================================================
// STARTUP OPERATIONS
// =============================================================================

/// Attach a new evidence item to `(track, level)` of `startup`.
pub fn submit_evidence<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    startup: StartupId,
    new: NewEvidence,
    now: u64,
) -> Result<EvidenceItem, LadderError> {
    let level = Level::from_raw(new.level)?;
    let description = bounded_text(
        "description",
        new.description.as_deref(),
        MAX_DESCRIPTION_LENGTH,
    )?;
    let file_url = bounded_text("file_url", new.file_url.as_deref(), MAX_FILE_URL_LENGTH)?;

    let item = EvidenceItem {
        id: EvidenceId(txn.allocate_id()?),
        startup,
        track: new.track,
        level,
        description,
        file_url,
        status: ReviewStatus::Pending,
        reviewer_notes: String::new(),
        created_at: now,
        updated_at: now,
    };
    txn.put_evidence(&item)?;
    Ok(item)
}

/// Edit an item owned by `requester`. The item goes back to `PENDING`.
///
/// Returns the level change when the item was approved before the edit.
pub fn update_evidence<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    requester: StartupId,
    id: EvidenceId,
    patch: EvidencePatch,
    now: u64,
) -> Result<(EvidenceItem, Option<LevelChange>), LadderError> {
    if patch.is_empty() {
        return Err(LadderError::Validation(
            "evidence update must change description or file_url".to_string(),
        ));
    }
    let mut item = owned_evidence(txn.evidence(id)?, id, requester)?;
    let was_approved = item.is_approved();

    if patch.description.is_some() {
        item.description =
            bounded_text("description", patch.description.as_deref(), MAX_DESCRIPTION_LENGTH)?;
    }
    if patch.file_url.is_some() {
        item.file_url = bounded_text("file_url", patch.file_url.as_deref(), MAX_FILE_URL_LENGTH)?;
    }
    item.status = ReviewStatus::Pending;
    item.reviewer_notes.clear();
    item.updated_at = now;
    txn.put_evidence(&item)?;

    let change = if was_approved {
        Some(progression::recompute(txn, item.startup, item.track)?)
    } else {
        None
    };
    Ok((item, change))
}

/// Remove an item owned by `requester`.
///
/// Returns the level change when the removed item was approved.
pub fn delete_evidence<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    requester: StartupId,
    id: EvidenceId,
) -> Result<(EvidenceItem, Option<LevelChange>), LadderError> {
    let item = owned_evidence(txn.evidence(id)?, id, requester)?;
    txn.remove_evidence(id)?;

    let change = if item.is_approved() {
        Some(progression::recompute(txn, item.startup, item.track)?)
    } else {
        None
    };
    Ok((item, change))
}

// =============================================================================
// REVIEWER OPERATIONS
// =============================================================================

/// Approve or reject an item, then recompute its track.
///
/// A reviewer may revisit an earlier decision; `PENDING` is only reachable
/// through a startup edit.
pub fn review_evidence<T, D>(
    txn: &mut T,
    directory: &D,
    reviewer: IncubatorId,
    id: EvidenceId,
    decision: ReviewDecision,
    notes: Option<String>,
    now: u64,
) -> Result<(EvidenceItem, LevelChange), LadderError>
where
    T: LedgerTxn + ?Sized,
    D: PortfolioDirectory + ?Sized,
{
    let mut item = txn
        .evidence(id)?
        .ok_or(LadderError::evidence_not_found(id))?;

    if !can_review(Principal::Incubator(reviewer), &item, directory) {
        return Err(LadderError::Forbidden(format!(
            "incubator {} is not associated with startup {}",
            reviewer.0, item.startup.0
        )));
    }

    item.status = decision.into();
    item.reviewer_notes =
        bounded_text("reviewer_notes", notes.as_deref(), MAX_NOTES_LENGTH)?.unwrap_or_default();
    item.updated_at = now;
    txn.put_evidence(&item)?;

    let change = progression::recompute(txn, item.startup, item.track)?;
    Ok((item, change))
}

// =============================================================================
// READS
// =============================================================================

/// Evidence of `startup`, newest first.
pub fn list_evidence<V: LedgerView + ?Sized>(
    view: &V,
    startup: StartupId,
) -> Result<Vec<EvidenceItem>, LadderError> {
    let mut items = view.evidence_of(startup)?;
    items.sort_by_key(|e| Reverse((e.created_at, e.id)));
    Ok(items)
}

// =============================================================================
// TESTS
// =============================================================================
