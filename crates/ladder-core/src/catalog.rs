//! # Readiness Catalog
//!
//! Readiness-level claims declared by startups.
//!
//! Track and level are fixed at creation; only title and subtitle can be
//! edited. Deleting a claim cascades to every evidence item of the same
//! startup on the claim's `(track, level)` and recomputes that track.

use crate::capability::owned_claim;
use crate::primitives::{MAX_SUBTITLE_LENGTH, MAX_TITLE_LENGTH};
use crate::progression::{self, LevelChange};
use crate::store::{LedgerTxn, LedgerView};
use crate::{ClaimId, EvidenceId, LadderError, Level, ReadinessClaim, StartupId, Track};
use serde::{Deserialize, Serialize};

/// Input of [`create_claim`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    pub track: Track,
    /// Unchecked; validated against the 1-9 scale on creation.
    pub level: i64,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
}

/// Input of [`update_claim`]. Absent fields are left untouched; an empty
/// subtitle clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
}

impl ClaimPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.subtitle.is_none()
    }
}

/// What a claim deletion removed, and the resulting level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub claim: ReadinessClaim,
    pub removed_evidence: Vec<EvidenceId>,
    pub change: LevelChange,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_title(title: &str) -> Result<String, LadderError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LadderError::Validation("title must not be empty".to_string()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(LadderError::Validation(format!(
            "title exceeds {} bytes",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

fn validate_subtitle(subtitle: Option<&str>) -> Result<Option<String>, LadderError> {
    match subtitle.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.len() > MAX_SUBTITLE_LENGTH => Err(LadderError::Validation(format!(
            "subtitle exceeds {} bytes",
            MAX_SUBTITLE_LENGTH
        ))),
        Some(s) => Ok(Some(s.to_string())),
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Declare a new claim for `startup`.
pub fn create_claim<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    startup: StartupId,
    new: NewClaim,
    now: u64,
) -> Result<ReadinessClaim, LadderError> {
    let level = Level::from_raw(new.level)?;
    let title = validate_title(&new.title)?;
    let subtitle = validate_subtitle(new.subtitle.as_deref())?;

    let claim = ReadinessClaim {
        id: ClaimId(txn.allocate_id()?),
        startup,
        track: new.track,
        level,
        title,
        subtitle,
        created_at: now,
        updated_at: now,
    };
    txn.put_claim(&claim)?;
    Ok(claim)
}

/// Edit the title and/or subtitle of a claim owned by `requester`.
pub fn update_claim<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    requester: StartupId,
    id: ClaimId,
    patch: ClaimPatch,
    now: u64,
) -> Result<ReadinessClaim, LadderError> {
    if patch.is_empty() {
        return Err(LadderError::Validation(
            "claim update must change title or subtitle".to_string(),
        ));
    }
    let mut claim = owned_claim(txn.claim(id)?, id, requester)?;

    if let Some(title) = &patch.title {
        claim.title = validate_title(title)?;
    }
    if patch.subtitle.is_some() {
        claim.subtitle = validate_subtitle(patch.subtitle.as_deref())?;
    }
    claim.updated_at = now;

    txn.put_claim(&claim)?;
    Ok(claim)
}

/// Delete a claim, its matching evidence, and recompute the track.
pub fn delete_claim<T: LedgerTxn + ?Sized>(
    txn: &mut T,
    requester: StartupId,
    id: ClaimId,
) -> Result<CascadeReport, LadderError> {
    let claim = owned_claim(txn.claim(id)?, id, requester)?;

    let doomed: Vec<EvidenceId> = txn
        .evidence_of(claim.startup)?
        .into_iter()
        .filter(|item| item.matches(claim.track, claim.level))
        .map(|item| item.id)
        .collect();

    for evidence_id in &doomed {
        txn.remove_evidence(*evidence_id)?;
    }
    txn.remove_claim(id)?;

    let change = progression::recompute(txn, claim.startup, claim.track)?;
    Ok(CascadeReport {
        claim,
        removed_evidence: doomed,
        change,
    })
}

/// Claims of `startup`, ordered by `(track, level, id)`.
pub fn list_claims<V: LedgerView + ?Sized>(
    view: &V,
    startup: StartupId,
) -> Result<Vec<ReadinessClaim>, LadderError> {
    let mut claims = view.claims_of(startup)?;
    claims.sort_by_key(|c| (c.track, c.level, c.id));
    Ok(claims)
}

/// A single claim owned by `requester`.
pub fn get_claim<V: LedgerView + ?Sized>(
    view: &V,
    requester: StartupId,
    id: ClaimId,
) -> Result<ReadinessClaim, LadderError> {
    owned_claim(view.claim(id)?, id, requester)
}

// =============================================================================
// TESTS
// =============================================================================
