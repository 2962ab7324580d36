//! # Core Type Definitions
//!
//! This module contains all core types for the Ladder readiness engine:
//! - Identifiers (`StartupId`, `IncubatorId`, `ClaimId`, `EvidenceId`)
//! - The readiness scale (`Track`, `Level`)
//! - Review workflow (`ReviewStatus`, `ReviewDecision`)
//! - Stored entities (`ReadinessClaim`, `EvidenceItem`, `ProgressionState`)
//! - The calling identity (`Principal`)
//! - Error types (`LadderError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`/`BTreeSet`

use crate::primitives::{MAX_LEVEL, MIN_LEVEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a startup. Issued by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StartupId(pub u64);

/// Identifier of an incubator. Issued by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncubatorId(pub u64);

/// Identifier of a readiness claim. Allocated by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub u64);

/// Identifier of an evidence item. Allocated by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvidenceId(pub u64);

// =============================================================================
// READINESS SCALE
// =============================================================================

/// The two readiness tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Track {
    /// Technology Readiness Level.
    #[serde(rename = "TRL")]
    Trl,
    /// Commercial Readiness Level.
    #[serde(rename = "CRL")]
    Crl,
}

impl Track {
    /// Wire name of the track.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Track::Trl => "TRL",
            Track::Crl => "CRL",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Track {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRL" => Ok(Track::Trl),
            "CRL" => Ok(Track::Crl),
            other => Err(LadderError::Validation(format!(
                "unknown track '{}': expected TRL or CRL",
                other
            ))),
        }
    }
}

/// A level on the 1-9 readiness scale.
///
/// The only way to build a `Level` is through [`Level::new`], so a `Level`
/// value is always in range. Deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Level 1: the floor of the scale ("unstarted / minimum").
    pub const BASELINE: Level = Level(MIN_LEVEL);

    /// Level 9: the top of the scale.
    pub const TOP: Level = Level(MAX_LEVEL);

    /// Build a level, rejecting values outside 1-9.
    pub fn new(value: u8) -> Result<Self, LadderError> {
        if (MIN_LEVEL..=MAX_LEVEL).contains(&value) {
            Ok(Self(value))
        } else {
            Err(LadderError::Validation(format!(
                "level {} is outside {}..={}",
                value, MIN_LEVEL, MAX_LEVEL
            )))
        }
    }

    /// Build a level from an untrusted wide integer (request payloads).
    pub fn from_raw(value: i64) -> Result<Self, LadderError> {
        u8::try_from(value)
            .map_err(|_| {
                LadderError::Validation(format!(
                    "level {} is outside {}..={}",
                    value, MIN_LEVEL, MAX_LEVEL
                ))
            })
            .and_then(Self::new)
    }

    /// Get the raw level value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Every level of the scale in ascending order.
    pub fn all() -> impl Iterator<Item = Level> {
        (MIN_LEVEL..=MAX_LEVEL).map(Level)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::BASELINE
    }
}

impl TryFrom<u8> for Level {
    type Error = LadderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// REVIEW WORKFLOW
// =============================================================================

/// Review status of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "PENDING",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReviewStatus::Pending),
            "APPROVED" => Ok(ReviewStatus::Approved),
            "REJECTED" => Ok(ReviewStatus::Rejected),
            other => Err(LadderError::Validation(format!(
                "unknown review status '{}'",
                other
            ))),
        }
    }
}

/// Outcome a reviewer may assign. `PENDING` is not a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ReviewStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<ReviewStatus>()? {
            ReviewStatus::Approved => Ok(ReviewDecision::Approved),
            ReviewStatus::Rejected => Ok(ReviewDecision::Rejected),
            ReviewStatus::Pending => Err(LadderError::Validation(
                "review decision must be APPROVED or REJECTED".to_string(),
            )),
        }
    }
}

// =============================================================================
// STORED ENTITIES
// =============================================================================

/// A startup's declared assertion of having reached `level` on `track`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessClaim {
    pub id: ClaimId,
    pub startup: StartupId,
    pub track: Track,
    pub level: Level,
    pub title: String,
    pub subtitle: Option<String>,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds.
    pub updated_at: u64,
}

/// A reviewable artifact submitted against a `(track, level)` of a startup.
///
/// Evidence is matched to claims by `(startup, track, level)` only; it may
/// exist without any matching claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub startup: StartupId,
    pub track: Track,
    pub level: Level,
    pub description: Option<String>,
    /// Opaque reference owned by the file-storage collaborator.
    pub file_url: Option<String>,
    pub status: ReviewStatus,
    pub reviewer_notes: String,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds.
    pub updated_at: u64,
}

impl EvidenceItem {
    /// Check if this item counts towards progression.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }

    /// Check if this item substantiates `(track, level)`.
    #[must_use]
    pub fn matches(&self, track: Track, level: Level) -> bool {
        self.track == track && self.level == level
    }
}

/// Cached current level per track of one startup.
///
/// Derived state: written only by the progression engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressionState {
    pub trl: Level,
    pub crl: Level,
}

impl ProgressionState {
    /// Current level on `track`.
    #[must_use]
    pub const fn level(&self, track: Track) -> Level {
        match track {
            Track::Trl => self.trl,
            Track::Crl => self.crl,
        }
    }

    /// Copy of this state with `track` set to `level`.
    #[must_use]
    pub const fn with_level(mut self, track: Track, level: Level) -> Self {
        match track {
            Track::Trl => self.trl = level,
            Track::Crl => self.crl = level,
        }
        self
    }
}

// =============================================================================
// PRINCIPAL
// =============================================================================

/// The authenticated caller, as supplied by the identity collaborator.
///
/// The core trusts the principal as given and never re-verifies credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Principal {
    Startup(StartupId),
    Incubator(IncubatorId),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Startup(id) => write!(f, "startup:{}", id.0),
            Principal::Incubator(id) => write!(f, "incubator:{}", id.0),
        }
    }
}

impl FromStr for Principal {
    type Err = LadderError;

    /// Parse `startup:<id>` or `incubator:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            LadderError::Validation(format!(
                "invalid principal '{}': expected startup:<id> or incubator:<id>",
                s
            ))
        };
        let (role, id) = s.trim().split_once(':').ok_or_else(invalid)?;
        let id: u64 = id.trim().parse().map_err(|_| invalid())?;
        match role.trim() {
            "startup" => Ok(Principal::Startup(StartupId(id))),
            "incubator" => Ok(Principal::Incubator(IncubatorId(id))),
            _ => Err(invalid()),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Ladder system.
///
/// - No silent failures
/// - Use `Result<T, LadderError>` for fallible operations
/// - None of these are transient; callers never retry automatically
#[derive(Debug, Error)]
pub enum LadderError {
    /// Malformed level, track, status or field value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity does not exist or does not belong to the caller.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Role or association mismatch.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal invariant violation. Indicates a bug; must be logged.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// The persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored row could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A file or socket outside the ledger failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl LadderError {
    /// Short machine-readable kind, used in error payloads.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            LadderError::Validation(_) => "validation",
            LadderError::NotFound { .. } => "not_found",
            LadderError::Forbidden(_) => "forbidden",
            LadderError::Consistency(_) => "consistency",
            LadderError::Storage(_) => "storage",
            LadderError::Serialization(_) => "serialization",
            LadderError::Io(_) => "io",
        }
    }

    pub(crate) const fn claim_not_found(id: ClaimId) -> Self {
        LadderError::NotFound {
            kind: "claim",
            id: id.0,
        }
    }

    pub(crate) const fn evidence_not_found(id: EvidenceId) -> Self {
        LadderError::NotFound {
            kind: "evidence",
            id: id.0,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_rejects_out_of_range() {
        assert!(Level::new(0).is_err());
        assert!(Level::new(10).is_err());
        assert!(Level::from_raw(-1).is_err());
        assert!(Level::from_raw(300).is_err());
        assert_eq!(Level::from_raw(9).expect("level").value(), 9);
    }

    #[test]
    fn scale_spans_baseline_to_top() {
        let all: Vec<Level> = Level::all().collect();
        assert_eq!(all.len(), 9);
        assert_eq!(all.first(), Some(&Level::BASELINE));
        assert_eq!(all.last(), Some(&Level::TOP));
    }

    #[test]
    fn level_deserialization_is_checked() {
        let bytes = postcard::to_allocvec(&12u8).expect("encode");
        assert!(postcard::from_bytes::<Level>(&bytes).is_err());

        let bytes = postcard::to_allocvec(&3u8).expect("encode");
        let level: Level = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(level.value(), 3);
    }

    #[test]
    fn track_parses_case_insensitively() {
        assert_eq!("trl".parse::<Track>().expect("track"), Track::Trl);
        assert_eq!(" CRL ".parse::<Track>().expect("track"), Track::Crl);
        assert!(matches!(
            "MRL".parse::<Track>(),
            Err(LadderError::Validation(_))
        ));
    }

    #[test]
    fn pending_is_not_a_decision() {
        assert!("PENDING".parse::<ReviewDecision>().is_err());
        assert_eq!(
            "approved".parse::<ReviewDecision>().expect("decision"),
            ReviewDecision::Approved
        );
        assert!("MAYBE".parse::<ReviewDecision>().is_err());
    }

    #[test]
    fn principal_round_trips_through_display() {
        for principal in [
            Principal::Startup(StartupId(7)),
            Principal::Incubator(IncubatorId(3)),
        ] {
            let parsed: Principal = principal.to_string().parse().expect("parse");
            assert_eq!(parsed, principal);
        }
        assert!("admin:1".parse::<Principal>().is_err());
        assert!("startup:abc".parse::<Principal>().is_err());
        assert!("startup".parse::<Principal>().is_err());
    }

    #[test]
    fn progression_state_defaults_to_baseline() {
        let state = ProgressionState::default();
        assert_eq!(state.level(Track::Trl), Level::BASELINE);
        assert_eq!(state.level(Track::Crl), Level::BASELINE);

        let raised = state.with_level(Track::Crl, Level::TOP);
        assert_eq!(raised.crl, Level::TOP);
        assert_eq!(raised.trl, Level::BASELINE);
    }
}
