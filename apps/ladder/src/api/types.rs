//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Tracks, statuses and decisions arrive as strings and are parsed here, so
//! an unknown value is a 400 with the usual error body rather than a
//! deserialization rejection. Money and the average TRL are rendered as
//! two-decimal strings.

use ladder_core::{
    CascadeReport, ClaimPatch, ClaimWithEvidence, EvidenceItem, EvidencePatch, LadderError,
    LevelChange, NewClaim, NewEvidence, PortfolioSummary, ProgressionState, ReadinessClaim,
    ReviewDecision, ReviewStatus, StartupId, StartupRow, Track,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH / ERROR RESPONSES
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Envelope of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

// =============================================================================
// CLAIM REQUESTS
// =============================================================================

/// Body of `POST /claims`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClaimRequest {
    pub track: String,
    pub level: i64,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
}

impl CreateClaimRequest {
    pub fn into_new_claim(self) -> Result<NewClaim, LadderError> {
        Ok(NewClaim {
            track: self.track.parse::<Track>()?,
            level: self.level,
            title: self.title,
            subtitle: self.subtitle,
        })
    }
}

/// Body of `PATCH /claims/{id}`. Track and level are immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClaimRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
}

impl From<UpdateClaimRequest> for ClaimPatch {
    fn from(request: UpdateClaimRequest) -> Self {
        ClaimPatch {
            title: request.title,
            subtitle: request.subtitle,
        }
    }
}

// =============================================================================
// EVIDENCE REQUESTS
// =============================================================================

/// Body of `POST /evidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEvidenceRequest {
    pub track: String,
    pub level: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl SubmitEvidenceRequest {
    pub fn into_new_evidence(self) -> Result<NewEvidence, LadderError> {
        Ok(NewEvidence {
            track: self.track.parse::<Track>()?,
            level: self.level,
            description: self.description,
            file_url: self.file_url,
        })
    }
}

/// Body of `PATCH /evidence/{id}`. An empty string clears a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEvidenceRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl From<UpdateEvidenceRequest> for EvidencePatch {
    fn from(request: UpdateEvidenceRequest) -> Self {
        EvidencePatch {
            description: request.description,
            file_url: request.file_url,
        }
    }
}

/// Body of `POST /evidence/{id}/review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// `APPROVED` or `REJECTED`.
    pub status: String,
    #[serde(default)]
    pub reviewer_notes: Option<String>,
}

impl ReviewRequest {
    pub fn decision(&self) -> Result<ReviewDecision, LadderError> {
        self.status.parse()
    }
}

/// Query of `GET /portfolio/evidence`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceQuery {
    #[serde(default)]
    pub status: Option<String>,
}

impl EvidenceQuery {
    pub fn status_filter(&self) -> Result<Option<ReviewStatus>, LadderError> {
        self.status.as_deref().map(str::parse).transpose()
    }
}

// =============================================================================
// ENTITY JSON
// =============================================================================

/// JSON representation of a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimJson {
    pub id: u64,
    pub startup_id: u64,
    pub track: String,
    pub level: u8,
    pub title: String,
    pub subtitle: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<ReadinessClaim> for ClaimJson {
    fn from(claim: ReadinessClaim) -> Self {
        Self {
            id: claim.id.0,
            startup_id: claim.startup.0,
            track: claim.track.as_str().to_string(),
            level: claim.level.value(),
            title: claim.title,
            subtitle: claim.subtitle,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}

/// JSON representation of an evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceJson {
    pub id: u64,
    pub startup_id: u64,
    pub track: String,
    pub level: u8,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub status: String,
    pub reviewer_notes: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<EvidenceItem> for EvidenceJson {
    fn from(item: EvidenceItem) -> Self {
        Self {
            id: item.id.0,
            startup_id: item.startup.0,
            track: item.track.as_str().to_string(),
            level: item.level.value(),
            description: item.description,
            file_url: item.file_url,
            status: item.status.as_str().to_string(),
            reviewer_notes: item.reviewer_notes,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// A recompute result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChangeJson {
    pub startup_id: u64,
    pub track: String,
    pub previous: u8,
    pub current: u8,
}

impl From<LevelChange> for LevelChangeJson {
    fn from(change: LevelChange) -> Self {
        Self {
            startup_id: change.startup.0,
            track: change.track.as_str().to_string(),
            previous: change.previous.value(),
            current: change.current.value(),
        }
    }
}

// =============================================================================
// COMMAND RESPONSES
// =============================================================================

/// Response of every evidence write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceResponse {
    pub evidence: EvidenceJson,
    /// Present when the write triggered a recompute.
    pub level_change: Option<LevelChangeJson>,
}

impl EvidenceResponse {
    pub fn new(item: EvidenceItem, change: Option<LevelChange>) -> Self {
        Self {
            evidence: item.into(),
            level_change: change.map(Into::into),
        }
    }
}

/// Response of `DELETE /claims/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteClaimResponse {
    pub claim: ClaimJson,
    pub removed_evidence: Vec<u64>,
    pub level_change: LevelChangeJson,
}

impl From<CascadeReport> for DeleteClaimResponse {
    fn from(report: CascadeReport) -> Self {
        Self {
            claim: report.claim.into(),
            removed_evidence: report.removed_evidence.iter().map(|id| id.0).collect(),
            level_change: report.change.into(),
        }
    }
}

// =============================================================================
// LEVEL AND PORTFOLIO RESPONSES
// =============================================================================

/// Current cached levels of a startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelsResponse {
    pub startup_id: u64,
    pub trl_level: u8,
    pub crl_level: u8,
}

impl LevelsResponse {
    pub fn new(startup: StartupId, levels: ProgressionState) -> Self {
        Self {
            startup_id: startup.0,
            trl_level: levels.trl.value(),
            crl_level: levels.crl.value(),
        }
    }
}

/// Incubator portfolio summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub incubator_id: u64,
    pub startup_count: usize,
    pub total_portfolio_target: String,
    pub total_portfolio_committed: String,
    pub average_trl: String,
}

impl From<PortfolioSummary> for SummaryResponse {
    fn from(summary: PortfolioSummary) -> Self {
        Self {
            incubator_id: summary.incubator.0,
            startup_count: summary.startup_count,
            total_portfolio_target: summary.total_portfolio_target.to_string(),
            total_portfolio_committed: summary.total_portfolio_committed.to_string(),
            average_trl: summary.average_trl_display(),
        }
    }
}

/// One row of `GET /portfolio/startups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupRowJson {
    pub startup_id: u64,
    pub trl_level: u8,
    pub crl_level: u8,
    pub funding_goal: String,
    pub committed: String,
}

impl From<StartupRow> for StartupRowJson {
    fn from(row: StartupRow) -> Self {
        Self {
            startup_id: row.startup.0,
            trl_level: row.levels.trl.value(),
            crl_level: row.levels.crl.value(),
            funding_goal: row.funding_goal.to_string(),
            committed: row.committed.to_string(),
        }
    }
}

/// A claim with its matching evidence nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioClaimJson {
    #[serde(flatten)]
    pub claim: ClaimJson,
    pub evidence: Vec<EvidenceJson>,
}

impl From<ClaimWithEvidence> for PortfolioClaimJson {
    fn from(entry: ClaimWithEvidence) -> Self {
        Self {
            claim: entry.claim.into(),
            evidence: entry.evidence.into_iter().map(Into::into).collect(),
        }
    }
}
