//! # Commands
//!
//! Every state-changing operation as one value. A command runs against a
//! single [`LedgerTxn`]: the mutation, the recompute read and the cached
//! level write commit together or not at all.
//!
//! Role checks happen here, before any lookup.

use crate::capability::{require_incubator, require_startup};
use crate::catalog::{self, CascadeReport, ClaimPatch, NewClaim};
use crate::directory::PortfolioDirectory;
use crate::evidence::{self, EvidencePatch, NewEvidence};
use crate::progression::LevelChange;
use crate::store::LedgerTxn;
use crate::{
    ClaimId, EvidenceId, EvidenceItem, LadderError, Principal, ReadinessClaim, ReviewDecision,
};
use serde::{Deserialize, Serialize};

/// Who is acting, against which directory, at what time.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub principal: Principal,
    pub directory: &'a dyn PortfolioDirectory,
    /// Unix seconds.
    pub now: u64,
}

/// A state-changing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateClaim(NewClaim),
    UpdateClaim { id: ClaimId, patch: ClaimPatch },
    DeleteClaim { id: ClaimId },
    SubmitEvidence(NewEvidence),
    UpdateEvidence { id: EvidenceId, patch: EvidencePatch },
    ReviewEvidence {
        id: EvidenceId,
        decision: ReviewDecision,
        notes: Option<String>,
    },
    DeleteEvidence { id: EvidenceId },
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Claim(ReadinessClaim),
    ClaimDeleted(CascadeReport),
    Evidence {
        item: EvidenceItem,
        change: Option<LevelChange>,
    },
    EvidenceDeleted {
        item: EvidenceItem,
        change: Option<LevelChange>,
    },
}

impl Outcome {
    /// The recompute this command triggered, if any.
    #[must_use]
    pub fn level_change(&self) -> Option<LevelChange> {
        match self {
            Outcome::Claim(_) => None,
            Outcome::ClaimDeleted(report) => Some(report.change),
            Outcome::Evidence { change, .. } | Outcome::EvidenceDeleted { change, .. } => *change,
        }
    }
}

impl Command {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Command::CreateClaim(_) => "create_claim",
            Command::UpdateClaim { .. } => "update_claim",
            Command::DeleteClaim { .. } => "delete_claim",
            Command::SubmitEvidence(_) => "submit_evidence",
            Command::UpdateEvidence { .. } => "update_evidence",
            Command::ReviewEvidence { .. } => "review_evidence",
            Command::DeleteEvidence { .. } => "delete_evidence",
        }
    }

    /// Run the command inside `txn`.
    ///
    /// On error the caller must discard the transaction.
    pub fn execute<T: LedgerTxn + ?Sized>(
        self,
        ctx: &CommandContext<'_>,
        txn: &mut T,
    ) -> Result<Outcome, LadderError> {
        let now = ctx.now;
        match self {
            Command::CreateClaim(new) => {
                let startup = require_startup(ctx.principal)?;
                catalog::create_claim(txn, startup, new, now).map(Outcome::Claim)
            }
            Command::UpdateClaim { id, patch } => {
                let startup = require_startup(ctx.principal)?;
                catalog::update_claim(txn, startup, id, patch, now).map(Outcome::Claim)
            }
            Command::DeleteClaim { id } => {
                let startup = require_startup(ctx.principal)?;
                catalog::delete_claim(txn, startup, id).map(Outcome::ClaimDeleted)
            }
            Command::SubmitEvidence(new) => {
                let startup = require_startup(ctx.principal)?;
                evidence::submit_evidence(txn, startup, new, now)
                    .map(|item| Outcome::Evidence { item, change: None })
            }
            Command::UpdateEvidence { id, patch } => {
                let startup = require_startup(ctx.principal)?;
                evidence::update_evidence(txn, startup, id, patch, now)
                    .map(|(item, change)| Outcome::Evidence { item, change })
            }
            Command::ReviewEvidence {
                id,
                decision,
                notes,
            } => {
                let reviewer = require_incubator(ctx.principal)?;
                evidence::review_evidence(txn, ctx.directory, reviewer, id, decision, notes, now)
                    .map(|(item, change)| Outcome::Evidence {
                        item,
                        change: Some(change),
                    })
            }
            Command::DeleteEvidence { id } => {
                let startup = require_startup(ctx.principal)?;
                evidence::delete_evidence(txn, startup, id)
                    .map(|(item, change)| Outcome::EvidenceDeleted { item, change })
            }
        }
    }
}
