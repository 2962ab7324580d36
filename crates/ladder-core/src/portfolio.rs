//! # Portfolio Aggregator
//!
//! Read-side roll-up across the startups associated with an incubator.
//!
//! Nothing here is persisted: every figure is recomputed from cached levels
//! and the financial source on each call. Reads fan out to at most
//! [`MAX_PORTFOLIO_SIZE`] startups.

use crate::catalog::list_claims;
use crate::directory::{FinancialSource, Money, PortfolioDirectory};
use crate::evidence::list_evidence;
use crate::primitives::MAX_PORTFOLIO_SIZE;
use crate::progression::current_levels;
use crate::store::LedgerView;
use crate::{
    EvidenceItem, IncubatorId, LadderError, ProgressionState, ReadinessClaim, ReviewStatus,
    StartupId,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Aggregate figures of one incubator's portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub incubator: IncubatorId,
    pub startup_count: usize,
    pub total_portfolio_target: Money,
    pub total_portfolio_committed: Money,
    /// Mean cached TRL in hundredths, rounded half up. 0 when empty.
    pub average_trl_hundredths: u64,
}

impl PortfolioSummary {
    /// Average TRL with two decimals, e.g. `"2.50"`.
    #[must_use]
    pub fn average_trl_display(&self) -> String {
        format!(
            "{}.{:02}",
            self.average_trl_hundredths / 100,
            self.average_trl_hundredths % 100
        )
    }
}

/// One startup of a portfolio with its levels and financial figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupRow {
    pub startup: StartupId,
    pub levels: ProgressionState,
    pub funding_goal: Money,
    pub committed: Money,
}

/// A claim with the evidence matching its `(track, level)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimWithEvidence {
    pub claim: ReadinessClaim,
    pub evidence: Vec<EvidenceItem>,
}

/// Associated startups of `incubator`, deduplicated and bounded.
pub fn members<D: PortfolioDirectory + ?Sized>(
    directory: &D,
    incubator: IncubatorId,
) -> Result<Vec<StartupId>, LadderError> {
    let startups: BTreeSet<StartupId> = directory.startups_of(incubator).into_iter().collect();
    if startups.len() > MAX_PORTFOLIO_SIZE {
        return Err(LadderError::Validation(format!(
            "portfolio of incubator {} has {} startups, limit is {}",
            incubator.0,
            startups.len(),
            MAX_PORTFOLIO_SIZE
        )));
    }
    Ok(startups.into_iter().collect())
}

/// Integer mean in hundredths, rounded half up.
fn mean_hundredths(values: &[u64]) -> u64 {
    let n = values.len() as u64;
    if n == 0 {
        return 0;
    }
    let sum: u64 = values.iter().sum();
    (sum * 100 + n / 2) / n
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Funding target, committed investment and average TRL of a portfolio.
pub fn summarize<V, D, F>(
    view: &V,
    directory: &D,
    finance: &F,
    incubator: IncubatorId,
) -> Result<PortfolioSummary, LadderError>
where
    V: LedgerView + ?Sized,
    D: PortfolioDirectory + ?Sized,
    F: FinancialSource + ?Sized,
{
    let rows = portfolio_startups(view, directory, finance, incubator)?;

    let trls: Vec<u64> = rows.iter().map(|r| u64::from(r.levels.trl.value())).collect();
    let (target, committed) = rows.iter().fold((Money::ZERO, Money::ZERO), |(t, c), r| {
        (t.saturating_add(r.funding_goal), c.saturating_add(r.committed))
    });

    Ok(PortfolioSummary {
        incubator,
        startup_count: rows.len(),
        total_portfolio_target: target,
        total_portfolio_committed: committed,
        average_trl_hundredths: mean_hundredths(&trls),
    })
}

/// Per-startup levels and financial figures, ascending by startup id.
pub fn portfolio_startups<V, D, F>(
    view: &V,
    directory: &D,
    finance: &F,
    incubator: IncubatorId,
) -> Result<Vec<StartupRow>, LadderError>
where
    V: LedgerView + ?Sized,
    D: PortfolioDirectory + ?Sized,
    F: FinancialSource + ?Sized,
{
    members(directory, incubator)?
        .into_iter()
        .map(|startup| {
            Ok(StartupRow {
                startup,
                levels: current_levels(view, startup)?,
                funding_goal: finance.funding_goal(startup).unwrap_or(Money::ZERO),
                committed: finance.committed(startup),
            })
        })
        .collect()
}

/// Every claim of the portfolio with its matching evidence nested.
pub fn portfolio_claims<V, D>(
    view: &V,
    directory: &D,
    incubator: IncubatorId,
) -> Result<Vec<ClaimWithEvidence>, LadderError>
where
    V: LedgerView + ?Sized,
    D: PortfolioDirectory + ?Sized,
{
    let mut out = Vec::new();
    for startup in members(directory, incubator)? {
        let evidence = list_evidence(view, startup)?;
        for claim in list_claims(view, startup)? {
            let matching = evidence
                .iter()
                .filter(|e| e.matches(claim.track, claim.level))
                .cloned()
                .collect();
            out.push(ClaimWithEvidence {
                claim,
                evidence: matching,
            });
        }
    }
    Ok(out)
}

/// Evidence across the portfolio, newest first, optionally by status.
pub fn portfolio_evidence<V, D>(
    view: &V,
    directory: &D,
    incubator: IncubatorId,
    status: Option<ReviewStatus>,
) -> Result<Vec<EvidenceItem>, LadderError>
where
    V: LedgerView + ?Sized,
    D: PortfolioDirectory + ?Sized,
{
    let mut out = Vec::new();
    for startup in members(directory, incubator)? {
        out.extend(
            view.evidence_of(startup)?
                .into_iter()
                .filter(|e| status.is_none_or(|s| e.status == s)),
        );
    }
    out.sort_by_key(|e| Reverse((e.created_at, e.id)));
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InvestmentRound, InvestorEntry, InvestorStatus, StaticDirectory};
    use crate::memory::MemoryLedger;
    use crate::progression::recompute_all;
    use crate::store::LedgerTxn;
    use crate::{EvidenceId, Level, Track};

    const INCUBATOR: IncubatorId = IncubatorId(1);

    fn approve_up_to(ledger: &mut MemoryLedger, startup: StartupId, top: u8) {
        for level in 1..=top {
            let id = ledger.allocate_id().expect("id");
            ledger
                .put_evidence(&EvidenceItem {
                    id: EvidenceId(id),
                    startup,
                    track: Track::Trl,
                    level: Level::new(level).expect("level"),
                    description: None,
                    file_url: None,
                    status: ReviewStatus::Approved,
                    reviewer_notes: String::new(),
                    created_at: u64::from(level),
                    updated_at: 0,
                })
                .expect("put");
        }
        recompute_all(ledger, startup).expect("recompute");
    }

    #[test]
    fn mean_rounds_half_up() {
        assert_eq!(mean_hundredths(&[]), 0);
        assert_eq!(mean_hundredths(&[2, 3]), 250);
        assert_eq!(mean_hundredths(&[1, 1, 2]), 133);
        assert_eq!(mean_hundredths(&[1, 2, 2]), 167);
    }

    #[test]
    fn empty_portfolio_reports_zeros() {
        let ledger = MemoryLedger::new();
        let directory = StaticDirectory::new();
        let summary = summarize(&ledger, &directory, &directory, INCUBATOR).expect("summary");
        assert_eq!(summary.startup_count, 0);
        assert_eq!(summary.total_portfolio_target, Money::ZERO);
        assert_eq!(summary.total_portfolio_committed, Money::ZERO);
        assert_eq!(summary.average_trl_display(), "0.00");
    }

    #[test]
    fn summary_rolls_up_targets_commitments_and_trl() {
        let mut ledger = MemoryLedger::new();
        approve_up_to(&mut ledger, StartupId(10), 2);
        approve_up_to(&mut ledger, StartupId(11), 3);

        let round = InvestmentRound {
            name: "Seed".to_string(),
            target_amount: Money::from_minor(0),
            investors: vec![
                InvestorEntry {
                    name: "A".to_string(),
                    status: InvestorStatus::Committed,
                    amount: Money::from_minor(50_000),
                },
                InvestorEntry {
                    name: "B".to_string(),
                    status: InvestorStatus::DueDiligence,
                    amount: Money::from_minor(90_000),
                },
            ],
        };
        let directory = StaticDirectory::new()
            .associate(INCUBATOR, StartupId(10))
            .associate(INCUBATOR, StartupId(11))
            .set_funding_goal(StartupId(10), Money::from_minor(100_000))
            .add_round(StartupId(11), round);

        let summary = summarize(&ledger, &directory, &directory, INCUBATOR).expect("summary");
        assert_eq!(summary.startup_count, 2);
        assert_eq!(summary.total_portfolio_target.minor_units(), 100_000);
        assert_eq!(summary.total_portfolio_committed.minor_units(), 50_000);
        assert_eq!(summary.average_trl_display(), "2.50");
    }

    #[test]
    fn newly_associated_startup_is_included() {
        let mut ledger = MemoryLedger::new();
        approve_up_to(&mut ledger, StartupId(10), 4);
        let directory = StaticDirectory::new().associate(INCUBATOR, StartupId(11));

        let before = summarize(&ledger, &directory, &directory, INCUBATOR).expect("summary");
        assert_eq!(before.average_trl_hundredths, 100);

        let directory = directory.associate(INCUBATOR, StartupId(10));
        let after = summarize(&ledger, &directory, &directory, INCUBATOR).expect("summary");
        assert_eq!(after.startup_count, 2);
        assert_eq!(after.average_trl_hundredths, 250);
    }

    #[test]
    fn evidence_queue_filters_by_status() {
        let mut ledger = MemoryLedger::new();
        approve_up_to(&mut ledger, StartupId(10), 2);
        let pending_id = ledger.allocate_id().expect("id");
        ledger
            .put_evidence(&EvidenceItem {
                id: EvidenceId(pending_id),
                startup: StartupId(10),
                track: Track::Crl,
                level: Level::BASELINE,
                description: None,
                file_url: None,
                status: ReviewStatus::Pending,
                reviewer_notes: String::new(),
                created_at: 50,
                updated_at: 50,
            })
            .expect("put");
        let directory = StaticDirectory::new().associate(INCUBATOR, StartupId(10));

        let all = portfolio_evidence(&ledger, &directory, INCUBATOR, None).expect("all");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, EvidenceId(pending_id));

        let pending =
            portfolio_evidence(&ledger, &directory, INCUBATOR, Some(ReviewStatus::Pending))
                .expect("pending");
        assert_eq!(pending.len(), 1);

        let outsider = portfolio_evidence(&ledger, &directory, IncubatorId(2), None).expect("none");
        assert!(outsider.is_empty());
    }
}
