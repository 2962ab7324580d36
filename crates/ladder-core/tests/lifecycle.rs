//! # Lifecycle Tests
//!
//! End-to-end scenarios through the command pipeline, run against both the
//! in-memory and the redb backend.

use ladder_core::{
    ClaimId, ClaimPatch, Command, EvidenceId, EvidencePatch, IncubatorId, InvestmentRound,
    InvestorEntry, InvestorStatus, LadderError, Level, Money, NewClaim, NewEvidence, Outcome,
    Principal, Registry, ReviewDecision, ReviewStatus, StartupId, StaticDirectory, Track,
};
use tempfile::TempDir;

const ACME: StartupId = StartupId(1);
const GLOBEX: StartupId = StartupId(2);
const HUB: IncubatorId = IncubatorId(10);

fn startup(id: StartupId) -> Principal {
    Principal::Startup(id)
}

fn hub() -> Principal {
    Principal::Incubator(HUB)
}

fn directory() -> StaticDirectory {
    StaticDirectory::new()
        .associate(HUB, ACME)
        .associate(HUB, GLOBEX)
}

/// Run `scenario` once per backend. The temp dir outlives the registry.
fn on_both_backends(scenario: impl Fn(&mut Registry)) {
    let mut memory = Registry::new();
    scenario(&mut memory);

    let temp = TempDir::new().expect("temp dir");
    let mut persistent = Registry::with_redb(temp.path().join("ladder.redb")).expect("open db");
    assert!(persistent.is_persistent());
    scenario(&mut persistent);
}

fn claim(registry: &mut Registry, owner: StartupId, track: Track, level: i64) -> ClaimId {
    match registry
        .apply(
            startup(owner),
            &directory(),
            Command::CreateClaim(NewClaim {
                track,
                level,
                title: format!("{} {}", track, level),
                subtitle: None,
            }),
        )
        .expect("create claim")
    {
        Outcome::Claim(claim) => claim.id,
        other => unreachable!("unexpected outcome {:?}", other),
    }
}

fn submit(registry: &mut Registry, owner: StartupId, track: Track, level: i64) -> EvidenceId {
    match registry
        .apply(
            startup(owner),
            &directory(),
            Command::SubmitEvidence(NewEvidence {
                track,
                level,
                description: Some("evidence".to_string()),
                file_url: Some("https://files.example/doc.pdf".to_string()),
            }),
        )
        .expect("submit evidence")
    {
        Outcome::Evidence { item, .. } => item.id,
        other => unreachable!("unexpected outcome {:?}", other),
    }
}

fn review(registry: &mut Registry, id: EvidenceId, decision: ReviewDecision) -> Outcome {
    registry
        .apply(
            hub(),
            &directory(),
            Command::ReviewEvidence {
                id,
                decision,
                notes: None,
            },
        )
        .expect("review")
}

fn approved(registry: &mut Registry, owner: StartupId, track: Track, level: i64) -> EvidenceId {
    let id = submit(registry, owner, track, level);
    review(registry, id, ReviewDecision::Approved);
    id
}

fn level_of(registry: &Registry, owner: StartupId, track: Track) -> u8 {
    registry
        .levels(startup(owner), &directory(), owner)
        .expect("levels")
        .level(track)
        .value()
}

// =============================================================================
// PROGRESSION
// =============================================================================

#[test]
fn approvals_advance_only_through_continuous_prefix() {
    on_both_backends(|registry| {
        assert_eq!(level_of(registry, ACME, Track::Trl), 1);

        approved(registry, ACME, Track::Trl, 1);
        approved(registry, ACME, Track::Trl, 2);
        assert_eq!(level_of(registry, ACME, Track::Trl), 2);

        approved(registry, ACME, Track::Trl, 4);
        assert_eq!(level_of(registry, ACME, Track::Trl), 2);

        approved(registry, ACME, Track::Trl, 3);
        assert_eq!(level_of(registry, ACME, Track::Trl), 4);
        assert_eq!(level_of(registry, ACME, Track::Crl), 1);
    });
}

#[test]
fn isolated_high_approval_stays_at_baseline() {
    on_both_backends(|registry| {
        approved(registry, ACME, Track::Crl, 5);
        assert_eq!(level_of(registry, ACME, Track::Crl), 1);
    });
}

#[test]
fn rejecting_middle_level_drops_to_prefix() {
    on_both_backends(|registry| {
        let ids: Vec<EvidenceId> = (1..=3)
            .map(|l| approved(registry, ACME, Track::Trl, l))
            .collect();
        assert_eq!(level_of(registry, ACME, Track::Trl), 3);

        let outcome = review(registry, ids[1], ReviewDecision::Rejected);
        let change = outcome.level_change().expect("recomputed");
        assert_eq!(change.previous.value(), 3);
        assert_eq!(change.current.value(), 1);
        assert_eq!(level_of(registry, ACME, Track::Trl), 1);
    });
}

#[test]
fn deleting_only_approved_item_drops_below_it() {
    on_both_backends(|registry| {
        let ids: Vec<EvidenceId> = (1..=5)
            .map(|l| approved(registry, ACME, Track::Trl, l))
            .collect();

        registry
            .apply(startup(ACME), &directory(), Command::DeleteEvidence { id: ids[2] })
            .expect("delete");
        assert_eq!(level_of(registry, ACME, Track::Trl), 2);

        registry
            .apply(startup(ACME), &directory(), Command::DeleteEvidence { id: ids[0] })
            .expect("delete");
        assert_eq!(level_of(registry, ACME, Track::Trl), 1);
    });
}

#[test]
fn duplicate_approved_evidence_keeps_level() {
    on_both_backends(|registry| {
        approved(registry, ACME, Track::Trl, 1);
        let spare = approved(registry, ACME, Track::Trl, 1);
        approved(registry, ACME, Track::Trl, 2);

        registry
            .apply(startup(ACME), &directory(), Command::DeleteEvidence { id: spare })
            .expect("delete");
        assert_eq!(level_of(registry, ACME, Track::Trl), 2);
    });
}

#[test]
fn deleting_claim_cascades_and_recomputes() {
    on_both_backends(|registry| {
        let first = claim(registry, ACME, Track::Crl, 1);
        claim(registry, ACME, Track::Crl, 2);
        approved(registry, ACME, Track::Crl, 1);
        approved(registry, ACME, Track::Crl, 2);
        approved(registry, ACME, Track::Trl, 1);
        assert_eq!(level_of(registry, ACME, Track::Crl), 2);

        let outcome = registry
            .apply(startup(ACME), &directory(), Command::DeleteClaim { id: first })
            .expect("delete claim");
        let Outcome::ClaimDeleted(report) = outcome else {
            unreachable!("delete yields a cascade report")
        };
        assert_eq!(report.removed_evidence.len(), 1);
        assert_eq!(report.change.current.value(), 1);

        assert_eq!(level_of(registry, ACME, Track::Crl), 1);
        assert_eq!(level_of(registry, ACME, Track::Trl), 1);
        assert_eq!(registry.claims(startup(ACME)).expect("claims").len(), 1);
        assert_eq!(registry.evidence(startup(ACME)).expect("evidence").len(), 2);
    });
}

#[test]
fn editing_approved_evidence_resets_review() {
    on_both_backends(|registry| {
        approved(registry, ACME, Track::Trl, 1);
        let second = approved(registry, ACME, Track::Trl, 2);

        let outcome = registry
            .apply(
                startup(ACME),
                &directory(),
                Command::UpdateEvidence {
                    id: second,
                    patch: EvidencePatch {
                        description: Some("revised".to_string()),
                        file_url: None,
                    },
                },
            )
            .expect("update");
        let Outcome::Evidence { item, change } = outcome else {
            unreachable!("update yields evidence")
        };
        assert_eq!(item.status, ReviewStatus::Pending);
        assert_eq!(change.map(|c| c.current.value()), Some(1));
        assert_eq!(level_of(registry, ACME, Track::Trl), 1);
    });
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

#[test]
fn ownership_and_roles_are_enforced() {
    on_both_backends(|registry| {
        let item = submit(registry, ACME, Track::Trl, 1);
        let owned_claim = claim(registry, ACME, Track::Trl, 1);

        let foreign_edit = registry.apply(
            startup(GLOBEX),
            &directory(),
            Command::UpdateEvidence {
                id: item,
                patch: EvidencePatch {
                    description: Some("mine now".to_string()),
                    file_url: None,
                },
            },
        );
        assert!(matches!(foreign_edit, Err(LadderError::NotFound { .. })));

        let foreign_claim = registry.apply(
            startup(GLOBEX),
            &directory(),
            Command::UpdateClaim {
                id: owned_claim,
                patch: ClaimPatch {
                    title: Some("mine now".to_string()),
                    subtitle: None,
                },
            },
        );
        assert!(matches!(foreign_claim, Err(LadderError::NotFound { .. })));

        let incubator_edit = registry.apply(
            hub(),
            &directory(),
            Command::DeleteEvidence { id: item },
        );
        assert!(matches!(incubator_edit, Err(LadderError::Forbidden(_))));

        let outsider = registry.apply(
            Principal::Incubator(IncubatorId(99)),
            &directory(),
            Command::ReviewEvidence {
                id: item,
                decision: ReviewDecision::Approved,
                notes: None,
            },
        );
        assert!(matches!(outsider, Err(LadderError::Forbidden(_))));
        assert_eq!(level_of(registry, ACME, Track::Trl), 1);
    });
}

#[test]
fn invalid_levels_are_rejected_without_side_effects() {
    on_both_backends(|registry| {
        for level in [0, 10] {
            let result = registry.apply(
                startup(ACME),
                &directory(),
                Command::SubmitEvidence(NewEvidence {
                    track: Track::Trl,
                    level,
                    description: None,
                    file_url: None,
                }),
            );
            assert!(matches!(result, Err(LadderError::Validation(_))));
        }
        assert!(registry.snapshot().expect("snapshot").evidence.is_empty());
    });
}

// =============================================================================
// PORTFOLIO
// =============================================================================

#[test]
fn portfolio_summary_reflects_levels_and_money() {
    on_both_backends(|registry| {
        approved(registry, ACME, Track::Trl, 1);
        approved(registry, ACME, Track::Trl, 2);
        approved(registry, ACME, Track::Trl, 3);
        submit(registry, GLOBEX, Track::Trl, 1);

        let directory = directory()
            .set_funding_goal(ACME, Money::from_minor(25_000_000))
            .set_funding_goal(GLOBEX, Money::from_minor(10_000_000))
            .add_round(
                ACME,
                InvestmentRound {
                    name: "Seed".to_string(),
                    target_amount: Money::from_minor(25_000_000),
                    investors: vec![
                        InvestorEntry {
                            name: "North Fund".to_string(),
                            status: InvestorStatus::Committed,
                            amount: Money::from_minor(5_000_000),
                        },
                        InvestorEntry {
                            name: "South Fund".to_string(),
                            status: InvestorStatus::PitchSent,
                            amount: Money::from_minor(7_000_000),
                        },
                    ],
                },
            );

        let summary = registry
            .summarize(hub(), &directory, &directory)
            .expect("summary");
        assert_eq!(summary.startup_count, 2);
        assert_eq!(summary.total_portfolio_target.to_string(), "350000.00");
        assert_eq!(summary.total_portfolio_committed.to_string(), "50000.00");
        assert_eq!(summary.average_trl_display(), "2.00");

        let queue = registry
            .portfolio_evidence(hub(), &directory, Some(ReviewStatus::Pending))
            .expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].startup, GLOBEX);

        let rows = registry
            .portfolio_startups(hub(), &directory, &directory)
            .expect("rows");
        assert_eq!(rows[0].levels.trl, Level::new(3).expect("level"));
        assert_eq!(rows[1].levels.trl, Level::BASELINE);
    });
}

#[test]
fn portfolio_claims_nest_matching_evidence() {
    on_both_backends(|registry| {
        claim(registry, ACME, Track::Trl, 1);
        claim(registry, ACME, Track::Crl, 1);
        submit(registry, ACME, Track::Trl, 1);
        submit(registry, ACME, Track::Trl, 1);
        submit(registry, ACME, Track::Trl, 2);

        let views = registry
            .portfolio_claims(hub(), &directory())
            .expect("claims");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].claim.track, Track::Trl);
        assert_eq!(views[0].evidence.len(), 2);
        assert!(views[1].evidence.is_empty());
    });
}
