//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use ladder::api::{
    ClaimJson, CreateClaimRequest, EvidenceQuery, HealthResponse, PortfolioClaimJson,
    ReviewRequest, SubmitEvidenceRequest, SummaryResponse, UpdateEvidenceRequest,
};
use ladder_core::{
    ClaimId, EvidenceId, EvidenceItem, EvidencePatch, IncubatorId, LadderError, Level, Money,
    PortfolioSummary, ReadinessClaim, ReviewDecision, ReviewStatus, StartupId, Track,
};

fn claim() -> ReadinessClaim {
    ReadinessClaim {
        id: ClaimId(4),
        startup: StartupId(1),
        track: Track::Crl,
        level: Level::new(2).unwrap(),
        title: "Customer interviews".to_string(),
        subtitle: None,
        created_at: 100,
        updated_at: 120,
    }
}

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

// =============================================================================
// REQUEST TESTS
// =============================================================================

#[test]
fn test_create_claim_request_parses_track() {
    let json = r#"{"track":"crl","level":2,"title":"Customer interviews"}"#;
    let request: CreateClaimRequest = serde_json::from_str(json).unwrap();
    let new = request.into_new_claim().unwrap();

    assert_eq!(new.track, Track::Crl);
    assert_eq!(new.level, 2);
    assert!(new.subtitle.is_none());
}

#[test]
fn test_unknown_track_is_validation_error() {
    let request = SubmitEvidenceRequest {
        track: "XRL".to_string(),
        level: 1,
        description: None,
        file_url: None,
    };
    assert!(matches!(
        request.into_new_evidence(),
        Err(LadderError::Validation(_))
    ));
}

#[test]
fn test_review_request_decisions() {
    let approve: ReviewRequest = serde_json::from_str(r#"{"status":"approved"}"#).unwrap();
    assert_eq!(approve.decision().unwrap(), ReviewDecision::Approved);
    assert!(approve.reviewer_notes.is_none());

    let pending: ReviewRequest = serde_json::from_str(r#"{"status":"PENDING"}"#).unwrap();
    assert!(pending.decision().is_err());
}

#[test]
fn test_evidence_query_status_filter() {
    assert_eq!(EvidenceQuery::default().status_filter().unwrap(), None);

    let query = EvidenceQuery {
        status: Some("Rejected".to_string()),
    };
    assert_eq!(query.status_filter().unwrap(), Some(ReviewStatus::Rejected));

    let query = EvidenceQuery {
        status: Some("lost".to_string()),
    };
    assert!(query.status_filter().is_err());
}

#[test]
fn test_update_evidence_request_into_patch() {
    let request: UpdateEvidenceRequest = serde_json::from_str(r#"{"file_url":""}"#).unwrap();
    let patch: EvidencePatch = request.into();
    assert_eq!(patch.file_url.as_deref(), Some(""));
    assert!(patch.description.is_none());
    assert!(!patch.is_empty());
}

// =============================================================================
// RESPONSE TESTS
// =============================================================================

#[test]
fn test_claim_json_uses_wire_names() {
    let json = serde_json::to_value(ClaimJson::from(claim())).unwrap();
    assert_eq!(json["track"], "CRL");
    assert_eq!(json["level"], 2);
    assert_eq!(json["startup_id"], 1);
    assert!(json["subtitle"].is_null());
}

#[test]
fn test_portfolio_claim_flattens_claim_fields() {
    let item = EvidenceItem {
        id: EvidenceId(9),
        startup: StartupId(1),
        track: Track::Crl,
        level: Level::new(2).unwrap(),
        description: Some("notes".to_string()),
        file_url: None,
        status: ReviewStatus::Approved,
        reviewer_notes: String::new(),
        created_at: 130,
        updated_at: 130,
    };
    let entry = PortfolioClaimJson {
        claim: claim().into(),
        evidence: vec![item.into()],
    };

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["id"], 4);
    assert_eq!(json["title"], "Customer interviews");
    assert_eq!(json["evidence"][0]["status"], "APPROVED");

    let back: PortfolioClaimJson = serde_json::from_value(json).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn test_summary_response_renders_strings() {
    let summary = PortfolioSummary {
        incubator: IncubatorId(3),
        startup_count: 3,
        total_portfolio_target: Money::from_minor(12_345_678),
        total_portfolio_committed: Money::ZERO,
        average_trl_hundredths: 267,
    };

    let response = SummaryResponse::from(summary);
    assert_eq!(response.total_portfolio_target, "123456.78");
    assert_eq!(response.total_portfolio_committed, "0.00");
    assert_eq!(response.average_trl, "2.67");
}
