//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Every write goes through [`apply`], which takes the registry write lock
//! for exactly one command. Reads share the lock.

use super::{
    AppState,
    auth::CurrentPrincipal,
    error::ApiError,
    types::{
        ClaimJson, CreateClaimRequest, DeleteClaimResponse, EvidenceJson, EvidenceQuery,
        EvidenceResponse, HealthResponse, LevelsResponse, PortfolioClaimJson, ReviewRequest,
        StartupRowJson, SubmitEvidenceRequest, SummaryResponse, UpdateClaimRequest,
        UpdateEvidenceRequest,
    },
};
use crate::snapshot;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use ladder_core::{
    ClaimId, Command, EvidenceId, LadderError, LevelChange, Outcome, Principal, StartupId,
};

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Unwrap a JSON body, reporting malformed input as a validation error.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            LadderError::Validation(rejection.body_text()).into()
        }
    })
}

/// Unwrap a numeric path id; anything else is a validation error.
fn path_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| LadderError::Validation(rejection.body_text()).into())
}

/// An outcome of the wrong shape for the command that produced it.
fn unexpected(command: &str, outcome: &Outcome) -> ApiError {
    LadderError::Consistency(format!(
        "{} produced an unexpected outcome: {:?}",
        command, outcome
    ))
    .into()
}

/// Run one command under the write lock and log what it did.
///
/// With a snapshot path configured, the snapshot is rewritten before the
/// lock is released, so an acknowledged write is already on disk.
async fn apply(
    state: &AppState,
    principal: Principal,
    command: Command,
) -> Result<Outcome, ApiError> {
    let name = command.name();
    let outcome = {
        let mut registry = state.registry.write().await;
        let outcome = registry.apply(principal, state.directory.as_ref(), command)?;
        if let Some(path) = &state.snapshot_path {
            snapshot::write(&registry.snapshot()?, path).inspect_err(|e| {
                tracing::error!(
                    event = "snapshot_write_failed",
                    command = name,
                    error = %e,
                    "Command applied in memory but not persisted"
                );
            })?;
        }
        outcome
    };
    log_outcome(principal, name, &outcome);
    Ok(outcome)
}

/// Emit structured events for reviews, cascades and level changes.
fn log_outcome(principal: Principal, command: &'static str, outcome: &Outcome) {
    match outcome {
        Outcome::ClaimDeleted(report) => tracing::info!(
            event = "claim_cascade",
            principal = %principal,
            claim = report.claim.id.0,
            removed_evidence = report.removed_evidence.len(),
            "Claim deleted with its matching evidence"
        ),
        Outcome::Evidence { item, .. } if command == "review_evidence" => tracing::info!(
            event = "evidence_reviewed",
            principal = %principal,
            evidence = item.id.0,
            startup = item.startup.0,
            status = %item.status,
            "Evidence reviewed"
        ),
        _ => tracing::debug!(event = "command_applied", principal = %principal, command),
    }

    if let Some(change) = outcome.level_change().filter(LevelChange::changed) {
        tracing::info!(
            event = "level_changed",
            startup = change.startup.0,
            track = %change.track,
            previous = change.previous.value(),
            current = change.current.value(),
            dropped = change.dropped(),
            "Readiness level changed"
        );
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// CLAIM HANDLERS
// =============================================================================

/// List the caller's claims.
pub async fn list_claims_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<ClaimJson>>, ApiError> {
    let claims = state.registry.read().await.claims(principal)?;
    Ok(Json(claims.into_iter().map(Into::into).collect()))
}

pub async fn get_claim_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<ClaimJson>, ApiError> {
    let id = path_id(id)?;
    let claim = state.registry.read().await.claim(principal, ClaimId(id))?;
    Ok(Json(claim.into()))
}

/// Declare a new claim.
pub async fn create_claim_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    payload: Result<Json<CreateClaimRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClaimJson>), ApiError> {
    let new = json_body(payload)?.into_new_claim()?;
    match apply(&state, principal, Command::CreateClaim(new)).await? {
        Outcome::Claim(claim) => Ok((StatusCode::CREATED, Json(claim.into()))),
        other => Err(unexpected("create_claim", &other)),
    }
}

/// Edit the title or subtitle of a claim.
pub async fn update_claim_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimJson>, ApiError> {
    let id = path_id(id)?;
    let command = Command::UpdateClaim {
        id: ClaimId(id),
        patch: json_body(payload)?.into(),
    };
    match apply(&state, principal, command).await? {
        Outcome::Claim(claim) => Ok(Json(claim.into())),
        other => Err(unexpected("update_claim", &other)),
    }
}

/// Delete a claim together with its matching evidence.
pub async fn delete_claim_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeleteClaimResponse>, ApiError> {
    let id = path_id(id)?;
    let command = Command::DeleteClaim { id: ClaimId(id) };
    match apply(&state, principal, command).await? {
        Outcome::ClaimDeleted(report) => Ok(Json(report.into())),
        other => Err(unexpected("delete_claim", &other)),
    }
}

// =============================================================================
// EVIDENCE HANDLERS
// =============================================================================

/// List the caller's evidence, newest first.
pub async fn list_evidence_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<EvidenceJson>>, ApiError> {
    let items = state.registry.read().await.evidence(principal)?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Submit evidence; it starts out `PENDING`.
pub async fn submit_evidence_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    payload: Result<Json<SubmitEvidenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EvidenceResponse>), ApiError> {
    let new = json_body(payload)?.into_new_evidence()?;
    match apply(&state, principal, Command::SubmitEvidence(new)).await? {
        Outcome::Evidence { item, change } => Ok((
            StatusCode::CREATED,
            Json(EvidenceResponse::new(item, change)),
        )),
        other => Err(unexpected("submit_evidence", &other)),
    }
}

/// Edit evidence; an approved item goes back to `PENDING`.
pub async fn update_evidence_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateEvidenceRequest>, JsonRejection>,
) -> Result<Json<EvidenceResponse>, ApiError> {
    let id = path_id(id)?;
    let command = Command::UpdateEvidence {
        id: EvidenceId(id),
        patch: json_body(payload)?.into(),
    };
    match apply(&state, principal, command).await? {
        Outcome::Evidence { item, change } => Ok(Json(EvidenceResponse::new(item, change))),
        other => Err(unexpected("update_evidence", &other)),
    }
}

pub async fn delete_evidence_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<EvidenceResponse>, ApiError> {
    let id = path_id(id)?;
    let command = Command::DeleteEvidence { id: EvidenceId(id) };
    match apply(&state, principal, command).await? {
        Outcome::EvidenceDeleted { item, change } => {
            Ok(Json(EvidenceResponse::new(item, change)))
        }
        other => Err(unexpected("delete_evidence", &other)),
    }
}

/// Approve or reject evidence as an associated incubator.
pub async fn review_evidence_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<EvidenceResponse>, ApiError> {
    let id = path_id(id)?;
    let request = json_body(payload)?;
    let command = Command::ReviewEvidence {
        id: EvidenceId(id),
        decision: request.decision()?,
        notes: request.reviewer_notes,
    };
    match apply(&state, principal, command).await? {
        Outcome::Evidence { item, change } => Ok(Json(EvidenceResponse::new(item, change))),
        other => Err(unexpected("review_evidence", &other)),
    }
}

// =============================================================================
// LEVEL HANDLER
// =============================================================================

/// Cached TRL and CRL of a startup.
pub async fn startup_levels_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<LevelsResponse>, ApiError> {
    let id = path_id(id)?;
    let startup = StartupId(id);
    let levels = state
        .registry
        .read()
        .await
        .levels(principal, state.directory.as_ref(), startup)?;
    Ok(Json(LevelsResponse::new(startup, levels)))
}

// =============================================================================
// PORTFOLIO HANDLERS
// =============================================================================

pub async fn portfolio_summary_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<SummaryResponse>, ApiError> {
    let directory = state.directory.as_ref();
    let summary = state
        .registry
        .read()
        .await
        .summarize(principal, directory, directory)?;
    Ok(Json(summary.into()))
}

pub async fn portfolio_startups_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<StartupRowJson>>, ApiError> {
    let directory = state.directory.as_ref();
    let rows = state
        .registry
        .read()
        .await
        .portfolio_startups(principal, directory, directory)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Every claim of the portfolio with its evidence nested.
pub async fn portfolio_claims_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<PortfolioClaimJson>>, ApiError> {
    let claims = state
        .registry
        .read()
        .await
        .portfolio_claims(principal, state.directory.as_ref())?;
    Ok(Json(claims.into_iter().map(Into::into).collect()))
}

/// Evidence across the portfolio, optionally filtered by `?status=`.
pub async fn portfolio_evidence_handler(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    query: Result<Query<EvidenceQuery>, QueryRejection>,
) -> Result<Json<Vec<EvidenceJson>>, ApiError> {
    let Query(query) =
        query.map_err(|rejection| LadderError::Validation(rejection.body_text()))?;
    let status = query.status_filter()?;
    let items = state.registry.read().await.portfolio_evidence(
        principal,
        state.directory.as_ref(),
        status,
    )?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}
