//! # Ladder HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET|POST /claims`, `GET|PATCH|DELETE /claims/{id}` - Readiness claims
//! - `GET|POST /evidence`, `PATCH|DELETE /evidence/{id}` - Evidence
//! - `POST /evidence/{id}/review` - Approve or reject evidence
//! - `GET /startups/{id}/levels` - Cached TRL / CRL of a startup
//! - `GET /portfolio/summary` - Incubator portfolio figures
//! - `GET /portfolio/startups` - Per-startup levels and finances
//! - `GET /portfolio/claims` - Claims with nested evidence
//! - `GET /portfolio/evidence?status=` - Review queue
//!
//! ## Security Configuration
//!
//! - `LADDER_API_KEY`: if set, requires Bearer token authentication
//! - `X-Ladder-Principal`: caller identity on every request but `/health`

mod auth;
mod error;
mod handlers;
mod types;

pub use auth::{CurrentPrincipal, PRINCIPAL_HEADER, get_api_key_from_env};
pub use error::ApiError;
pub use types::{
    ClaimJson, CreateClaimRequest, DeleteClaimResponse, ErrorBody, ErrorResponse, EvidenceJson,
    EvidenceQuery, EvidenceResponse, HealthResponse, LevelChangeJson, LevelsResponse,
    PortfolioClaimJson, ReviewRequest, StartupRowJson, SubmitEvidenceRequest, SummaryResponse,
    UpdateClaimRequest, UpdateEvidenceRequest,
};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use ladder_core::{LadderError, Registry, StaticDirectory};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Maximum request body size (1 MB).
const MAX_BODY_SIZE: usize = 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the ledger plus the read-only directory.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Registry>>,
    pub directory: Arc<StaticDirectory>,
    /// Snapshot file rewritten after every successful command.
    pub snapshot_path: Option<Arc<PathBuf>>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Registry, directory: StaticDirectory) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            directory: Arc::new(directory),
            snapshot_path: None,
        }
    }

    /// Persist the ledger to `path` after each command, before responding.
    #[must_use]
    pub fn persist_to(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(Arc::new(path));
        self
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. Body limit
/// 3. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED. Any caller able to reach the port can act \
             as any principal. Set LADDER_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/claims",
            get(handlers::list_claims_handler).post(handlers::create_claim_handler),
        )
        .route(
            "/claims/{id}",
            get(handlers::get_claim_handler)
                .patch(handlers::update_claim_handler)
                .delete(handlers::delete_claim_handler),
        )
        .route(
            "/evidence",
            get(handlers::list_evidence_handler).post(handlers::submit_evidence_handler),
        )
        .route(
            "/evidence/{id}",
            patch(handlers::update_evidence_handler).delete(handlers::delete_evidence_handler),
        )
        .route(
            "/evidence/{id}/review",
            post(handlers::review_evidence_handler),
        )
        .route(
            "/startups/{id}/levels",
            get(handlers::startup_levels_handler),
        )
        .route(
            "/portfolio/summary",
            get(handlers::portfolio_summary_handler),
        )
        .route(
            "/portfolio/startups",
            get(handlers::portfolio_startups_handler),
        )
        .route("/portfolio/claims", get(handlers::portfolio_claims_handler))
        .route(
            "/portfolio/evidence",
            get(handlers::portfolio_evidence_handler),
        );

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Resolve when the process receives Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("Shutdown signal received, draining connections");
}

/// Start the HTTP server and run until Ctrl+C or SIGTERM.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), LadderError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LadderError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Ladder HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LadderError::Io(format!("Server error: {}", e)))
}
