//! markbook-gs library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod seed;
pub mod services;
pub mod stores;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use crate::config::GradingConfig;
use crate::models::Student;
use crate::services::{GradingClient, RosterClient};
use crate::services::key_extractor::BatchMap;
use crate::stores::{AnswerKeyStore, AttemptRegistry, SessionLedger};
use axum::Router;
use chrono::{DateTime, Utc};
use markbook_common::events::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved service configuration
    pub config: Arc<GradingConfig>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// External grading model client
    pub grading_client: Arc<GradingClient>,
    /// Answer key registry
    pub answer_keys: Arc<AnswerKeyStore>,
    /// Graded session ledger
    pub ledger: Arc<SessionLedger>,
    /// Grading attempt registry
    pub attempts: Arc<AttemptRegistry>,
    /// Key extraction batch snapshots
    pub extraction_batches: BatchMap,
    /// Cancellation tokens for active grading attempts
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Course directory client
    pub roster: Arc<RosterClient>,
    /// Per-course student cache
    pub students_cache: Arc<RwLock<HashMap<String, Vec<Student>>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: GradingConfig, event_bus: EventBus) -> anyhow::Result<Self> {
        let grading_client = Arc::new(GradingClient::new(&config)?);
        let roster = Arc::new(RosterClient::new(
            &config.roster_base_url,
            config.request_timeout_secs,
        )?);

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            grading_client,
            answer_keys: Arc::new(AnswerKeyStore::new()),
            ledger: Arc::new(SessionLedger::new()),
            attempts: Arc::new(AttemptRegistry::new()),
            extraction_batches: Arc::new(RwLock::new(HashMap::new())),
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            roster,
            students_cache: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::grading_routes())
        .merge(api::session_routes())
        .merge(api::answer_key_routes())
        .merge(api::roster_routes())
        .merge(api::health_routes())
        .route("/grading/events", get(api::grading_event_stream))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
