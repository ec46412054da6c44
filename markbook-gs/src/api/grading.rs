//! Grading attempt API handlers
//!
//! POST /grading/attempts, GET /grading/attempts/:id,
//! POST /grading/attempts/:id/cancel

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{AttemptProgress, AttemptState, ExamDocument, GradingAttempt},
    workflow::GradingPipeline,
    AppState,
};

/// Document payload as uploaded by the client
#[derive(Debug, Deserialize)]
pub struct DocumentPayload {
    /// Base64-encoded file content
    pub data: String,
    /// MIME type (application/pdf or image/*)
    pub mime_type: String,
    /// Original file name, if known
    #[serde(default)]
    pub file_name: Option<String>,
}

/// POST /grading/attempts request
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub student_id: String,
    pub student_name: String,
    pub course_id: String,
    pub document: DocumentPayload,
}

/// POST /grading/attempts response
#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
    pub state: AttemptState,
}

/// GET /grading/attempts/:id response
#[derive(Debug, Serialize)]
pub struct AttemptStatusResponse {
    pub attempt_id: Uuid,
    pub state: AttemptState,
    pub progress: AttemptProgress,
    pub student_id: String,
    pub student_name: String,
    pub course_id: String,
    pub document_name: Option<String>,
    pub detected_code: Option<String>,
    pub matched_key_id: Option<Uuid>,
    pub matched_key_name: Option<String>,
    pub session_id: Option<Uuid>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// POST /grading/attempts/:id/cancel response
#[derive(Debug, Serialize)]
pub struct CancelAttemptResponse {
    pub attempt_id: Uuid,
    /// State at the time the cancel was requested; the pipeline marks
    /// the attempt CANCELLED at its next stage boundary.
    pub state: AttemptState,
    pub cancel_requested_at: DateTime<Utc>,
}

/// POST /grading/attempts
///
/// Intake-validates the document, registers the attempt, and spawns the
/// grading pipeline. Returns 202 Accepted with the attempt ID.
pub async fn start_attempt(
    State(state): State<AppState>,
    Json(request): Json<StartAttemptRequest>,
) -> ApiResult<(StatusCode, Json<StartAttemptResponse>)> {
    let document = ExamDocument::new(
        request.document.data,
        request.document.mime_type,
        request.document.file_name,
    )?;

    let attempt = GradingAttempt::new(
        request.student_id,
        request.student_name,
        request.course_id,
        document.file_name.clone(),
    );
    let attempt_id = attempt.attempt_id;
    state.attempts.save(attempt.clone()).await;

    let cancel_token = CancellationToken::new();
    state
        .cancellation_tokens
        .write()
        .await
        .insert(attempt_id, cancel_token.clone());

    tracing::info!(
        attempt_id = %attempt_id,
        student_id = %attempt.student_id,
        course_id = %attempt.course_id,
        document_size = document.approx_size(),
        "Grading attempt registered"
    );

    let response = StartAttemptResponse {
        attempt_id,
        state: attempt.state,
    };

    let state_clone = state.clone();
    tokio::spawn(async move {
        execute_grading_pipeline(state_clone, attempt, document, cancel_token).await;
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /grading/attempts/:id
///
/// Poll the attempt snapshot held in the registry.
pub async fn get_attempt_status(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> ApiResult<Json<AttemptStatusResponse>> {
    let attempt = state
        .attempts
        .get(attempt_id)
        .await
        .ok_or(ApiError::AttemptNotFound(attempt_id))?;

    tracing::debug!(attempt_id = %attempt_id, state = attempt.state.as_str(), "Status query");

    Ok(Json(AttemptStatusResponse {
        attempt_id: attempt.attempt_id,
        state: attempt.state,
        progress: attempt.progress.clone(),
        student_id: attempt.student_id,
        student_name: attempt.student_name,
        course_id: attempt.course_id,
        document_name: attempt.document_name,
        detected_code: attempt.detected_code,
        matched_key_id: attempt.matched_key_id,
        matched_key_name: attempt.matched_key_name,
        session_id: attempt.session_id,
        error: attempt.error,
        started_at: attempt.started_at,
        ended_at: attempt.ended_at,
    }))
}

/// POST /grading/attempts/:id/cancel
///
/// Request cancellation of a running attempt. The pipeline observes the
/// token between stages and discards any in-flight result.
pub async fn cancel_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> ApiResult<Json<CancelAttemptResponse>> {
    let attempt = state
        .attempts
        .get(attempt_id)
        .await
        .ok_or(ApiError::AttemptNotFound(attempt_id))?;

    if attempt.is_terminal() {
        return Err(ApiError::AlreadyFinished(format!(
            "attempt is already {}",
            attempt.state.as_str()
        )));
    }

    if let Some(token) = state.cancellation_tokens.read().await.get(&attempt_id) {
        token.cancel();
    }

    tracing::info!(attempt_id = %attempt_id, "Attempt cancellation requested");

    Ok(Json(CancelAttemptResponse {
        attempt_id,
        state: attempt.state,
        cancel_requested_at: Utc::now(),
    }))
}

/// Background task wrapping one pipeline run.
///
/// Cleans up the cancellation token when the attempt reaches a terminal
/// state and records failures for the health endpoint.
async fn execute_grading_pipeline(
    state: AppState,
    attempt: GradingAttempt,
    document: ExamDocument,
    cancel_token: CancellationToken,
) {
    let attempt_id = attempt.attempt_id;
    tracing::info!(attempt_id = %attempt_id, "Background grading task started");

    let pipeline = GradingPipeline::new(
        state.grading_client.clone(),
        state.answer_keys.clone(),
        state.ledger.clone(),
        state.attempts.clone(),
        state.event_bus.clone(),
    );

    let final_attempt = pipeline.execute(attempt, document, cancel_token).await;

    if final_attempt.state == AttemptState::Failed {
        let error = final_attempt
            .error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        tracing::error!(
            attempt_id = %attempt_id,
            error = %error,
            "Background grading task failed"
        );
        *state.last_error.write().await = Some(error);
    } else {
        tracing::info!(
            attempt_id = %attempt_id,
            state = final_attempt.state.as_str(),
            "Background grading task finished"
        );
    }

    state.cancellation_tokens.write().await.remove(&attempt_id);
}

/// Build grading attempt routes
pub fn grading_routes() -> Router<AppState> {
    Router::new()
        .route("/grading/attempts", post(start_attempt))
        .route("/grading/attempts/:attempt_id", get(get_attempt_status))
        .route("/grading/attempts/:attempt_id/cancel", post(cancel_attempt))
}
