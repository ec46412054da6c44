//! Answer key registry API handlers
//!
//! Registry CRUD plus the batch extraction pipeline endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::AnswerKey,
    services::{ExtractionBatch, KeyExtractor, KeyUploadFile},
    AppState,
};

/// POST /answer-keys request
#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    pub code: String,
    pub content: String,
}

/// PUT /answer-keys response
#[derive(Debug, Serialize)]
pub struct ReplaceKeysResponse {
    pub count: usize,
}

/// POST /answer-keys/extract request
#[derive(Debug, Deserialize)]
pub struct ExtractKeysRequest {
    pub files: Vec<KeyUploadFile>,
}

/// POST /answer-keys/extract response
#[derive(Debug, Serialize)]
pub struct ExtractKeysResponse {
    pub batch_id: Uuid,
    pub total_files: usize,
}

/// GET /answer-keys
///
/// All keys in registry order (newest first).
pub async fn list_keys(State(state): State<AppState>) -> Json<Vec<AnswerKey>> {
    Json(state.answer_keys.list().await)
}

/// GET /answer-keys/:id
pub async fn get_key(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> ApiResult<Json<AnswerKey>> {
    let key = state
        .answer_keys
        .get(key_id)
        .await
        .ok_or(ApiError::KeyNotFound(key_id))?;
    Ok(Json(key))
}

/// POST /answer-keys
///
/// Manual key creation. Returns 201 Created with the stored key.
pub async fn create_key(
    State(state): State<AppState>,
    Json(request): Json<CreateKeyRequest>,
) -> ApiResult<(StatusCode, Json<AnswerKey>)> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("key name must not be empty".to_string()));
    }

    let key = AnswerKey::new(request.name, request.code, request.content);
    tracing::info!(key_id = %key.id, code = %key.code, "Answer key created");
    state.answer_keys.insert(key.clone()).await;

    Ok((StatusCode::CREATED, Json(key)))
}

/// DELETE /answer-keys/:id
pub async fn delete_key(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.answer_keys.delete(key_id).await {
        return Err(ApiError::KeyNotFound(key_id));
    }
    tracing::info!(key_id = %key_id, "Answer key deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /answer-keys
///
/// Replace the whole registry with the supplied keys.
pub async fn replace_keys(
    State(state): State<AppState>,
    Json(keys): Json<Vec<AnswerKey>>,
) -> Json<ReplaceKeysResponse> {
    let count = keys.len();
    tracing::info!(count, "Answer key registry replaced");
    state.answer_keys.replace_all(keys).await;
    Json(ReplaceKeysResponse { count })
}

/// POST /answer-keys/extract
///
/// Start a background extraction batch over the uploaded files. Returns
/// 202 Accepted with the batch ID; progress streams over SSE and the
/// batch snapshot endpoint.
pub async fn extract_keys(
    State(state): State<AppState>,
    Json(request): Json<ExtractKeysRequest>,
) -> ApiResult<(StatusCode, Json<ExtractKeysResponse>)> {
    let total_files = request.files.len();
    let batch = ExtractionBatch::new(total_files);
    let batch_id = batch.batch_id;

    state
        .extraction_batches
        .write()
        .await
        .insert(batch_id, batch);

    tracing::info!(batch_id = %batch_id, total_files, "Key extraction batch registered");

    let extractor = KeyExtractor::new(
        state.grading_client.clone(),
        state.answer_keys.clone(),
        state.extraction_batches.clone(),
        state.event_bus.clone(),
    );
    let files = request.files;
    tokio::spawn(async move {
        extractor.run_batch(batch_id, files).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ExtractKeysResponse {
            batch_id,
            total_files,
        }),
    ))
}

/// GET /answer-keys/extract/:batch_id
///
/// Poll the extraction batch snapshot.
pub async fn get_extraction_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<ExtractionBatch>> {
    let batch = state
        .extraction_batches
        .read()
        .await
        .get(&batch_id)
        .cloned()
        .ok_or(ApiError::BatchNotFound(batch_id))?;
    Ok(Json(batch))
}

/// Build answer key routes
pub fn answer_key_routes() -> Router<AppState> {
    Router::new()
        .route("/answer-keys", get(list_keys).post(create_key).put(replace_keys))
        .route("/answer-keys/extract", post(extract_keys))
        .route("/answer-keys/extract/:batch_id", get(get_extraction_batch))
        .route("/answer-keys/:key_id", get(get_key).delete(delete_key))
}
