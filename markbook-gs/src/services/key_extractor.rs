//! Batch answer-key extraction pipeline
//!
//! Uploaded key documents are processed sequentially, one model call per
//! file. Extraction is best-effort per item: a file that cannot be read
//! or extracted becomes a FAILED registry entry with a diagnostic, and
//! the batch moves on. Batches always run to completion.

use crate::models::{AnswerKey, ExamDocument};
use crate::services::grading_client::GradingClient;
use crate::stores::AnswerKeyStore;
use chrono::{DateTime, Utc};
use markbook_common::events::{EventBus, MarkbookEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Batch lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    Running,
    Completed,
}

/// One uploaded key document awaiting extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyUploadFile {
    /// Original filename; drives the key's display name and exam code
    pub name: String,
    /// Base64 payload
    pub data: String,
    pub mime_type: String,
}

/// Progress snapshot of one extraction batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub batch_id: Uuid,
    pub state: BatchState,

    /// 1-based index of the file being processed (0 before the first)
    pub current: usize,
    pub total: usize,
    pub current_file: String,

    pub keys_created: usize,
    pub keys_failed: usize,

    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ExtractionBatch {
    pub fn new(total: usize) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            state: BatchState::Running,
            current: 0,
            total,
            current_file: String::new(),
            keys_created: 0,
            keys_failed: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Shared batch progress map, readable while batches run
pub type BatchMap = Arc<RwLock<HashMap<Uuid, ExtractionBatch>>>;

/// Batch extraction runner
pub struct KeyExtractor {
    client: Arc<GradingClient>,
    store: Arc<AnswerKeyStore>,
    batches: BatchMap,
    event_bus: EventBus,
}

impl KeyExtractor {
    pub fn new(
        client: Arc<GradingClient>,
        store: Arc<AnswerKeyStore>,
        batches: BatchMap,
        event_bus: EventBus,
    ) -> Self {
        Self {
            client,
            store,
            batches,
            event_bus,
        }
    }

    /// Process one batch to completion.
    ///
    /// The batch record must already be registered in the batch map; this
    /// updates it in place as files are processed.
    pub async fn run_batch(&self, batch_id: Uuid, files: Vec<KeyUploadFile>) {
        let total = files.len();
        let started = Utc::now();

        info!(batch_id = %batch_id, total_files = total, "Starting key extraction batch");
        self.event_bus.emit_lossy(MarkbookEvent::KeyExtractionStarted {
            batch_id,
            total_files: total,
            timestamp: Utc::now(),
        });

        let mut keys_created = 0usize;
        let mut keys_failed = 0usize;

        for (index, file) in files.into_iter().enumerate() {
            self.update_batch(batch_id, |batch| {
                batch.current = index + 1;
                batch.current_file = file.name.clone();
            })
            .await;

            self.event_bus.emit_lossy(MarkbookEvent::KeyExtractionProgress {
                batch_id,
                current: index + 1,
                total,
                current_file: file.name.clone(),
                timestamp: Utc::now(),
            });

            let key = self.extract_one(&file).await;
            match key.status {
                crate::models::KeyStatus::Ready => keys_created += 1,
                crate::models::KeyStatus::Failed => keys_failed += 1,
            }
            self.store.insert(key).await;

            self.update_batch(batch_id, |batch| {
                batch.keys_created = keys_created;
                batch.keys_failed = keys_failed;
            })
            .await;
        }

        self.update_batch(batch_id, |batch| {
            batch.state = BatchState::Completed;
            batch.ended_at = Some(Utc::now());
        })
        .await;

        let duration_seconds = (Utc::now() - started).num_seconds() as u64;
        info!(
            batch_id = %batch_id,
            keys_created = keys_created,
            keys_failed = keys_failed,
            duration_seconds = duration_seconds,
            "Key extraction batch finished"
        );
        self.event_bus.emit_lossy(MarkbookEvent::KeyExtractionCompleted {
            batch_id,
            keys_created,
            keys_failed,
            duration_seconds,
            timestamp: Utc::now(),
        });
    }

    /// Extract one file into a registry entry, never failing the batch.
    async fn extract_one(&self, file: &KeyUploadFile) -> AnswerKey {
        let document = match ExamDocument::new(
            file.data.clone(),
            file.mime_type.clone(),
            Some(file.name.clone()),
        ) {
            Ok(document) => document,
            Err(e) => {
                warn!(file = %file.name, "Rejecting key upload: {}", e);
                return AnswerKey::from_failed_extraction(&file.name, e.to_string());
            }
        };

        match self.client.extract_answer_key(&document).await {
            Ok(content) if !content.trim().is_empty() => AnswerKey::from_extraction(
                &file.name,
                content,
                file.data.clone(),
                file.mime_type.clone(),
            ),
            Ok(_) => {
                warn!(file = %file.name, "Extraction produced no content");
                AnswerKey::from_failed_extraction(
                    &file.name,
                    "No content could be extracted from the document".to_string(),
                )
            }
            Err(e) => {
                warn!(file = %file.name, "Key extraction failed: {}", e);
                AnswerKey::from_failed_extraction(&file.name, e.to_string())
            }
        }
    }

    async fn update_batch<F>(&self, batch_id: Uuid, apply: F)
    where
        F: FnOnce(&mut ExtractionBatch),
    {
        if let Some(batch) = self.batches.write().await.get_mut(&batch_id) {
            apply(batch);
        }
    }
}
