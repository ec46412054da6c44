//! Batch answer-key extraction tests
//!
//! Runs the extractor against the fake model server and checks per-file
//! isolation, registry entries, batch snapshots, and the event sequence.

mod helpers;

use helpers::{test_config, EventCollector, FakeModelServer, PNG_B64};
use markbook_common::events::{EventBus, MarkbookEvent};
use markbook_gs::models::KeyStatus;
use markbook_gs::services::key_extractor::BatchMap;
use markbook_gs::services::{BatchState, ExtractionBatch, GradingClient, KeyExtractor, KeyUploadFile};
use markbook_gs::stores::AnswerKeyStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

fn fixture(fake: &FakeModelServer) -> (KeyExtractor, Arc<AnswerKeyStore>, BatchMap, EventBus) {
    let client = Arc::new(GradingClient::new(&test_config(&fake.base_url)).expect("client"));
    let store = Arc::new(AnswerKeyStore::new());
    let batches: BatchMap = Arc::new(RwLock::new(HashMap::new()));
    let event_bus = EventBus::new(100);
    let extractor = KeyExtractor::new(client, store.clone(), batches.clone(), event_bus.clone());
    (extractor, store, batches, event_bus)
}

fn png_file(name: &str) -> KeyUploadFile {
    KeyUploadFile {
        name: name.to_string(),
        data: PNG_B64.to_string(),
        mime_type: "image/png".to_string(),
    }
}

async fn register_batch(batches: &BatchMap, total: usize) -> Uuid {
    let batch = ExtractionBatch::new(total);
    let batch_id = batch.batch_id;
    batches.write().await.insert(batch_id, batch);
    batch_id
}

#[tokio::test]
async fn middle_file_failure_does_not_abort_the_batch() {
    let fake = FakeModelServer::start().await;
    let (extractor, store, batches, event_bus) = fixture(&fake);
    let mut events = EventCollector::subscribe(&event_bus);

    fake.push_text("1. A\n2. B").await;
    fake.push_status(500, "model overloaded").await;
    fake.push_text("1. C\n2. D").await;

    let files = vec![
        png_file("SKE1_Starters.png"),
        png_file("SKG1_Movers.png"),
        png_file("YC3_KET.png"),
    ];
    let batch_id = register_batch(&batches, files.len()).await;

    extractor.run_batch(batch_id, files).await;

    // All three files produce registry entries, newest first
    let keys = store.list().await;
    assert_eq!(keys.len(), 3);

    assert_eq!(keys[0].name, "YC3_KET");
    assert_eq!(keys[0].code, "YC3");
    assert_eq!(keys[0].status, KeyStatus::Ready);
    assert_eq!(keys[0].content, "1. C\n2. D");

    assert_eq!(keys[1].name, "SKG1_Movers");
    assert_eq!(keys[1].status, KeyStatus::Failed);
    assert!(keys[1].content.is_empty());
    let reason = keys[1].failure_reason.as_deref().unwrap_or_default();
    assert!(reason.contains("500"), "unexpected reason: {}", reason);

    assert_eq!(keys[2].name, "SKE1_Starters");
    assert_eq!(keys[2].code, "SKE1");
    assert_eq!(keys[2].status, KeyStatus::Ready);
    assert_eq!(keys[2].content, "1. A\n2. B");
    assert_eq!(keys[2].file_data.as_deref(), Some(PNG_B64));
    assert_eq!(keys[2].mime_type.as_deref(), Some("image/png"));

    let snapshot = batches
        .read()
        .await
        .get(&batch_id)
        .cloned()
        .expect("batch snapshot");
    assert_eq!(snapshot.state, BatchState::Completed);
    assert_eq!(snapshot.keys_created, 2);
    assert_eq!(snapshot.keys_failed, 1);
    assert_eq!(snapshot.current, 3);
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.current_file, "YC3_KET.png");
    assert!(snapshot.ended_at.is_some());

    assert_eq!(fake.request_count().await, 3);

    // Started, one progress per file, then completed with the tallies
    let timeout = Duration::from_secs(2);
    match events.next_timeout(timeout).await {
        Some(MarkbookEvent::KeyExtractionStarted { total_files, .. }) => {
            assert_eq!(total_files, 3);
        }
        other => panic!("expected KeyExtractionStarted, got {:?}", other),
    }
    for (expected_index, expected_file) in
        [(1, "SKE1_Starters.png"), (2, "SKG1_Movers.png"), (3, "YC3_KET.png")]
    {
        match events.next_timeout(timeout).await {
            Some(MarkbookEvent::KeyExtractionProgress {
                current,
                total,
                current_file,
                ..
            }) => {
                assert_eq!(current, expected_index);
                assert_eq!(total, 3);
                assert_eq!(current_file, expected_file);
            }
            other => panic!("expected KeyExtractionProgress, got {:?}", other),
        }
    }
    match events.next_timeout(timeout).await {
        Some(MarkbookEvent::KeyExtractionCompleted {
            keys_created,
            keys_failed,
            ..
        }) => {
            assert_eq!(keys_created, 2);
            assert_eq!(keys_failed, 1);
        }
        other => panic!("expected KeyExtractionCompleted, got {:?}", other),
    }
}

#[tokio::test]
async fn unsupported_upload_fails_without_model_call() {
    let fake = FakeModelServer::start().await;
    let (extractor, store, batches, _event_bus) = fixture(&fake);

    let files = vec![KeyUploadFile {
        name: "SKE1_notes.txt".to_string(),
        data: PNG_B64.to_string(),
        mime_type: "text/plain".to_string(),
    }];
    let batch_id = register_batch(&batches, files.len()).await;

    extractor.run_batch(batch_id, files).await;

    let keys = store.list().await;
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].status, KeyStatus::Failed);
    assert_eq!(keys[0].name, "SKE1_notes");
    let reason = keys[0].failure_reason.as_deref().unwrap_or_default();
    assert!(reason.contains("text/plain"), "unexpected reason: {}", reason);

    // Intake rejection happens before any model traffic
    assert_eq!(fake.request_count().await, 0);

    let snapshot = batches.read().await.get(&batch_id).cloned().expect("batch");
    assert_eq!(snapshot.keys_created, 0);
    assert_eq!(snapshot.keys_failed, 1);
    assert_eq!(snapshot.state, BatchState::Completed);
}

#[tokio::test]
async fn blank_extraction_is_recorded_as_failed() {
    let fake = FakeModelServer::start().await;
    let (extractor, store, batches, _event_bus) = fixture(&fake);

    fake.push_text("   \n").await;

    let files = vec![png_file("SKE1_key.png")];
    let batch_id = register_batch(&batches, files.len()).await;

    extractor.run_batch(batch_id, files).await;

    let keys = store.list().await;
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].status, KeyStatus::Failed);
    assert_eq!(
        keys[0].failure_reason.as_deref(),
        Some("No content could be extracted from the document")
    );
    assert_eq!(fake.request_count().await, 1);
}

#[tokio::test]
async fn extraction_requests_use_the_fast_model() {
    let fake = FakeModelServer::start().await;
    let (extractor, _store, batches, _event_bus) = fixture(&fake);

    fake.push_text("1. A").await;

    let files = vec![png_file("SKE1_key.png")];
    let batch_id = register_batch(&batches, files.len()).await;

    extractor.run_batch(batch_id, files).await;

    let calls = fake.captured_requests().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model_call, "gemini-3-flash-preview:generateContent");
}
