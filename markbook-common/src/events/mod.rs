//! Event types for the Markbook event system
//!
//! Provides shared event definitions and the EventBus used by the grading
//! service for SSE broadcasting.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Markbook event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarkbookEvent {
    /// A grading attempt started
    ///
    /// Triggers:
    /// - SSE: Show progress indicator for the attempt
    GradingAttemptStarted {
        /// Grading attempt UUID
        attempt_id: Uuid,
        /// Student being graded
        student_id: String,
        /// Course the exam belongs to
        course_id: String,
        /// When the attempt started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Grading attempt progress update
    ///
    /// Emitted at each pipeline stage transition (reading document,
    /// identifying code, matching key, grading).
    GradingProgressUpdate {
        /// Grading attempt UUID
        attempt_id: Uuid,
        /// Current attempt state
        state: String,
        /// Completed stage count
        current: usize,
        /// Total stage count
        total: usize,
        /// Progress percentage (0.0-100.0)
        percentage: f32,
        /// Current operation description
        current_operation: String,
        /// When progress updated
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Grading attempt completed successfully
    ///
    /// Triggers:
    /// - SSE: Present the graded session
    GradingAttemptCompleted {
        /// Grading attempt UUID
        attempt_id: Uuid,
        /// Ledger id of the persisted exam session
        session_id: Uuid,
        /// Overall score (0-100)
        score: f64,
        /// Attempt duration in seconds
        duration_seconds: u64,
        /// When the attempt completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Grading attempt failed
    ///
    /// Triggers:
    /// - SSE: Present the failure message so the operator can decide on a
    ///   manual retry
    GradingAttemptFailed {
        /// Grading attempt UUID
        attempt_id: Uuid,
        /// Stage in which the failure occurred
        stage: String,
        /// Failure description
        error: String,
        /// When the attempt failed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Grading attempt cancelled by the operator
    GradingAttemptCancelled {
        /// Grading attempt UUID
        attempt_id: Uuid,
        /// When the attempt was cancelled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Answer-key extraction batch started
    KeyExtractionStarted {
        /// Extraction batch UUID
        batch_id: Uuid,
        /// Number of files in the batch
        total_files: usize,
        /// When the batch started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Answer-key extraction batch progress update
    ///
    /// Emitted once per file, before the file's extraction call, so the
    /// progress display is deterministic (current index / total).
    KeyExtractionProgress {
        /// Extraction batch UUID
        batch_id: Uuid,
        /// 1-based index of the file being processed
        current: usize,
        /// Total file count
        total: usize,
        /// Name of the file being processed
        current_file: String,
        /// When progress updated
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Answer-key extraction batch finished
    ///
    /// Emitted after every file was attempted; failed files still yield
    /// registry entries, so `keys_created + keys_failed` equals the batch
    /// size.
    KeyExtractionCompleted {
        /// Extraction batch UUID
        batch_id: Uuid,
        /// Keys created with extracted content
        keys_created: usize,
        /// Keys created in failed/degraded state
        keys_failed: usize,
        /// Batch duration in seconds
        duration_seconds: u64,
        /// When the batch finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MarkbookEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            MarkbookEvent::GradingAttemptStarted { .. } => "GradingAttemptStarted",
            MarkbookEvent::GradingProgressUpdate { .. } => "GradingProgressUpdate",
            MarkbookEvent::GradingAttemptCompleted { .. } => "GradingAttemptCompleted",
            MarkbookEvent::GradingAttemptFailed { .. } => "GradingAttemptFailed",
            MarkbookEvent::GradingAttemptCancelled { .. } => "GradingAttemptCancelled",
            MarkbookEvent::KeyExtractionStarted { .. } => "KeyExtractionStarted",
            MarkbookEvent::KeyExtractionProgress { .. } => "KeyExtractionProgress",
            MarkbookEvent::KeyExtractionCompleted { .. } => "KeyExtractionCompleted",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use markbook_common::events::{EventBus, MarkbookEvent};
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let event_bus = Arc::new(EventBus::new(100));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit(MarkbookEvent::GradingAttemptStarted {
///     attempt_id: Uuid::new_v4(),
///     student_id: "s1".to_string(),
///     course_id: "c1".to_string(),
///     timestamp: chrono::Utc::now(),
/// }).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MarkbookEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MarkbookEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MarkbookEvent,
    ) -> Result<usize, broadcast::error::SendError<MarkbookEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Useful for progress events where it's acceptable if no component is
    /// currently listening.
    pub fn emit_lossy(&self, event: MarkbookEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    ///
    /// Useful for debugging and monitoring
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_progress_event(attempt_id: Uuid) -> MarkbookEvent {
        MarkbookEvent::GradingProgressUpdate {
            attempt_id,
            state: "IDENTIFYING_CODE".to_string(),
            current: 2,
            total: 4,
            percentage: 50.0,
            current_operation: "Identifying exam code...".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(10);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_eventbus_emit_delivers_to_subscribers() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let attempt_id = Uuid::new_v4();
        bus.emit(sample_progress_event(attempt_id)).expect("emit");

        let received = rx.recv().await.expect("receive");
        match received {
            MarkbookEvent::GradingProgressUpdate {
                attempt_id: id,
                current,
                total,
                ..
            } => {
                assert_eq!(id, attempt_id);
                assert_eq!(current, 2);
                assert_eq!(total, 4);
            }
            other => panic!("Wrong event type: {:?}", other),
        }
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(sample_progress_event(Uuid::new_v4())).is_err());

        // emit_lossy never errors
        bus.emit_lossy(sample_progress_event(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let attempt_id = Uuid::new_v4();
        bus.emit_lossy(MarkbookEvent::GradingAttemptCancelled {
            attempt_id,
            timestamp: Utc::now(),
        });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.expect("receive") {
                MarkbookEvent::GradingAttemptCancelled { attempt_id: id, .. } => {
                    assert_eq!(id, attempt_id)
                }
                other => panic!("Wrong event type: {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_type_names() {
        let attempt_id = Uuid::new_v4();
        assert_eq!(
            sample_progress_event(attempt_id).event_type(),
            "GradingProgressUpdate"
        );
        assert_eq!(
            MarkbookEvent::KeyExtractionCompleted {
                batch_id: Uuid::new_v4(),
                keys_created: 2,
                keys_failed: 1,
                duration_seconds: 3,
                timestamp: Utc::now(),
            }
            .event_type(),
            "KeyExtractionCompleted"
        );
    }

    #[test]
    fn test_event_serialization_uses_type_tag() {
        let event = MarkbookEvent::KeyExtractionProgress {
            batch_id: Uuid::new_v4(),
            current: 1,
            total: 3,
            current_file: "SKE1_starters.pdf".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"KeyExtractionProgress\""));
        assert!(json.contains("\"current_file\":\"SKE1_starters.pdf\""));

        let deserialized: MarkbookEvent = serde_json::from_str(&json).expect("deserialize");
        match deserialized {
            MarkbookEvent::KeyExtractionProgress { current, total, .. } => {
                assert_eq!(current, 1);
                assert_eq!(total, 3);
            }
            other => panic!("Wrong event type deserialized: {:?}", other),
        }
    }
}
