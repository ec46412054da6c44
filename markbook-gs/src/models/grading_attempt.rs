//! Grading workflow state machine
//!
//! A grading attempt progresses through 4 defined stages:
//! READING_DOCUMENT → IDENTIFYING_CODE → MATCHING_KEY → GRADING → COMPLETED

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grading workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    /// Payload verification, content sniffing
    ReadingDocument,
    /// Fast-model pass to find the exam-variant code
    IdentifyingCode,
    /// Registry lookup by detected code
    MatchingKey,
    /// Grading-model call and report parsing
    Grading,
    /// Attempt finished, session recorded
    Completed,
    /// Attempt cancelled by user
    Cancelled,
    /// Attempt failed with an error
    Failed,
}

impl AttemptState {
    /// Wire name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::ReadingDocument => "READING_DOCUMENT",
            AttemptState::IdentifyingCode => "IDENTIFYING_CODE",
            AttemptState::MatchingKey => "MATCHING_KEY",
            AttemptState::Grading => "GRADING",
            AttemptState::Completed => "COMPLETED",
            AttemptState::Cancelled => "CANCELLED",
            AttemptState::Failed => "FAILED",
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub attempt_id: Uuid,
    pub old_state: AttemptState,
    pub new_state: AttemptState,
    pub transitioned_at: DateTime<Utc>,
}

/// Stage progress tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptProgress {
    /// Stages completed or in progress so far
    pub current: usize,

    /// Total stages in the workflow
    pub total: usize,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: f64,

    /// Current operation description
    pub current_operation: String,

    /// Elapsed time (seconds)
    pub elapsed_seconds: u64,
}

/// One grading attempt (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingAttempt {
    /// Unique attempt identifier
    pub attempt_id: Uuid,

    /// Current workflow state
    pub state: AttemptState,

    /// Student being graded
    pub student_id: String,
    pub student_name: String,
    pub course_id: String,

    /// Filename of the uploaded paper, when provided
    pub document_name: Option<String>,

    /// Raw exam code reported by the identifier, once known
    pub detected_code: Option<String>,

    /// Matched answer key, once resolved
    pub matched_key_id: Option<Uuid>,
    pub matched_key_name: Option<String>,

    /// Ledger session created on completion
    pub session_id: Option<Uuid>,

    /// Progress tracking
    pub progress: AttemptProgress,

    /// Failure description for FAILED attempts
    pub error: Option<String>,

    /// Attempt start time
    pub started_at: DateTime<Utc>,

    /// Attempt end time (if completed/cancelled/failed)
    pub ended_at: Option<DateTime<Utc>>,
}

impl GradingAttempt {
    /// Create a new attempt in the initial state.
    pub fn new(
        student_id: String,
        student_name: String,
        course_id: String,
        document_name: Option<String>,
    ) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            state: AttemptState::ReadingDocument,
            student_id,
            student_name,
            course_id,
            document_name,
            detected_code: None,
            matched_key_id: None,
            matched_key_name: None,
            session_id: None,
            progress: AttemptProgress::default(),
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state.
    pub fn transition_to(&mut self, new_state: AttemptState) -> StateTransition {
        let transition = StateTransition {
            attempt_id: self.attempt_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        // Set end time for terminal states
        match new_state {
            AttemptState::Completed | AttemptState::Cancelled | AttemptState::Failed => {
                self.ended_at = Some(Utc::now());
            }
            _ => {}
        }

        transition
    }

    /// Update stage progress.
    pub fn update_progress(&mut self, current: usize, total: usize, operation: String) {
        self.progress.current = current;
        self.progress.total = total;
        self.progress.percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        self.progress.current_operation = operation;
        self.progress.elapsed_seconds = (Utc::now() - self.started_at).num_seconds() as u64;
    }

    /// Check if the attempt is terminal (finished).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            AttemptState::Completed | AttemptState::Cancelled | AttemptState::Failed
        )
    }
}

impl Default for AttemptProgress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 4,
            percentage: 0.0,
            current_operation: String::from("Queued"),
            elapsed_seconds: 0,
        }
    }
}
