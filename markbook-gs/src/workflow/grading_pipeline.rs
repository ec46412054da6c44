//! Grading workflow pipeline
//!
//! Coordinates a grading attempt through all states:
//! READING_DOCUMENT → IDENTIFYING_CODE → MATCHING_KEY → GRADING → COMPLETED
//!
//! Cancellation is checked between stages; a cancelled attempt is marked
//! and abandoned without touching the session ledger. Failures stop the
//! attempt at the failing stage with no retry.

use crate::models::{
    AnswerKey, AttemptState, ExamDocument, ExamSession, GradingAttempt,
};
use crate::services::grading_client::{GradingClient, IdentificationOutcome};
use crate::services::key_matcher;
use crate::stores::{AnswerKeyStore, AttemptRegistry, SessionLedger};
use chrono::Utc;
use markbook_common::events::{EventBus, MarkbookEvent};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const TOTAL_STAGES: usize = 4;

/// Grading pipeline service
pub struct GradingPipeline {
    client: Arc<GradingClient>,
    answer_keys: Arc<AnswerKeyStore>,
    ledger: Arc<SessionLedger>,
    attempts: Arc<AttemptRegistry>,
    event_bus: EventBus,
}

impl GradingPipeline {
    pub fn new(
        client: Arc<GradingClient>,
        answer_keys: Arc<AnswerKeyStore>,
        ledger: Arc<SessionLedger>,
        attempts: Arc<AttemptRegistry>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            client,
            answer_keys,
            ledger,
            attempts,
            event_bus,
        }
    }

    /// Execute a complete grading attempt.
    ///
    /// Always returns the attempt in a terminal state; the registry holds
    /// the same snapshot for status polling.
    pub async fn execute(
        &self,
        mut attempt: GradingAttempt,
        document: ExamDocument,
        cancel_token: CancellationToken,
    ) -> GradingAttempt {
        let start_time = std::time::Instant::now();

        info!(
            attempt_id = %attempt.attempt_id,
            student_id = %attempt.student_id,
            course_id = %attempt.course_id,
            "Starting grading attempt"
        );

        self.event_bus.emit_lossy(MarkbookEvent::GradingAttemptStarted {
            attempt_id: attempt.attempt_id,
            student_id: attempt.student_id.clone(),
            course_id: attempt.course_id.clone(),
            timestamp: Utc::now(),
        });

        // Stage 1: READING_DOCUMENT - Verify the payload
        if let Err(e) = self.stage_reading(&mut attempt, &document).await {
            return self.fail_attempt(attempt, e).await;
        }
        if cancel_token.is_cancelled() {
            return self.cancel_attempt(attempt).await;
        }

        // Stage 2: IDENTIFYING_CODE - Find the exam-variant code
        let outcome = self.stage_identifying(&mut attempt, &document).await;
        if cancel_token.is_cancelled() {
            return self.cancel_attempt(attempt).await;
        }

        // Stage 3: MATCHING_KEY - Resolve the answer key
        let matched_key = match self.stage_matching(&mut attempt, &outcome).await {
            Ok(key) => key,
            Err(e) => return self.fail_attempt(attempt, e).await,
        };
        if cancel_token.is_cancelled() {
            return self.cancel_attempt(attempt).await;
        }

        // Stage 4: GRADING - Model call and report parsing
        let report = match self.stage_grading(&mut attempt, &document, &matched_key).await {
            Ok(report) => report,
            Err(e) => return self.fail_attempt(attempt, e).await,
        };

        // A cancel that lands during grading discards the result; nothing
        // reaches the ledger after cancellation
        if cancel_token.is_cancelled() {
            return self.cancel_attempt(attempt).await;
        }

        // COMPLETED - Record the session
        let session = ExamSession::from_report(
            attempt.student_id.clone(),
            attempt.student_name.clone(),
            attempt.course_id.clone(),
            report,
        );
        let session_id = session.id;
        let score = session.score;
        self.ledger.append(session).await;

        attempt.session_id = Some(session_id);
        attempt.transition_to(AttemptState::Completed);
        attempt.update_progress(
            TOTAL_STAGES,
            TOTAL_STAGES,
            "Grading completed successfully".to_string(),
        );
        self.attempts.save(attempt.clone()).await;

        let duration_seconds = start_time.elapsed().as_secs();

        info!(
            attempt_id = %attempt.attempt_id,
            session_id = %session_id,
            score = score,
            duration_seconds,
            "Grading attempt completed"
        );

        self.event_bus.emit_lossy(MarkbookEvent::GradingAttemptCompleted {
            attempt_id: attempt.attempt_id,
            session_id,
            score,
            duration_seconds,
            timestamp: Utc::now(),
        });

        attempt
    }

    /// Stage 1: READING_DOCUMENT
    ///
    /// Re-verifies the payload (the API already intake-validated it) and
    /// fails fast when no API key is configured, before any model call.
    async fn stage_reading(
        &self,
        attempt: &mut GradingAttempt,
        document: &ExamDocument,
    ) -> Result<(), String> {
        attempt.transition_to(AttemptState::ReadingDocument);
        attempt.update_progress(1, TOTAL_STAGES, "Reading exam document...".to_string());
        self.attempts.save(attempt.clone()).await;
        self.broadcast_progress(attempt);

        if !self.client.has_api_key() {
            return Err("API key not configured".to_string());
        }

        let bytes = document.verify_content().map_err(|e| e.to_string())?;
        debug!(
            attempt_id = %attempt.attempt_id,
            bytes = bytes.len(),
            mime_type = %document.mime_type,
            "Document verified"
        );
        Ok(())
    }

    /// Stage 2: IDENTIFYING_CODE
    ///
    /// Identification never fails the attempt; an unreadable or absent
    /// code flows into matching under the sentinel label.
    async fn stage_identifying(
        &self,
        attempt: &mut GradingAttempt,
        document: &ExamDocument,
    ) -> IdentificationOutcome {
        attempt.transition_to(AttemptState::IdentifyingCode);
        attempt.update_progress(2, TOTAL_STAGES, "Identifying exam code...".to_string());
        self.attempts.save(attempt.clone()).await;
        self.broadcast_progress(attempt);

        let outcome = self.client.identify_exam_code(document).await;
        match &outcome {
            IdentificationOutcome::Identified(code) => {
                info!(attempt_id = %attempt.attempt_id, code = %code, "Exam code identified");
                attempt.detected_code = Some(code.clone());
            }
            IdentificationOutcome::Unidentified => {
                info!(attempt_id = %attempt.attempt_id, "No exam code visible on paper");
            }
            IdentificationOutcome::Failed(reason) => {
                warn!(
                    attempt_id = %attempt.attempt_id,
                    "Exam code identification failed, continuing unidentified: {}",
                    reason
                );
            }
        }
        outcome
    }

    /// Stage 3: MATCHING_KEY
    async fn stage_matching(
        &self,
        attempt: &mut GradingAttempt,
        outcome: &IdentificationOutcome,
    ) -> Result<AnswerKey, String> {
        let label = outcome.label().to_string();

        attempt.transition_to(AttemptState::MatchingKey);
        attempt.update_progress(
            3,
            TOTAL_STAGES,
            format!("Matching answer key for exam code: {}...", label),
        );
        self.attempts.save(attempt.clone()).await;
        self.broadcast_progress(attempt);

        let keys = self.answer_keys.list().await;
        match key_matcher::find_match(&label, &keys) {
            Some(key) if key.is_ready() => {
                info!(
                    attempt_id = %attempt.attempt_id,
                    key_id = %key.id,
                    key_name = %key.name,
                    "Answer key matched"
                );
                attempt.matched_key_id = Some(key.id);
                attempt.matched_key_name = Some(key.name.clone());
                Ok(key.clone())
            }
            Some(key) => {
                let reason = key
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "extraction failed".to_string());
                Err(format!(
                    "Answer key '{}' matched exam code {} but has no usable content ({}); re-upload the key",
                    key.name, label, reason
                ))
            }
            None => {
                let suggestion = key_matcher::nearest_code(&label, &keys)
                    .map(|code| format!(" Closest known code: {}.", code))
                    .unwrap_or_default();
                Err(format!(
                    "No answer key matched exam code: {}.{}",
                    label, suggestion
                ))
            }
        }
    }

    /// Stage 4: GRADING
    async fn stage_grading(
        &self,
        attempt: &mut GradingAttempt,
        document: &ExamDocument,
        key: &AnswerKey,
    ) -> Result<crate::models::GradeReport, String> {
        attempt.transition_to(AttemptState::Grading);
        attempt.update_progress(
            4,
            TOTAL_STAGES,
            format!("Grading with answer key: {}...", key.name),
        );
        self.attempts.save(attempt.clone()).await;
        self.broadcast_progress(attempt);

        self.client
            .grade_exam(document, &key.content)
            .await
            .map_err(|e| e.to_string())
    }

    /// Mark an attempt failed at its current stage.
    async fn fail_attempt(&self, mut attempt: GradingAttempt, error: String) -> GradingAttempt {
        let stage = attempt.state;

        error!(
            attempt_id = %attempt.attempt_id,
            stage = stage.as_str(),
            "Grading attempt failed: {}",
            error
        );

        attempt.error = Some(error.clone());
        attempt.transition_to(AttemptState::Failed);
        self.attempts.save(attempt.clone()).await;

        self.event_bus.emit_lossy(MarkbookEvent::GradingAttemptFailed {
            attempt_id: attempt.attempt_id,
            stage: stage.as_str().to_string(),
            error,
            timestamp: Utc::now(),
        });

        attempt
    }

    /// Mark an attempt cancelled and abandon it.
    async fn cancel_attempt(&self, mut attempt: GradingAttempt) -> GradingAttempt {
        info!(attempt_id = %attempt.attempt_id, "Grading attempt cancelled");

        attempt.transition_to(AttemptState::Cancelled);
        self.attempts.save(attempt.clone()).await;

        self.event_bus.emit_lossy(MarkbookEvent::GradingAttemptCancelled {
            attempt_id: attempt.attempt_id,
            timestamp: Utc::now(),
        });

        attempt
    }

    fn broadcast_progress(&self, attempt: &GradingAttempt) {
        self.event_bus.emit_lossy(MarkbookEvent::GradingProgressUpdate {
            attempt_id: attempt.attempt_id,
            state: attempt.state.as_str().to_string(),
            current: attempt.progress.current,
            total: attempt.progress.total,
            percentage: attempt.progress.percentage as f32,
            current_operation: attempt.progress.current_operation.clone(),
            timestamp: Utc::now(),
        });
    }
}
