//! Grading session ledger
//!
//! Append-only record of graded exams. Sessions are never updated or
//! deleted; queries return snapshots sorted newest-first.

use crate::models::ExamSession;
use tokio::sync::RwLock;

/// In-memory append-only session ledger
pub struct SessionLedger {
    sessions: RwLock<Vec<ExamSession>>,
}

impl SessionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
        }
    }

    /// Append a completed session to the ledger.
    pub async fn append(&self, session: ExamSession) {
        self.sessions.write().await.push(session);
    }

    /// All sessions, newest first.
    pub async fn list(&self) -> Vec<ExamSession> {
        let mut sessions = self.sessions.read().await.clone();
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        sessions
    }

    /// One student's sessions, newest first.
    pub async fn for_student(&self, student_id: &str) -> Vec<ExamSession> {
        let mut sessions: Vec<ExamSession> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        sessions
    }

    /// Number of recorded sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionLedger {
    fn default() -> Self {
        Self::new()
    }
}
