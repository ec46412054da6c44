//! Grading attempt registry
//!
//! Tracks every grading attempt by id so status polling works while the
//! pipeline runs and after it finishes. The registry is the authoritative
//! record; SSE events are a lossy convenience layer on top.

use crate::models::GradingAttempt;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory registry of grading attempts
pub struct AttemptRegistry {
    attempts: RwLock<HashMap<Uuid, GradingAttempt>>,
}

impl AttemptRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or update an attempt snapshot.
    pub async fn save(&self, attempt: GradingAttempt) {
        self.attempts
            .write()
            .await
            .insert(attempt.attempt_id, attempt);
    }

    /// Look up one attempt by id.
    pub async fn get(&self, attempt_id: Uuid) -> Option<GradingAttempt> {
        self.attempts.read().await.get(&attempt_id).cloned()
    }

    /// All known attempts, most recently started first.
    pub async fn list(&self) -> Vec<GradingAttempt> {
        let mut attempts: Vec<GradingAttempt> =
            self.attempts.read().await.values().cloned().collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        attempts
    }
}

impl Default for AttemptRegistry {
    fn default() -> Self {
        Self::new()
    }
}
