//! Answer key registry store
//!
//! Owns all `AnswerKey` records. Iteration order is newest-first: new keys
//! are inserted at the front, and the matcher takes the first containment
//! hit, so recently uploaded keys win ties.

use crate::models::AnswerKey;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory answer key registry
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct AnswerKeyStore {
    keys: RwLock<Vec<AnswerKey>>,
}

impl AnswerKeyStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(Vec::new()),
        }
    }

    /// Insert a key at the front of the registry.
    pub async fn insert(&self, key: AnswerKey) {
        self.keys.write().await.insert(0, key);
    }

    /// Delete a key by id. Returns false when no key matched.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut keys = self.keys.write().await;
        let before = keys.len();
        keys.retain(|k| k.id != id);
        keys.len() != before
    }

    /// Replace the entire registry contents, preserving the given order.
    pub async fn replace_all(&self, new_keys: Vec<AnswerKey>) {
        *self.keys.write().await = new_keys;
    }

    /// Snapshot of all keys in registry order (newest first).
    pub async fn list(&self) -> Vec<AnswerKey> {
        self.keys.read().await.clone()
    }

    /// Look up one key by id.
    pub async fn get(&self, id: Uuid) -> Option<AnswerKey> {
        self.keys.read().await.iter().find(|k| k.id == id).cloned()
    }

    /// Number of keys in the registry.
    pub async fn count(&self) -> usize {
        self.keys.read().await.len()
    }
}

impl Default for AnswerKeyStore {
    fn default() -> Self {
        Self::new()
    }
}
