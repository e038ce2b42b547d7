//! In-memory `ContentStore` backed by a `HashMap<key, Arc<artifact>>`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::artifact::CachedArtifact;
use crate::storage_traits::ContentStore;

/// In-memory store. Values are `Arc`s so a whole artifact is swapped in one
/// pointer write under the lock.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: RwLock<HashMap<String, Arc<CachedArtifact>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding every entry of `previous`.
    ///
    /// Artifacts are shared, not copied.
    pub fn seeded_from(previous: &dyn ContentStore) -> Self {
        let mut entries = HashMap::with_capacity(previous.len());
        for key in previous.all_keys() {
            if let Some(artifact) = previous.get(&key) {
                entries.insert(key, artifact);
            }
        }
        tracing::debug!(entries = entries.len(), "seeded content store");
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl ContentStore for MemoryContentStore {
    fn get(&self, key: &str) -> Option<Arc<CachedArtifact>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn has(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }

    fn set(&self, key: &str, artifact: Arc<CachedArtifact>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), artifact);
    }

    fn all_keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
