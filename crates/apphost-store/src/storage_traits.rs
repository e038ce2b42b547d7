//! Storage trait definition for apphost
//!
//! `ContentStore` is the only shared mutable structure of a build. Builds for
//! different applications write into the same store concurrently while the
//! serving side reads from it.

use std::sync::Arc;

use crate::artifact::CachedArtifact;

/// Key → artifact cache.
///
/// Guarantees:
/// - `get(key)` returns either `None` or a complete artifact, never a partial one.
/// - `set(key, artifact)` replaces any previous value wholesale; last write wins.
/// - Entries are never evicted.
pub trait ContentStore: Send + Sync {
    /// Look up the artifact stored at `key`.
    fn get(&self, key: &str) -> Option<Arc<CachedArtifact>>;

    /// Check whether `key` is present.
    fn has(&self, key: &str) -> bool;

    /// Store `artifact` at `key`, replacing any previous value.
    fn set(&self, key: &str, artifact: Arc<CachedArtifact>);

    /// All keys, sorted.
    fn all_keys(&self) -> Vec<String>;

    /// Keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
