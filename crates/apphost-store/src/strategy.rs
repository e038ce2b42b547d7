use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::memory::MemoryContentStore;
use crate::storage_traits::ContentStore;

/// Store implementation selected at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    #[default]
    InMemory,
}

impl CacheStrategy {
    /// Parse a configured strategy name. Unknown names fall back to `InMemory`.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "in-memory" | "memory" => CacheStrategy::InMemory,
            other => {
                tracing::warn!(strategy = %other, "unknown cache strategy, using in-memory");
                CacheStrategy::InMemory
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CacheStrategy::InMemory => "in-memory",
        }
    }

    /// Create an empty store.
    pub fn create(&self) -> Arc<dyn ContentStore> {
        match self {
            CacheStrategy::InMemory => Arc::new(MemoryContentStore::new()),
        }
    }

    /// Create a store holding every entry of `previous`.
    pub fn create_seeded(&self, previous: &dyn ContentStore) -> Arc<dyn ContentStore> {
        match self {
            CacheStrategy::InMemory => Arc::new(MemoryContentStore::seeded_from(previous)),
        }
    }
}

impl std::fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(CacheStrategy::from_name("in-memory"), CacheStrategy::InMemory);
        assert_eq!(CacheStrategy::from_name("redis"), CacheStrategy::InMemory);
    }

    #[test]
    fn test_serde_name() {
        let json = serde_json::to_string(&CacheStrategy::InMemory).unwrap();
        assert_eq!(json, "\"in-memory\"");
    }
}
