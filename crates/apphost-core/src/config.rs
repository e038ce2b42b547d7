//! Pipeline configuration.

use apphost_store::CacheStrategy;
use serde::{Deserialize, Serialize};

use crate::rewrite::minify::MinifyOptions;
use crate::rewrite::vendor::DEFAULT_DEPENDENCY_PATH;

pub const DEPENDENCY_PATH_ENV: &str = "APPHOST_DEPENDENCY_PATH";
pub const CACHE_STRATEGY_ENV: &str = "APPHOST_CACHE_STRATEGY";

/// How builds rewrite and where they store results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Shared namespace for vendor files, e.g. `/@node_modules`
    pub dependency_path: String,
    pub cache_strategy: CacheStrategy,
    pub minify: MinifyOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dependency_path: DEFAULT_DEPENDENCY_PATH.to_string(),
            cache_strategy: CacheStrategy::default(),
            minify: MinifyOptions::default(),
        }
    }
}

impl RenderConfig {
    /// Defaults overridden by `APPHOST_DEPENDENCY_PATH` and
    /// `APPHOST_CACHE_STRATEGY` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(DEPENDENCY_PATH_ENV) {
            config.dependency_path = path;
        }
        if let Ok(name) = std::env::var(CACHE_STRATEGY_ENV) {
            config.cache_strategy = CacheStrategy::from_name(&name);
        }
        config
    }

    pub fn with_dependency_path(mut self, path: &str) -> Self {
        self.dependency_path = path.to_string();
        self
    }

    pub fn with_cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    pub fn with_minify(mut self, minify: MinifyOptions) -> Self {
        self.minify = minify;
        self
    }
}
