//! Process-wide pipeline counters.
//!
//! Incremented at the call site with relaxed ordering; [`Metrics::flush`]
//! reports them as one `info!` event after each build.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    files_cached: AtomicU64,
    file_failures: AtomicU64,
    documents_rendered: AtomicU64,
    builds_published: AtomicU64,
    pages_served: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            files_cached: AtomicU64::new(0),
            file_failures: AtomicU64::new(0),
            documents_rendered: AtomicU64::new(0),
            builds_published: AtomicU64::new(0),
            pages_served: AtomicU64::new(0),
        }
    }

    pub fn inc_files_cached(&self) {
        self.files_cached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_file_failures(&self) {
        self.file_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_documents_rendered(&self) {
        self.documents_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_builds_published(&self) {
        self.builds_published.fetch_add(1, Ordering::Relaxed);
    }

    /// One SSG pass served.
    pub fn inc_pages_served(&self) {
        self.pages_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            files_cached = self.files_cached(),
            file_failures = self.file_failures(),
            documents_rendered = self.documents_rendered(),
            builds_published = self.builds_published(),
            pages_served = self.pages_served(),
        );
    }

    pub fn files_cached(&self) -> u64 {
        self.files_cached.load(Ordering::Relaxed)
    }

    pub fn file_failures(&self) -> u64 {
        self.file_failures.load(Ordering::Relaxed)
    }

    pub fn documents_rendered(&self) -> u64 {
        self.documents_rendered.load(Ordering::Relaxed)
    }

    pub fn builds_published(&self) -> u64 {
        self.builds_published.load(Ordering::Relaxed)
    }

    pub fn pages_served(&self) -> u64 {
        self.pages_served.load(Ordering::Relaxed)
    }
}
