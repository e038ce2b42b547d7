//! Structured lifecycle events for builds and hot reload.
//!
//! Every event carries an `event` field (`build.started`, `app.cached`,
//! `file.failed`, `reload.tick`, ...) so log pipelines can filter on it.

use tracing::{info, warn};

/// Span tagged with the application being built. Attach it to the build
/// future with `Instrument::instrument`.
pub fn app_span(name: &str, version: &str) -> tracing::Span {
    tracing::info_span!("apphost.app", app = %name, version = %version)
}

pub fn emit_build_started(apps: usize) {
    info!(event = "build.started", apps = apps);
}

pub fn emit_build_finished(apps: usize, files_cached: usize, failures: usize, duration_ms: u64) {
    info!(
        event = "build.finished",
        apps = apps,
        files_cached = files_cached,
        failures = failures,
        duration_ms = duration_ms,
    );
}

pub fn emit_app_cached(name: &str, version: &str, files_cached: usize, failures: usize) {
    info!(
        event = "app.cached",
        app = %name,
        version = %version,
        files_cached = files_cached,
        failures = failures,
    );
}

/// Application-level failure; sibling applications keep building.
pub fn emit_app_failed(name: &str, version: &str, error: &dyn std::fmt::Display) {
    warn!(event = "app.failed", app = %name, version = %version, error = %error);
}

/// File- or reference-level failure.
pub fn emit_file_failed(app: &str, path: &str, error: &dyn std::fmt::Display) {
    warn!(event = "file.failed", app = %app, path = %path, error = %error);
}

pub fn emit_reload_tick(active_apps: usize) {
    info!(event = "reload.tick", active_apps = active_apps);
}

pub fn emit_reload_changed(added: usize, removed: usize, updated: usize) {
    info!(
        event = "reload.changed",
        added = added,
        removed = removed,
        updated = updated,
    );
}

/// Manifest could not be fetched; the tick counts as "no change".
pub fn emit_reload_skipped(error: &dyn std::fmt::Display) {
    warn!(event = "reload.skipped", error = %error);
}

pub fn emit_snapshot_published(generation: u64, apps: usize, entries: usize) {
    info!(
        event = "snapshot.published",
        generation = generation,
        apps = apps,
        entries = entries,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_span_create() {
        let span = app_span("shop", "1.0.0");
        let _entered = span.enter();
    }
}
