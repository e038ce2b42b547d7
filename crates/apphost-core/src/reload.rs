//! Hot-Reload Scheduler
//!
//! One task owned by a [`ReloadHandle`]. Each tick re-fetches the manifest,
//! diffs it against the published index, and rebuilds through the
//! [`Renderer`] when any application was added, removed or re-versioned.
//! The published snapshot only changes once the rebuild is complete.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::{AppsMap, ManifestDelta};
use crate::facade::Renderer;
use crate::obs;
use crate::orchestrator::BuildReport;

/// Scheduler state, observable through [`HotReloader::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Polling,
    Unchanged,
    Rebuilding,
}

/// Result of one tick.
#[derive(Debug)]
pub enum ReloadOutcome {
    Unchanged,
    Rebuilt { delta: ManifestDelta, report: BuildReport },
    /// The manifest could not be fetched; treated as no change.
    Skipped { error: String },
}

pub struct HotReloader {
    renderer: Renderer,
    interval: Duration,
    state: watch::Sender<ReloadState>,
}

impl HotReloader {
    pub fn new(renderer: Renderer, interval: Duration) -> Self {
        let (state, _) = watch::channel(ReloadState::Idle);
        HotReloader {
            renderer,
            interval: interval.max(Duration::from_millis(1)),
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<ReloadState> {
        self.state.subscribe()
    }

    /// Poll once and rebuild if the manifest changed.
    pub async fn tick(&self) -> ReloadOutcome {
        self.state.send_replace(ReloadState::Polling);
        let active = self.renderer.snapshot();
        obs::emit_reload_tick(active.apps.len());

        let apps = match self.renderer.origin().fetch_manifest().await {
            Ok(apps) => apps,
            Err(err) => {
                obs::emit_reload_skipped(&err);
                self.state.send_replace(ReloadState::Idle);
                return ReloadOutcome::Skipped {
                    error: err.to_string(),
                };
            }
        };

        let delta = ManifestDelta::between(&active.apps, &AppsMap::from_apps(&apps));
        if delta.is_empty() {
            self.state.send_replace(ReloadState::Unchanged);
            self.state.send_replace(ReloadState::Idle);
            return ReloadOutcome::Unchanged;
        }

        obs::emit_reload_changed(delta.added.len(), delta.removed.len(), delta.updated.len());
        self.state.send_replace(ReloadState::Rebuilding);
        let report = self.renderer.rebuild_with(apps).await;
        self.state.send_replace(ReloadState::Idle);

        ReloadOutcome::Rebuilt { delta, report }
    }

    /// Run the polling loop on its own task. The first poll happens one
    /// interval from now.
    pub fn spawn(self) -> ReloadHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let state = self.state();
        let task = tokio::spawn(self.run(shutdown_rx));
        ReloadHandle {
            shutdown,
            state,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("hot reload stopped");
    }
}

/// Owner of a running scheduler task.
pub struct ReloadHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ReloadState>,
    task: JoinHandle<()>,
}

impl ReloadHandle {
    pub fn state(&self) -> watch::Receiver<ReloadState> {
        self.state.clone()
    }

    /// Stop polling. An in-flight rebuild is allowed to finish.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "hot reload task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use apphost_origin::{App, MemoryOrigin};

    use crate::config::RenderConfig;

    fn chat_origin() -> Arc<MemoryOrigin> {
        let origin = Arc::new(MemoryOrigin::new());
        origin.set_manifest(vec![App::script("chat", "1", "widgets/chat", "/widgets/chat.js")]);
        origin.put_file("widgets/chat/1", "text/javascript", "v1");
        origin.put_file("widgets/chat/2", "text/javascript", "v2");
        origin
    }

    #[tokio::test]
    async fn test_unchanged_manifest_does_not_rebuild() {
        let origin = chat_origin();
        let (renderer, _) = Renderer::init(origin, RenderConfig::default()).await.unwrap();
        let reloader = HotReloader::new(renderer.clone(), Duration::from_secs(60));

        assert!(matches!(reloader.tick().await, ReloadOutcome::Unchanged));
        assert_eq!(renderer.snapshot().generation, 1);
        assert_eq!(*reloader.state().borrow(), ReloadState::Idle);
    }

    #[tokio::test]
    async fn test_version_change_rebuilds() {
        let origin = chat_origin();
        let (renderer, _) = Renderer::init(origin.clone(), RenderConfig::default()).await.unwrap();
        origin.set_manifest(vec![App::script("chat", "2", "widgets/chat", "/widgets/chat.js")]);

        let reloader = HotReloader::new(renderer.clone(), Duration::from_secs(60));
        match reloader.tick().await {
            ReloadOutcome::Rebuilt { delta, report } => {
                assert_eq!(delta.updated.len(), 1);
                assert_eq!(report.files_cached(), 1);
            }
            other => panic!("expected rebuild, got {other:?}"),
        }
        assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("v2"));
        assert_eq!(renderer.list_application_names(), vec!["chat".to_string()]);
    }

    #[tokio::test]
    async fn test_manifest_outage_is_no_change() {
        let origin = chat_origin();
        let (renderer, _) = Renderer::init(origin.clone(), RenderConfig::default()).await.unwrap();
        origin.take_manifest_down();

        let reloader = HotReloader::new(renderer.clone(), Duration::from_secs(60));
        assert!(matches!(reloader.tick().await, ReloadOutcome::Skipped { .. }));
        assert_eq!(renderer.snapshot().generation, 1);
        assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("v1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_picks_up_change_and_stops() {
        let origin = chat_origin();
        let (renderer, _) = Renderer::init(origin.clone(), RenderConfig::default()).await.unwrap();
        let handle = renderer.start_hot_reload(Duration::from_secs(30));

        origin.set_manifest(vec![App::script("chat", "2", "widgets/chat", "/widgets/chat.js")]);
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(10)).await;
            if renderer.snapshot().generation == 2 {
                break;
            }
        }

        assert_eq!(renderer.snapshot().generation, 2);
        assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("v2"));
        handle.stop().await;
    }
}
