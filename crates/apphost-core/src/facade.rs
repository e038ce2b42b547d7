//! Serving Facade
//!
//! `Renderer` owns the published snapshot: the application index and the
//! store generation built for it, swapped together as one `Arc`. Readers load
//! the snapshot once per lookup and never see a half-built generation.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use apphost_origin::{Apps, OriginClient};
use apphost_store::{CachedArtifact, ContentStore};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::auth::AppsListener;
use crate::config::RenderConfig;
use crate::domain::{AppsMap, ParseError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::orchestrator::{BuildOrchestrator, BuildReport};
use crate::paths::app_root;
use crate::reload::{HotReloader, ReloadHandle};
use crate::rewrite::ssg::{render_page, RenderedPage, RequestContext};

/// Application index and the store generation built for it.
pub struct Snapshot {
    pub apps: AppsMap,
    pub store: Arc<dyn ContentStore>,
    /// Incremented on every publish; 0 before the first build.
    pub generation: u64,
    pub built_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("apps", &self.apps.names())
            .field("entries", &self.store.len())
            .field("generation", &self.generation)
            .field("built_at", &self.built_at)
            .finish()
    }
}

struct Inner {
    origin: Arc<dyn OriginClient>,
    config: RenderConfig,
    current: ArcSwap<Snapshot>,
    build_lock: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn AppsListener>>>,
}

/// Entry point for the HTTP layer. Cheap to clone.
#[derive(Clone)]
pub struct Renderer {
    inner: Arc<Inner>,
}

impl Renderer {
    /// Renderer with an empty index and store.
    pub fn new(origin: Arc<dyn OriginClient>, config: RenderConfig) -> Self {
        let snapshot = Snapshot {
            apps: AppsMap::new(),
            store: config.cache_strategy.create(),
            generation: 0,
            built_at: None,
        };
        Renderer {
            inner: Arc::new(Inner {
                origin,
                config,
                current: ArcSwap::from_pointee(snapshot),
                build_lock: Mutex::new(()),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Fetch the manifest and build every application in it.
    pub async fn init(origin: Arc<dyn OriginClient>, config: RenderConfig) -> Result<(Self, BuildReport)> {
        let renderer = Self::new(origin, config);
        let apps = renderer.inner.origin.fetch_manifest().await?;
        let report = renderer.rebuild_with(apps).await;
        Ok((renderer, report))
    }

    pub fn config(&self) -> &RenderConfig {
        &self.inner.config
    }

    pub fn origin(&self) -> &Arc<dyn OriginClient> {
        &self.inner.origin
    }

    /// Currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.current.load_full()
    }

    pub fn has_application(&self, name: &str, version: Option<&str>) -> bool {
        self.get_application(name, version).is_some()
    }

    /// Primary document of `name` at `version`, or at its current version.
    pub fn get_application(&self, name: &str, version: Option<&str>) -> Option<Arc<CachedArtifact>> {
        let snapshot = self.inner.current.load();
        let version = match version {
            Some(version) => version,
            None => snapshot.apps.get(name)?.version.as_str(),
        };
        snapshot.store.get(&app_root(name, version))
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.inner.current.load().store.has(key)
    }

    pub fn get_file(&self, key: &str) -> Option<Arc<CachedArtifact>> {
        self.inner.current.load().store.get(key)
    }

    pub fn list_application_names(&self) -> Vec<String> {
        self.inner.current.load().apps.names()
    }

    /// Keys cached under the shared dependency namespace.
    pub fn dependency_keys(&self) -> Vec<String> {
        let prefix = format!("{}/", self.inner.config.dependency_path.trim_end_matches('/'));
        self.inner.current.load().store.keys_with_prefix(&prefix)
    }

    /// Look up the primary document and run the request-time pass over it.
    pub fn render(
        &self,
        name: &str,
        version: Option<&str>,
        request: &RequestContext,
    ) -> std::result::Result<Option<RenderedPage>, ParseError> {
        let Some(artifact) = self.get_application(name, version) else {
            return Ok(None);
        };
        let html = artifact
            .text()
            .ok_or_else(|| ParseError::Html(format!("document for {name} is not valid UTF-8")))?;
        let page = render_page(html, request)?;
        METRICS.inc_pages_served();
        Ok(Some(page))
    }

    /// Register a listener and call it with the current names.
    pub fn subscribe(&self, listener: Arc<dyn AppsListener>) {
        listener.on_rebuild(&self.list_application_names());
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Rebuild the applications of the current index.
    pub async fn run_full_build(&self) -> BuildReport {
        let apps: Apps = self.snapshot().apps.apps().cloned().collect();
        self.rebuild_with(apps).await
    }

    /// Build `apps` into a new store generation seeded from the current one,
    /// then publish index and store together. Builds are serialized.
    pub async fn rebuild_with(&self, apps: Apps) -> BuildReport {
        let _guard = self.inner.build_lock.lock().await;

        let previous = self.snapshot();
        let store = self
            .inner
            .config
            .cache_strategy
            .create_seeded(previous.store.as_ref());
        let builder = BuildOrchestrator::new(
            Arc::clone(&self.inner.origin),
            Arc::clone(&store),
            self.inner.config.clone(),
        );
        let report = builder.cache_all(&apps).await;

        let snapshot = Snapshot {
            apps: AppsMap::from_apps(&apps),
            store,
            generation: previous.generation + 1,
            built_at: Some(report.started_at),
        };
        obs::emit_snapshot_published(snapshot.generation, snapshot.apps.len(), snapshot.store.len());
        let names = snapshot.apps.names();
        self.inner.current.store(Arc::new(snapshot));
        METRICS.inc_builds_published();
        METRICS.flush();

        self.notify(&names);
        report
    }

    fn notify(&self, names: &[String]) {
        let listeners = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_rebuild(names);
        }
    }

    /// Poll the origin every `interval` and rebuild on manifest changes.
    /// Must be called within a Tokio runtime.
    pub fn start_hot_reload(&self, interval: Duration) -> ReloadHandle {
        HotReloader::new(self.clone(), interval).spawn()
    }
}
