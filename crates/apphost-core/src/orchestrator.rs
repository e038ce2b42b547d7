//! Build Orchestrator
//!
//! Drives one build pass into one store generation:
//! - every application is built in its own task;
//! - within a page bundle, every asset is fetched and committed in its own
//!   task, and only once all of them settle are the pages rendered, again
//!   one task per page;
//! - failures are contained at the file, page and application level.

use std::sync::Arc;
use std::time::Instant;

use apphost_origin::{App, AppKind, OriginClient};
use apphost_store::ContentStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::config::RenderConfig;
use crate::domain::{ParseError, RenderError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::paths::app_base;
use crate::rewrite::context::RewriteContext;
use crate::rewrite::html::{render_document, RenderedDocument};
use crate::rewrite::minify::MinifyOptions;

/// Outcome of building one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppReport {
    pub name: String,
    pub version: String,
    pub kind: AppKind,
    pub files_cached: usize,
    pub failures: usize,
    /// Set when the application as a whole could not be built.
    pub error: Option<String>,
}

impl AppReport {
    fn new(app: &App) -> Self {
        AppReport {
            name: app.name.clone(),
            version: app.version.clone(),
            kind: app.kind,
            files_cached: 0,
            failures: 0,
            error: None,
        }
    }

    fn failed(app: &App, err: &RenderError) -> Self {
        AppReport {
            failures: 1,
            error: Some(err.to_string()),
            ..AppReport::new(app)
        }
    }
}

/// Outcome of one build pass.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub apps: Vec<AppReport>,
}

impl BuildReport {
    pub fn files_cached(&self) -> usize {
        self.apps.iter().map(|a| a.files_cached).sum()
    }

    pub fn failures(&self) -> usize {
        self.apps.iter().map(|a| a.failures).sum()
    }

    /// Names of applications that failed as a whole.
    pub fn failed_apps(&self) -> Vec<&str> {
        self.apps
            .iter()
            .filter(|a| a.error.is_some())
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn app(&self, name: &str) -> Option<&AppReport> {
        self.apps.iter().find(|a| a.name == name)
    }
}

fn settle<T>(joined: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    joined.unwrap_or_else(|err| Err(RenderError::Task(err.to_string())))
}

fn is_page(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Page whose output is also served at the application root.
fn primary_page(pages: &[String]) -> Option<&String> {
    pages
        .iter()
        .find(|p| p.as_str() == "index.html")
        .or_else(|| pages.iter().min())
}

async fn cache_page(
    ctx: &RewriteContext,
    page: &str,
    primary: bool,
    options: &MinifyOptions,
) -> Result<RenderedDocument> {
    let file = ctx.origin().fetch(&ctx.origin_path(page)).await?;
    let html = String::from_utf8(file.content)
        .map_err(|e| ParseError::Html(format!("{page} is not valid UTF-8: {e}")))?;

    let document = render_document(ctx, page, &html, options).await?;

    let artifact = ctx.commit_document(&ctx.canonical_key(page)?, document.html.clone());
    if primary {
        ctx.store().set(ctx.root(), artifact);
    }
    Ok(document)
}

/// Builds applications into one store.
#[derive(Clone)]
pub struct BuildOrchestrator {
    origin: Arc<dyn OriginClient>,
    store: Arc<dyn ContentStore>,
    config: RenderConfig,
}

impl BuildOrchestrator {
    pub fn new(origin: Arc<dyn OriginClient>, store: Arc<dyn ContentStore>, config: RenderConfig) -> Self {
        BuildOrchestrator {
            origin,
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Build every application concurrently. Never fails; per-application
    /// errors are recorded in the report.
    pub async fn cache_all(&self, apps: &[App]) -> BuildReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        obs::emit_build_started(apps.len());

        let mut tasks: Vec<(App, JoinHandle<Result<AppReport>>)> = Vec::with_capacity(apps.len());
        for app in apps {
            let this = self.clone();
            let owned = app.clone();
            let span = obs::app_span(&app.name, &app.version);
            let task = tokio::spawn(async move { this.cache_app(&owned).await }.instrument(span));
            tasks.push((app.clone(), task));
        }

        let mut reports = Vec::with_capacity(tasks.len());
        for (app, task) in tasks {
            match settle(task.await) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    obs::emit_app_failed(&app.name, &app.version, &err);
                    reports.push(AppReport::failed(&app, &err));
                }
            }
        }

        let report = BuildReport {
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            apps: reports,
        };
        obs::emit_build_finished(
            report.apps.len(),
            report.files_cached(),
            report.failures(),
            report.duration_ms,
        );
        report
    }

    /// Build one application.
    pub async fn cache_app(&self, app: &App) -> Result<AppReport> {
        let report = match app.kind {
            AppKind::ScriptBundle => self.cache_script_bundle(app).await?,
            AppKind::PageBundle => self.cache_page_bundle(app).await?,
        };
        obs::emit_app_cached(&app.name, &app.version, report.files_cached, report.failures);
        Ok(report)
    }

    /// The bundle is the single file at `{location}/{version}`, stored
    /// verbatim under the entry-point key.
    async fn cache_script_bundle(&self, app: &App) -> Result<AppReport> {
        if app.entry_point.trim().is_empty() {
            return Err(ParseError::MissingEntryPoint {
                name: app.name.clone(),
            }
            .into());
        }

        let file = self.origin.fetch(&app_base(&app.location, &app.version)).await?;
        self.store.set(&app.entry_point, Arc::new(file.into_artifact()));
        METRICS.inc_files_cached();

        Ok(AppReport {
            files_cached: 1,
            ..AppReport::new(app)
        })
    }

    async fn cache_page_bundle(&self, app: &App) -> Result<AppReport> {
        let ctx = Arc::new(RewriteContext::new(
            app,
            &self.config.dependency_path,
            Arc::clone(&self.origin),
            Arc::clone(&self.store),
        )?);
        let files = self.origin.list_files(&app.location, &app.version).await?;
        let (mut pages, assets): (Vec<String>, Vec<String>) = files.into_iter().partition(|f| is_page(f));
        pages.sort();

        let mut report = AppReport::new(app);

        let mut tasks = Vec::with_capacity(assets.len());
        for asset in assets {
            let ctx = Arc::clone(&ctx);
            let path = asset.clone();
            tasks.push((asset, tokio::spawn(async move { ctx.cache_asset(&path).await })));
        }
        for (path, task) in tasks {
            match settle(task.await) {
                Ok(_) => report.files_cached += 1,
                Err(err) => {
                    report.failures += 1;
                    METRICS.inc_file_failures();
                    obs::emit_file_failed(&app.name, &path, &RenderError::rewrite(path.as_str(), err));
                }
            }
        }

        let primary = primary_page(&pages).cloned();
        let mut tasks = Vec::with_capacity(pages.len());
        for page in pages {
            let ctx = Arc::clone(&ctx);
            let options = self.config.minify;
            let is_primary = primary.as_deref() == Some(page.as_str());
            let path = page.clone();
            tasks.push((
                page,
                tokio::spawn(async move { cache_page(&ctx, &path, is_primary, &options).await }),
            ));
        }
        for (path, task) in tasks {
            match settle(task.await) {
                Ok(document) => {
                    report.files_cached += 1;
                    report.failures += document.failures.len();
                    for _ in &document.failures {
                        METRICS.inc_file_failures();
                    }
                }
                Err(err) => {
                    report.failures += 1;
                    METRICS.inc_file_failures();
                    obs::emit_file_failed(&app.name, &path, &RenderError::rewrite(path.as_str(), err));
                }
            }
        }

        Ok(report)
    }
}
