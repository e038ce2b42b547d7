//! apphostd - versioned front-end bundle host
//!
//! Fetches the application manifest from the origin, builds the rewritten
//! cache, and polls the origin for new versions until interrupted.
//!
//! `--once` builds a single generation, prints the build report as JSON and
//! exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use apphost_core::{AuthRoutes, BuildReport, CacheStrategy, RenderConfig, Renderer};
use apphost_origin::{HttpOrigin, OriginConfig};
use clap::Parser;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "apphostd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned front-end bundle host", long_about = None)]
struct Cli {
    /// Origin base URL
    #[arg(long, env = "APPHOST_ORIGIN_URL")]
    origin: Option<String>,

    /// Per-request origin timeout in seconds
    #[arg(long, env = "APPHOST_FETCH_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Hot-reload poll interval in milliseconds
    #[arg(long, env = "APPHOST_RELOAD_INTERVAL_MS", default_value_t = 60_000)]
    interval_ms: u64,

    /// Shared namespace for vendor files
    #[arg(long, env = "APPHOST_DEPENDENCY_PATH")]
    dependency_path: Option<String>,

    /// Content store implementation
    #[arg(long, env = "APPHOST_CACHE_STRATEGY")]
    cache_strategy: Option<String>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Build once, print the report and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn origin_config(&self) -> OriginConfig {
        let mut config = match &self.origin {
            Some(url) => OriginConfig::new(url),
            None => OriginConfig::from_env(),
        };
        if let Some(secs) = self.timeout {
            config = config.with_timeout(secs);
        }
        config
    }

    fn render_config(&self) -> RenderConfig {
        let mut config = RenderConfig::from_env();
        if let Some(path) = &self.dependency_path {
            config = config.with_dependency_path(path);
        }
        if let Some(name) = &self.cache_strategy {
            config = config.with_cache_strategy(CacheStrategy::from_name(name));
        }
        config
    }
}

fn log_report(report: &BuildReport) {
    info!(
        apps = report.apps.len(),
        files_cached = report.files_cached(),
        failures = report.failures(),
        duration_ms = report.duration_ms,
        "initial build complete"
    );
    for name in report.failed_apps() {
        warn!(app = %name, "application failed to build");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    apphost_core::init_tracing(cli.json, level);

    let origin_config = cli.origin_config();
    info!(origin = %origin_config.base_url, "starting apphostd");
    let origin = HttpOrigin::new(origin_config).context("Failed to create origin client")?;

    let (renderer, report) = Renderer::init(Arc::new(origin), cli.render_config())
        .await
        .context("Failed to fetch application manifest")?;

    if cli.once {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to encode build report")?
        );
        return Ok(());
    }
    log_report(&report);

    let auth_routes = Arc::new(AuthRoutes::new());
    renderer.subscribe(auth_routes.clone());
    info!(pattern = %auth_routes.pattern(), "auth routes ready");

    let handle = renderer.start_hot_reload(Duration::from_millis(cli.interval_ms));
    info!(interval_ms = cli.interval_ms, "hot reload started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("shutting down");
    handle.stop().await;

    Ok(())
}
