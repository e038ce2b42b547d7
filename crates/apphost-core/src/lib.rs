//! apphost-core: rewrite-and-cache pipeline for apphost
//!
//! Turns a manifest of versioned front-end applications into a path-keyed
//! cache of servable artifacts, and keeps that cache current.
//!
//! ## Layer 2 - Logic
//!
//! Focus: rewriting asset references into canonical, integrity-checked keys,
//! fanning fetches out per application and per file without corrupting the
//! shared store, and publishing each rebuilt generation atomically.
//!
//! ## Key Components
//!
//! - `rewrite`: vendor canonicalization, HTML reference rewriting, minifier,
//!   request-time nonce/CSP pass
//! - `BuildOrchestrator`: one build pass into one store generation
//! - `Renderer`: the serving facade over the published snapshot
//! - `HotReloader`: manifest polling and rebuild scheduling
//! - `AuthRoutes`: route sync for the authentication gate

pub mod auth;
pub mod config;
pub mod domain;
pub mod facade;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod paths;
pub mod reload;
pub mod rewrite;
pub mod telemetry;

pub use auth::{AppsListener, AuthRoutes};
pub use config::RenderConfig;
pub use domain::{AppsMap, ManifestDelta, ParseError, RenderError, Result, VersionChange};
pub use facade::{Renderer, Snapshot};
pub use orchestrator::{AppReport, BuildOrchestrator, BuildReport};
pub use paths::{join_url, normalize_key};
pub use reload::{HotReloader, ReloadHandle, ReloadOutcome, ReloadState};
pub use rewrite::{
    render_page, MinifyOptions, RenderedPage, RequestContext, VendorMatch, DEFAULT_DEPENDENCY_PATH,
};
pub use telemetry::init_tracing;

pub use apphost_origin::{App, AppKind, Apps, FetchError, OriginClient};
pub use apphost_store::{ArtifactDigest, CacheStrategy, CachedArtifact, ContentStore};
