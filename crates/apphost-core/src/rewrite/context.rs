//! Per-application rewrite context: key derivation, fetch, commit.

use std::sync::Arc;

use apphost_origin::{App, OriginClient};
use apphost_store::{CachedArtifact, ContentStore};

use crate::domain::{ParseError, Result};
use crate::metrics::METRICS;
use crate::paths::{app_base, app_root, join_url, normalize_key};
use crate::rewrite::vendor::{dependency_key, in_vendor_dir, shared_vendor_path, VendorReplacer};

const EXTERNAL_PREFIXES: &[&str] = &["http:", "https:", "//", "data:", "blob:", "mailto:", "#"];

/// An artifact that is present in the store under `key`.
#[derive(Debug, Clone)]
pub struct CommittedAsset {
    pub key: String,
    pub artifact: Arc<CachedArtifact>,
    /// Already in the store; no fetch was made.
    pub reused: bool,
}

/// Everything needed to rewrite and commit the files of one application
/// version into one store generation.
pub struct RewriteContext {
    app: App,
    root: String,
    base: String,
    dependency_path: String,
    replacer: VendorReplacer,
    origin: Arc<dyn OriginClient>,
    store: Arc<dyn ContentStore>,
}

impl std::fmt::Debug for RewriteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteContext")
            .field("root", &self.root)
            .field("base", &self.base)
            .field("dependency_path", &self.dependency_path)
            .finish_non_exhaustive()
    }
}

impl RewriteContext {
    pub fn new(
        app: &App,
        dependency_path: &str,
        origin: Arc<dyn OriginClient>,
        store: Arc<dyn ContentStore>,
    ) -> std::result::Result<Self, ParseError> {
        Ok(RewriteContext {
            app: app.clone(),
            root: app_root(&app.name, &app.version),
            base: app_base(&app.location, &app.version),
            dependency_path: dependency_path.to_string(),
            replacer: VendorReplacer::new(&app.name, &app.version, dependency_path)?,
            origin,
            store,
        })
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Document key, `name/version`.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn origin(&self) -> &Arc<dyn OriginClient> {
        &self.origin
    }

    /// Path of an in-document reference relative to the application root,
    /// or `None` when the reference points outside the application.
    pub fn relative_reference(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        let lower = reference.to_ascii_lowercase();
        if reference.is_empty() || EXTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return None;
        }

        let reference = reference.strip_prefix("./").unwrap_or(reference);
        let rooted = format!("/{}/", self.root);
        let relative = reference
            .strip_prefix(rooted.as_str())
            .unwrap_or(reference)
            .trim_start_matches('/');

        if relative.is_empty() {
            None
        } else {
            Some(relative.to_string())
        }
    }

    /// Origin path of a file relative to the application root.
    pub fn origin_path(&self, relative: &str) -> String {
        join_url(&self.base, &[relative])
    }

    /// Canonical store key for a file relative to the application root.
    ///
    /// - anything below an `@vendor` segment: `{namespace}/{rest}`
    /// - JavaScript in a `vendor` segment: `{namespace}/{package}{version}.js`
    /// - everything else: `/{name}/{version}/{relative}`
    pub fn canonical_key(&self, relative: &str) -> std::result::Result<String, ParseError> {
        if let Some(rest) = shared_vendor_path(relative) {
            Ok(normalize_key(&join_url(&self.dependency_path, &[rest])))
        } else if in_vendor_dir(relative) {
            dependency_key(&self.dependency_path, relative)
        } else {
            Ok(normalize_key(&join_url(&self.root, &[relative])))
        }
    }

    fn is_dependency_key(&self, key: &str) -> bool {
        key.strip_prefix(self.dependency_path.trim_end_matches('/'))
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Fetch, vendor-rewrite, digest and commit one file.
    pub async fn cache_asset(&self, relative: &str) -> Result<CommittedAsset> {
        let key = self.canonical_key(relative)?;
        let file = self.origin.fetch(&self.origin_path(relative)).await?;
        let content = self.replacer.replace_bytes(file.content);
        // Shared scripts get one content type whichever application wrote them last.
        let content_type = if relative.ends_with(".js") && self.is_dependency_key(&key) {
            "text/javascript".to_string()
        } else {
            file.content_type
        };
        let artifact = Arc::new(CachedArtifact::new(content_type, content));

        self.store.set(&key, Arc::clone(&artifact));
        METRICS.inc_files_cached();
        tracing::debug!(key = %key, digest = %artifact.sha256().short(), "committed");

        Ok(CommittedAsset {
            key,
            artifact,
            reused: false,
        })
    }

    /// Resolve a document reference: reuse the committed artifact if the
    /// store has one, otherwise fetch and commit it.
    pub async fn resolve_reference(&self, relative: &str) -> Result<CommittedAsset> {
        let key = self.canonical_key(relative)?;
        if let Some(artifact) = self.store.get(&key) {
            return Ok(CommittedAsset {
                key,
                artifact,
                reused: true,
            });
        }
        self.cache_asset(relative).await
    }

    /// Commit a finished document under `key`.
    pub fn commit_document(&self, key: &str, html: String) -> Arc<CachedArtifact> {
        let artifact = Arc::new(CachedArtifact::new("text/html", html));
        self.store.set(key, Arc::clone(&artifact));
        METRICS.inc_documents_rendered();
        artifact
    }
}
