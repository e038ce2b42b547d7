//! In-memory origin (testing only)
//!
//! `MemoryOrigin` serves a manifest and a flat path → file map, and can hold
//! file fetches behind a gate so tests can observe a build mid-flight.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::client::{OriginClient, OriginFile};
use crate::error::FetchError;
use crate::manifest::{App, Apps};
use crate::Result;

/// In-memory origin backed by a `BTreeMap<path, file>`.
#[derive(Debug)]
pub struct MemoryOrigin {
    manifest: RwLock<Apps>,
    files: RwLock<BTreeMap<String, OriginFile>>,
    gate: watch::Sender<bool>,
    manifest_down: AtomicBool,
    fetches: AtomicUsize,
}

impl Default for MemoryOrigin {
    fn default() -> Self {
        let (gate, _) = watch::channel(true);
        MemoryOrigin {
            manifest: RwLock::new(Vec::new()),
            files: RwLock::new(BTreeMap::new()),
            gate,
            manifest_down: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }
}

fn normalize(path: &str) -> String {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

impl MemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the manifest.
    pub fn set_manifest(&self, apps: Apps) {
        *self.manifest.write().unwrap_or_else(PoisonError::into_inner) = apps;
    }

    pub fn push_app(&self, app: App) {
        self.manifest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(app);
    }

    /// Serve `content` at `path`.
    pub fn put_file(&self, path: &str, content_type: &str, content: impl Into<Vec<u8>>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize(path), OriginFile::new(content_type, content));
    }

    /// Make `fetch_manifest` fail until `restore_manifest` is called.
    pub fn take_manifest_down(&self) {
        self.manifest_down.store(true, Ordering::SeqCst);
    }

    pub fn restore_manifest(&self) {
        self.manifest_down.store(false, Ordering::SeqCst);
    }

    /// Hold every subsequent `fetch` until `open_gate` is called.
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OriginClient for MemoryOrigin {
    async fn fetch_manifest(&self) -> Result<Apps> {
        if self.manifest_down.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                url: "memory://versions.json".to_string(),
                status: 503,
            });
        }
        Ok(self
            .manifest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn fetch(&self, path: &str) -> Result<OriginFile> {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        self.fetches.fetch_add(1, Ordering::SeqCst);
        let key = normalize(path);
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or(FetchError::NotFound(key))
    }

    async fn list_files(&self, location: &str, version: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", normalize(&format!("{location}/{version}")));
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let listed: Vec<String> = files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(str::to_string)
            .collect();
        if listed.is_empty() {
            return Err(FetchError::NotFound(format!("{prefix}all__files.json")));
        }
        Ok(listed)
    }
}
