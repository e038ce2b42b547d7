//! Origin client interface.

use async_trait::async_trait;

use apphost_store::{ArtifactDigest, CachedArtifact};

use crate::manifest::Apps;
use crate::Result;

/// Raw file as served by the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginFile {
    pub content: Vec<u8>,
    pub content_type: String,
    /// Digest of `content` as fetched
    pub sha256: ArtifactDigest,
}

impl OriginFile {
    pub fn new(content_type: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let sha256 = ArtifactDigest::from_bytes(&content);
        OriginFile {
            content,
            content_type: content_type.into(),
            sha256,
        }
    }

    /// Content as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Copy verbatim into a cacheable artifact.
    pub fn into_artifact(self) -> CachedArtifact {
        CachedArtifact::new(self.content_type, self.content)
    }
}

/// Remote file store holding the manifest and every application version.
#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Resolve the current application manifest.
    async fn fetch_manifest(&self) -> Result<Apps>;

    /// Fetch one file by origin path.
    async fn fetch(&self, path: &str) -> Result<OriginFile>;

    /// List the files of one application version, relative to `{location}/{version}`.
    async fn list_files(&self, location: &str, version: &str) -> Result<Vec<String>>;
}
