use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 content digest, standard base64 encoded.
///
/// This is the exact form used by subresource-integrity attributes after the
/// `sha256-` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactDigest(String);

impl ArtifactDigest {
    /// Compute the digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        ArtifactDigest(STANDARD.encode(hash))
    }

    /// Return the base64 string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Integrity attribute value: `sha256-{base64}`.
    pub fn integrity(&self) -> String {
        format!("sha256-{}", self.0)
    }

    /// Short form (first 12 chars), for logs.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One servable unit stored at one canonical path.
///
/// Artifacts are never mutated after construction; a newer artifact replaces
/// the old one wholesale at its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedArtifact {
    content_type: String,
    content: Vec<u8>,
    sha256: ArtifactDigest,
}

impl CachedArtifact {
    /// Build an artifact, computing the digest of `content`.
    pub fn new(content_type: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let sha256 = ArtifactDigest::from_bytes(&content);
        CachedArtifact {
            content_type: content_type.into(),
            content,
            sha256,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn sha256(&self) -> &ArtifactDigest {
        &self.sha256
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_known_vector() {
        // sha256("") in base64
        let d = ArtifactDigest::from_bytes(b"");
        assert_eq!(d.as_str(), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
        assert_eq!(d.integrity(), "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn test_artifact_digest_follows_content() {
        let a = CachedArtifact::new("text/javascript", "console.log(1)");
        let b = CachedArtifact::new("application/javascript", "console.log(1)");
        let c = CachedArtifact::new("text/javascript", "console.log(2)");

        assert_eq!(a.sha256(), b.sha256());
        assert_ne!(a.sha256(), c.sha256());
        assert_eq!(a.text(), Some("console.log(1)"));
    }

    #[test]
    fn test_binary_artifact_has_no_text() {
        let png = CachedArtifact::new("image/png", vec![0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe]);
        assert!(png.text().is_none());
        assert_eq!(png.len(), 6);
    }

    #[test]
    fn test_empty_artifact_is_distinct_from_absent() {
        let empty = CachedArtifact::new("text/plain", "");
        assert!(empty.is_empty());
        assert_eq!(empty.sha256(), &ArtifactDigest::from_bytes(b""));
    }

    #[test]
    fn test_short_digest() {
        let d = ArtifactDigest::from_bytes(b"hello");
        assert_eq!(d.short().len(), 12);
        assert!(d.as_str().starts_with(d.short()));
    }
}
