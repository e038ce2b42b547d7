//! Error types for apphost-origin

use thiserror::Error;

/// Errors that can occur while talking to the origin
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Origin answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Request exceeded the configured timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Response body could not be decoded
    #[error("invalid response body from {url}: {message}")]
    Decode { url: String, message: String },

    /// Path is unknown to the origin
    #[error("not found on origin: {0}")]
    NotFound(String),

    /// Client could not be configured
    #[error("invalid origin configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Classify a reqwest error for `url`.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Whether the origin reported the path as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound(_) | FetchError::Status { status: 404, .. }
        )
    }
}
