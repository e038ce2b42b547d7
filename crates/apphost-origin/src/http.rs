//! HTTP origin client
//!
//! The origin is a plain static file server:
//! - `GET {base}/versions.json` → application manifest
//! - `GET {base}/{location}/{version}/all__files.json` → file index of one version
//! - `GET {base}/{path}` → raw file

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{OriginClient, OriginFile};
use crate::error::FetchError;
use crate::manifest::Apps;
use crate::Result;

const DEFAULT_ORIGIN_URL: &str = "http://localhost:9801";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Origin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Origin base URL
    pub base_url: String,
    /// Manifest path relative to the base URL
    pub manifest_path: String,
    /// File index name inside each `{location}/{version}` directory
    pub file_index: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        OriginConfig {
            base_url: std::env::var("APPHOST_ORIGIN_URL")
                .unwrap_or_else(|_| DEFAULT_ORIGIN_URL.to_string()),
            manifest_path: "versions.json".to_string(),
            file_index: "all__files.json".to_string(),
            timeout_secs: std::env::var("APPHOST_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OriginConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific origin
    pub fn new(base_url: &str) -> Self {
        OriginConfig {
            base_url: base_url.to_string(),
            manifest_path: "versions.json".to_string(),
            file_index: "all__files.json".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Absolute URL for an origin path. A leading `./` or `/` is dropped.
    pub fn url_for(&self, path: &str) -> String {
        let path = path.strip_prefix("./").unwrap_or(path);
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Origin client over HTTP
pub struct HttpOrigin {
    config: OriginConfig,
    http_client: reqwest::Client,
}

impl HttpOrigin {
    /// Create a new HTTP origin client
    pub fn new(config: OriginConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("apphost/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        Ok(HttpOrigin {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OriginConfig::from_env())
    }

    pub fn config(&self) -> &OriginConfig {
        &self.config
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl OriginClient for HttpOrigin {
    async fn fetch_manifest(&self) -> Result<Apps> {
        let url = self.config.url_for(&self.config.manifest_path);
        let apps: Apps = self.get_json(&url).await?;
        debug!(apps = apps.len(), "fetched manifest");
        Ok(apps)
    }

    async fn fetch(&self, path: &str) -> Result<OriginFile> {
        let url = self.config.url_for(path);
        let response = self.get(&url).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .to_string()
            });

        let content = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        debug!(path = %path, bytes = content.len(), "fetched origin file");
        Ok(OriginFile::new(content_type, content.to_vec()))
    }

    async fn list_files(&self, location: &str, version: &str) -> Result<Vec<String>> {
        let index = format!(
            "{}/{}/{}",
            location.trim_matches('/'),
            version.trim_matches('/'),
            self.config.file_index
        );
        let url = self.config.url_for(&index);
        self.get_json(&url).await
    }
}
