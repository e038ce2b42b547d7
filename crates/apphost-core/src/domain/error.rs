//! Error taxonomy for the rewrite-and-cache pipeline.

use apphost_origin::FetchError;

/// Errors produced while parsing documents or paths.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{path} does not follow the vendor file convention")]
    VendorPattern { path: String },

    #[error("malformed HTML: {0}")]
    Html(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("application {name} has no entry point")]
    MissingEntryPoint { name: String },
}

/// Pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("rewrite of {path} failed: {source}")]
    Rewrite {
        path: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error("build task failed: {0}")]
    Task(String),
}

impl RenderError {
    /// Wrap an error hit while processing one document or asset.
    pub fn rewrite(path: impl Into<String>, source: RenderError) -> Self {
        RenderError::Rewrite {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Innermost non-`Rewrite` error.
    pub fn root_cause(&self) -> &RenderError {
        match self {
            RenderError::Rewrite { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self.root_cause(), RenderError::Fetch(_))
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RenderError>;
