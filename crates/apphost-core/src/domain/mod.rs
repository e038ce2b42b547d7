//! Domain model for the pipeline: application index, change detection, errors.

pub mod apps;
pub mod error;

pub use apps::{AppsMap, ManifestDelta, VersionChange};
pub use error::{ParseError, RenderError, Result};
