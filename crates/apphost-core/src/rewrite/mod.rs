//! Rewrite Engine
//!
//! Pure transformation logic plus the per-application context that commits
//! its results:
//! - `vendor`: vendor-file convention and dependency-namespace rewriting
//! - `context`: reference resolution, canonical keys, fetch-and-commit
//! - `html`: asset reference rewriting with integrity digests
//! - `minify`: document minification
//! - `ssg`: request-time nonce, CSP and placeholder pass

pub mod context;
pub mod html;
pub mod minify;
pub mod ssg;
pub mod vendor;

pub use context::{CommittedAsset, RewriteContext};
pub use html::{render_document, RenderedDocument, PREFETCH_META};
pub use minify::{minify, MinifyOptions};
pub use ssg::{render_page, RenderedPage, RequestContext};
pub use vendor::{is_vendor_js, vendor_name_version, VendorMatch, VendorReplacer, DEFAULT_DEPENDENCY_PATH};
