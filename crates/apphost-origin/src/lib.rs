//! apphost-origin: Origin Client for apphost
//!
//! This crate is the I/O boundary of the build pipeline. It resolves the
//! application manifest and fetches raw files from the remote origin that
//! stores every deployed application version.
//!
//! ## Layer 1 - I/O
//!
//! Focus: turning origin responses into typed values, and turning every kind
//! of origin failure (network, status, timeout, bad body) into a `FetchError`.

pub mod client;
mod error;
pub mod fakes;
pub mod http;
pub mod manifest;

pub use client::{OriginClient, OriginFile};
pub use error::FetchError;
pub use fakes::MemoryOrigin;
pub use http::{HttpOrigin, OriginConfig};
pub use manifest::{App, AppKind, Apps};

/// Result type for origin operations
pub type Result<T> = std::result::Result<T, FetchError>;
