//! apphost-store: In-Memory Content Store for apphost
//!
//! This crate holds the servable output of a build: every rewritten page,
//! asset and shared dependency, keyed by its canonical path.
//!
//! ## Layer 0 - Data
//!
//! Focus: whole-value replacement semantics. A reader sees either nothing or a
//! complete artifact for a key, never a partially written one.
//!
//! ## Key Components
//!
//! - `CachedArtifact`: immutable content + content-type + digest
//! - `ContentStore`: key → artifact cache abstraction
//! - `MemoryContentStore`: the in-memory implementation
//! - `CacheStrategy`: closed set of store implementations selected at construction

mod artifact;
mod memory;
pub mod storage_traits;
mod strategy;

pub use artifact::{ArtifactDigest, CachedArtifact};
pub use memory::MemoryContentStore;
pub use storage_traits::ContentStore;
pub use strategy::CacheStrategy;
