//! Core data model and pure pipeline stages for fedprune.
//!
//! This crate covers everything that happens before the pruning engine runs:
//! - Reading each application's `share-usage.json`
//! - OR-merging export usage across applications
//! - Locating the physical chunk files each build emitted for a shared library
//! - Project root discovery

mod config;
mod constants;
mod error;
mod loader;
mod locator;
mod merger;
mod types;

// Re-export public API
pub use config::{find_git_root, find_git_root_from, resolve_root};
pub use constants::{
    BACKUP_SUFFIX, CHUNK_CHARACTERISTICS_KEY, CHUNK_EXTENSION, EXCLUDED_SUFFIXES,
    OPTIMIZED_SUFFIX, SOURCE_MAP_SUFFIX, USAGE_FILE_NAME,
};
pub use error::FatalError;
pub use loader::{load_usage_reports, read_usage_report};
pub use locator::{append_suffix, is_optimization_target, locate_chunks};
pub use merger::merge_usage;
pub use types::{
    AppTarget, ChunkCharacteristics, LibraryUsage, LoadedReport, MergeMetadata, MergedUsage,
    PhysicalChunk, UsageReport,
};
