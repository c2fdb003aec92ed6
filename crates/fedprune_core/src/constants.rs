//! File naming conventions shared by the build output and the optimizer.
//!
//! A chunk listed in `chunk_files` is only an optimization target when it is a
//! plain JavaScript file. Source maps, backups written by a previous run and
//! optimized copies are derivatives of a chunk and are never handed to the
//! pruning engine.

/// Default name of the usage-telemetry file in each application's output directory
pub const USAGE_FILE_NAME: &str = "share-usage.json";

/// Key inside a library entry that carries build metadata instead of an export flag
pub const CHUNK_CHARACTERISTICS_KEY: &str = "chunk_characteristics";

/// Extension every optimizable chunk file ends with
pub const CHUNK_EXTENSION: &str = ".js";

/// Suffix of the sibling source map
pub const SOURCE_MAP_SUFFIX: &str = ".map";

/// Suffix of the pre-optimization backup written next to a chunk
pub const BACKUP_SUFFIX: &str = ".original";

/// Suffix used by tools that write the optimized copy beside the chunk
pub const OPTIMIZED_SUFFIX: &str = ".optimized.js";

/// File name endings that mark a derivative file rather than a chunk
pub const EXCLUDED_SUFFIXES: &[&str] = &[SOURCE_MAP_SUFFIX, BACKUP_SUFFIX, OPTIMIZED_SUFFIX];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimized_suffix_is_also_a_js_file() {
        // The exclusion list has to catch this one explicitly
        assert!(OPTIMIZED_SUFFIX.ends_with(CHUNK_EXTENSION));
        assert!(EXCLUDED_SUFFIXES.contains(&OPTIMIZED_SUFFIX));
    }

    #[test]
    fn test_backup_and_map_are_excluded() {
        assert!(EXCLUDED_SUFFIXES.contains(&BACKUP_SUFFIX));
        assert!(EXCLUDED_SUFFIXES.contains(&SOURCE_MAP_SUFFIX));
        assert_eq!(EXCLUDED_SUFFIXES.len(), 3);
    }
}
