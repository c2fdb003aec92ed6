use log::{debug, info, trace, warn};
use path_clean::clean;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    constants::{CHUNK_EXTENSION, EXCLUDED_SUFFIXES, SOURCE_MAP_SUFFIX},
    types::{LoadedReport, PhysicalChunk},
};

/// Find the chunk files each application's build emitted for its shared libraries.
///
/// A file shared by several applications yields one chunk per application, each
/// carrying that application's own characteristics. Order follows the reports,
/// then libraries, then the build's `chunk_files` order.
pub fn locate_chunks(reports: &[LoadedReport]) -> Vec<PhysicalChunk> {
    let mut chunks = Vec::new();

    for loaded in reports {
        let output_dir = &loaded.output_dir;
        if !output_dir.is_dir() {
            debug!("Output directory for '{}' not found: {}", loaded.app, output_dir.display());
            continue;
        }

        for (library, usage) in &loaded.report.tree_shake {
            let Some(characteristics) = &usage.chunk_characteristics else {
                trace!("'{}' has no chunk characteristics for '{}'", loaded.app, library);
                continue;
            };
            let Some(files) = characteristics.chunk_files() else {
                debug!("'{}' has no chunk file list for '{}'", loaded.app, library);
                continue;
            };

            for file_name in files {
                if !is_optimization_target(file_name) {
                    trace!("Skipping non-target file: {}", file_name);
                    continue;
                }
                let Some(path) = resolve_chunk_path(output_dir, file_name) else {
                    warn!(
                        "Ignoring chunk '{}' of '{}': outside {}",
                        file_name,
                        library,
                        output_dir.display()
                    );
                    continue;
                };
                if !path.is_file() {
                    trace!("Chunk file does not exist: {}", path.display());
                    continue;
                }

                trace!("Found chunk {} for '{}' in '{}'", path.display(), library, loaded.app);
                chunks.push(PhysicalChunk {
                    map_path: append_suffix(&path, SOURCE_MAP_SUFFIX),
                    path,
                    app: loaded.app.clone(),
                    file_name: file_name.to_string(),
                    library: library.clone(),
                    characteristics: characteristics.clone(),
                });
            }
        }
    }

    info!("Found {} shared library chunks", chunks.len());
    chunks
}

/// Whether a file named in `chunk_files` may be handed to the pruning engine.
pub fn is_optimization_target(file_name: &str) -> bool {
    file_name.ends_with(CHUNK_EXTENSION)
        && !EXCLUDED_SUFFIXES.iter().any(|suffix| file_name.ends_with(suffix))
}

/// `path` with `suffix` appended to its file name, e.g. `a.js` -> `a.js.original`.
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn resolve_chunk_path(output_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let base = clean(output_dir);
    let path = clean(output_dir.join(file_name));
    if path.starts_with(&base) && path != base { Some(path) } else { None }
}
