use anyhow::{Context, Result};
use fedprune_core::{
    BACKUP_SUFFIX, CHUNK_CHARACTERISTICS_KEY, ChunkCharacteristics, MergedUsage, PhysicalChunk,
    append_suffix,
};
use log::{debug, info, log_enabled, trace, warn};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
};
use tempfile::NamedTempFile;

use crate::{
    engine::{EngineResponse, PruneEngine},
    types::{BatchOutcome, ChunkOutcome, OptimizationResult, SkipKind, SkippedChunk},
    validate::check_output,
};

#[derive(Debug, Clone, Copy)]
pub struct OptimizeOptions {
    /// Refuse engine output that no longer parses as JavaScript
    pub validate_output: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self { validate_output: true }
    }
}

/// Optimize every chunk, in parallel where they live in different files.
///
/// Chunks pointing at the same file (one file attributed to several libraries)
/// are handled one after another by the same task, so each sees the previous
/// rewrite and no two tasks ever write the same path. Outcomes keep chunk order.
pub fn optimize_chunks(
    chunks: &[PhysicalChunk],
    merged: &MergedUsage,
    engine: &dyn PruneEngine,
    options: OptimizeOptions,
) -> BatchOutcome {
    let groups = group_by_path(chunks);
    info!("Optimizing {} chunks across {} files", chunks.len(), groups.len());

    let mut outcomes: Vec<(usize, ChunkOutcome)> = groups
        .par_iter()
        .flat_map(|group| {
            let thread_id = thread::current().id();
            debug!("Thread {:?} processing {} chunk(s)", thread_id, group.len());
            group
                .iter()
                .map(|(idx, chunk)| (*idx, optimize_chunk(chunk, merged, engine, options)))
                .collect::<Vec<_>>()
        })
        .collect();

    outcomes.sort_by_key(|(idx, _)| *idx);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

fn group_by_path(chunks: &[PhysicalChunk]) -> Vec<Vec<(usize, &PhysicalChunk)>> {
    let mut groups: Vec<Vec<(usize, &PhysicalChunk)>> = Vec::new();
    let mut by_path: HashMap<&PathBuf, usize> = HashMap::new();
    for (idx, chunk) in chunks.iter().enumerate() {
        match by_path.get(&chunk.path) {
            Some(&group) => groups[group].push((idx, chunk)),
            None => {
                by_path.insert(&chunk.path, groups.len());
                groups.push(vec![(idx, chunk)]);
            }
        }
    }
    groups
}

/// Optimize a single chunk. Never fails: problems become a skipped outcome.
pub fn optimize_chunk(
    chunk: &PhysicalChunk,
    merged: &MergedUsage,
    engine: &dyn PruneEngine,
    options: OptimizeOptions,
) -> ChunkOutcome {
    info!("Optimizing chunk: {}/{} ({})", chunk.app, chunk.file_name, chunk.library);
    match try_optimize_chunk(chunk, merged, engine, options) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Failed to optimize {}/{}: {:#}", chunk.app, chunk.file_name, e);
            ChunkOutcome::Skipped(SkippedChunk::new(chunk, SkipKind::Failed, format!("{:#}", e)))
        }
    }
}

fn try_optimize_chunk(
    chunk: &PhysicalChunk,
    merged: &MergedUsage,
    engine: &dyn PruneEngine,
    options: OptimizeOptions,
) -> Result<ChunkOutcome> {
    let flags = library_keep_flags(merged, &chunk.library);
    if flags.is_empty() {
        info!("Skipping {} for '{}' - no export flags defined", chunk.file_name, chunk.library);
        return Ok(skip(chunk, SkipKind::Unsafe, "no export flags defined"));
    }
    if chunk.characteristics.entry_module_id().is_none() {
        info!(
            "Skipping {} for '{}' - missing chunk characteristics",
            chunk.file_name, chunk.library
        );
        return Ok(skip(chunk, SkipKind::Unsafe, "missing chunk characteristics"));
    }

    let config = build_engine_config(&chunk.library, &flags, &chunk.characteristics);
    let config_json = serde_json::to_string(&config).context("Failed to serialize engine config")?;

    let kept: Vec<&str> = flags.iter().filter(|(_, keep)| **keep).map(|(e, _)| e.as_str()).collect();
    info!(
        "Tree-shake config for {}: {} exports to keep, {} to remove",
        chunk.library,
        kept.len(),
        flags.len() - kept.len()
    );
    if !kept.is_empty() {
        debug!("Exports to keep: {}", kept.join(", "));
    }
    if log_enabled!(log::Level::Debug) {
        debug!(
            "Calling engine with config: {}",
            serde_json::to_string_pretty(&config).unwrap_or_else(|_| config_json.clone())
        );
    }

    let source = fs::read_to_string(&chunk.path)
        .with_context(|| format!("Failed to read {}", chunk.path.display()))?;
    let raw = engine.optimize(&source, &config_json)?;
    trace!("Engine returned {} bytes for {}", raw.len(), chunk.path.display());

    match EngineResponse::parse(&raw)? {
        EngineResponse::Success { optimized_source, prune } => {
            if options.validate_output
                && let Err(reason) = check_output(&chunk.path, &source, &optimized_source)
            {
                warn!("Not writing {}: {}", chunk.path.display(), reason);
                return Ok(skip(chunk, SkipKind::NotApplied, reason));
            }

            let backup_written = write_backup(&chunk.path, &source)?;
            fs::write(&chunk.path, &optimized_source)
                .with_context(|| format!("Failed to write {}", chunk.path.display()))?;

            let result = OptimizationResult::new(
                chunk,
                source.len(),
                optimized_source.len(),
                prune,
                backup_written,
            );
            log_result(&result);
            Ok(ChunkOutcome::Optimized(result))
        }
        EngineResponse::EngineError { message } => {
            warn!("No optimization applied for {}: {}", chunk.file_name, message);
            Ok(skip(chunk, SkipKind::NotApplied, message))
        }
        EngineResponse::Skipped { reason } => {
            warn!("No optimization applied for {} ({})", chunk.file_name, reason);
            Ok(skip(chunk, SkipKind::NotApplied, reason))
        }
    }
}

fn skip(chunk: &PhysicalChunk, kind: SkipKind, reason: impl Into<String>) -> ChunkOutcome {
    ChunkOutcome::Skipped(SkippedChunk::new(chunk, kind, reason))
}

fn log_result(result: &OptimizationResult) {
    info!(
        "Optimized {}: {} -> {} bytes ({:.2}%)",
        result.file_name, result.original_size, result.optimized_size, result.reduction
    );
    match &result.prune.skip_reason {
        Some(reason) => info!("Pruning skipped: {}", reason),
        None => info!(
            "Modules pruned: {}{}, kept: {}",
            result.prune.removed_count(),
            result.prune.original_count.map(|n| format!(" (from {})", n)).unwrap_or_default(),
            result.prune.kept_count()
        ),
    }
}

/// Every merged export flag of `library`, including the `false` ones: the engine
/// needs explicit negatives, absence is not a removal signal.
pub fn library_keep_flags(merged: &MergedUsage, library: &str) -> BTreeMap<String, bool> {
    merged.library_flags(library).cloned().unwrap_or_default()
}

/// Engine config for exactly one library, carrying this chunk's own characteristics.
pub fn build_engine_config(
    library: &str,
    flags: &BTreeMap<String, bool>,
    characteristics: &ChunkCharacteristics,
) -> Value {
    let mut library_config: Map<String, Value> =
        flags.iter().map(|(export, keep)| (export.clone(), Value::Bool(*keep))).collect();
    library_config.insert(
        CHUNK_CHARACTERISTICS_KEY.to_string(),
        Value::Object(characteristics.as_map().clone()),
    );

    let mut tree_shake = Map::new();
    tree_shake.insert(library.to_string(), Value::Object(library_config));
    let mut config = Map::new();
    config.insert("treeShake".to_string(), Value::Object(tree_shake));
    Value::Object(config)
}

/// Save the pristine chunk next to it, unless a backup already exists.
///
/// Returns whether a backup was written. The content is staged in a temporary
/// file and published with a no-clobber rename, so a backup on disk is always
/// complete and a re-run can never replace it with already-optimized content.
pub fn write_backup(chunk_path: &Path, original: &str) -> Result<bool> {
    publish_backup(chunk_path, original, |file| file.write_all(original.as_bytes()))
}

fn publish_backup(
    chunk_path: &Path,
    original: &str,
    fill: impl FnOnce(&mut File) -> io::Result<()>,
) -> Result<bool> {
    let backup = append_suffix(chunk_path, BACKUP_SUFFIX);
    let dir = match chunk_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Dropped (and removed) on any error below
    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to stage backup in {}", dir.display()))?;
    fill(staged.as_file_mut())
        .and_then(|_| staged.as_file().sync_all())
        .with_context(|| format!("Failed to write backup {}", backup.display()))?;

    match staged.persist_noclobber(&backup) {
        Ok(_) => {
            debug!("Wrote backup {}", backup.display());
            Ok(true)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            let existing = fs::metadata(&backup)
                .with_context(|| format!("Failed to inspect backup {}", backup.display()))?;
            if existing.len() == 0 && !original.is_empty() {
                warn!("Replacing empty backup {}", backup.display());
                e.file
                    .persist(&backup)
                    .map_err(|e| e.error)
                    .with_context(|| format!("Failed to replace backup {}", backup.display()))?;
                return Ok(true);
            }
            debug!("Backup already exists: {}", backup.display());
            Ok(false)
        }
        Err(e) => Err(e.error)
            .with_context(|| format!("Failed to create backup {}", backup.display())),
    }
}
