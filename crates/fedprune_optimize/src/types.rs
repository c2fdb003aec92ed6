use fedprune_core::PhysicalChunk;
use std::path::PathBuf;

use crate::engine::PruneReport;

/// A chunk that was rewritten by the pruning engine.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub app: String,
    pub file_name: String,
    pub library: String,
    pub path: PathBuf,
    pub original_size: usize,
    pub optimized_size: usize,
    /// Size reduction in percent; negative when the chunk grew
    pub reduction: f64,
    pub prune: PruneReport,
    /// Whether this run wrote the `.original` backup (false when one already existed)
    pub backup_written: bool,
}

impl OptimizationResult {
    pub fn new(
        chunk: &PhysicalChunk,
        original_size: usize,
        optimized_size: usize,
        prune: PruneReport,
        backup_written: bool,
    ) -> Self {
        Self {
            app: chunk.app.clone(),
            file_name: chunk.file_name.clone(),
            library: chunk.library.clone(),
            path: chunk.path.clone(),
            original_size,
            optimized_size,
            reduction: percent(saved_bytes(original_size, optimized_size), original_size),
            prune,
            backup_written,
        }
    }

    pub fn saved(&self) -> i64 {
        saved_bytes(self.original_size, self.optimized_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    /// Pruning would be unsafe (no export flags or no entry module)
    Unsafe,
    /// The engine declined or its output was rejected
    NotApplied,
    /// Something failed while processing the chunk
    Failed,
}

#[derive(Debug, Clone)]
pub struct SkippedChunk {
    pub app: String,
    pub file_name: String,
    pub library: String,
    pub kind: SkipKind,
    pub reason: String,
}

impl SkippedChunk {
    pub fn new(chunk: &PhysicalChunk, kind: SkipKind, reason: impl Into<String>) -> Self {
        Self {
            app: chunk.app.clone(),
            file_name: chunk.file_name.clone(),
            library: chunk.library.clone(),
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Optimized(OptimizationResult),
    Skipped(SkippedChunk),
}

/// Everything the invoker produced, in chunk order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: Vec<OptimizationResult>,
    pub skipped: Vec<SkippedChunk>,
}

impl FromIterator<ChunkOutcome> for BatchOutcome {
    fn from_iter<I: IntoIterator<Item = ChunkOutcome>>(iter: I) -> Self {
        let mut batch = BatchOutcome::default();
        for outcome in iter {
            match outcome {
                ChunkOutcome::Optimized(result) => batch.results.push(result),
                ChunkOutcome::Skipped(skipped) => batch.skipped.push(skipped),
            }
        }
        batch
    }
}

pub(crate) fn saved_bytes(original: usize, optimized: usize) -> i64 {
    original as i64 - optimized as i64
}

/// `part` as a percentage of `whole`, 0 when `whole` is empty.
pub(crate) fn percent(part: i64, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}
