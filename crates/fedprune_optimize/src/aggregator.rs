use log::debug;
use std::{cmp::Reverse, collections::BTreeMap};

use crate::types::{OptimizationResult, percent, saved_bytes};

/// Number of libraries listed under "top savings"
pub const TOP_SAVINGS_LIMIT: usize = 5;

/// Totals for one library across all of its optimized chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryStats {
    pub library: String,
    pub chunks: usize,
    pub original_size: usize,
    pub optimized_size: usize,
    /// Bytes saved; negative when the library grew
    pub saved: i64,
    pub reduction: f64,
    pub modules_pruned: usize,
    pub modules_kept: usize,
}

/// Run-wide statistics, reduced from the list of optimization results.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub chunks: usize,
    pub total_original: usize,
    pub total_optimized: usize,
    /// Never clamped: a negative value is a total increase
    pub total_saved: i64,
    pub total_reduction: f64,
    pub modules_kept: usize,
    pub modules_pruned: usize,
    /// Sorted by bytes saved, largest first
    pub libraries: Vec<LibraryStats>,
}

impl Summary {
    pub fn from_results(results: &[OptimizationResult]) -> Self {
        let total_original: usize = results.iter().map(|r| r.original_size).sum();
        let total_optimized: usize = results.iter().map(|r| r.optimized_size).sum();
        let total_saved = saved_bytes(total_original, total_optimized);

        let mut libraries: Vec<LibraryStats> = group_by_library(results)
            .into_iter()
            .map(|(library, results)| library_stats(library, &results))
            .collect();
        // Stable sort keeps library names alphabetical among equal savings
        libraries.sort_by_key(|stats| Reverse(stats.saved));

        let summary = Summary {
            chunks: results.len(),
            total_original,
            total_optimized,
            total_saved,
            total_reduction: percent(total_saved, total_original),
            modules_kept: libraries.iter().map(|l| l.modules_kept).sum(),
            modules_pruned: libraries.iter().map(|l| l.modules_pruned).sum(),
            libraries,
        };
        debug!(
            "Summarized {} chunks: {} -> {} bytes",
            summary.chunks, summary.total_original, summary.total_optimized
        );
        summary
    }

    pub fn is_increase(&self) -> bool {
        self.total_saved < 0
    }

    /// Libraries that actually shrank, largest savings first.
    pub fn top_savings(&self, limit: usize) -> impl Iterator<Item = &LibraryStats> {
        self.libraries.iter().filter(|l| l.saved > 0).take(limit)
    }

    /// Libraries whose chunks grew, largest increase first.
    pub fn increased(&self) -> Vec<&LibraryStats> {
        let mut grown: Vec<&LibraryStats> = self.libraries.iter().filter(|l| l.saved < 0).collect();
        grown.sort_by_key(|l| l.saved);
        grown
    }

    pub fn modules_analyzed(&self) -> usize {
        self.modules_kept + self.modules_pruned
    }

    /// Share of analyzed modules that were pruned, in percent.
    pub fn prune_rate(&self) -> f64 {
        percent(self.modules_pruned as i64, self.modules_analyzed())
    }
}

fn library_stats(library: &str, results: &[&OptimizationResult]) -> LibraryStats {
    let original_size: usize = results.iter().map(|r| r.original_size).sum();
    let optimized_size: usize = results.iter().map(|r| r.optimized_size).sum();
    let saved = saved_bytes(original_size, optimized_size);

    // Chunks the engine declined to prune carry no meaningful module counts
    let counted = results.iter().filter(|r| r.prune.skip_reason.is_none());

    LibraryStats {
        library: library.to_string(),
        chunks: results.len(),
        original_size,
        optimized_size,
        saved,
        reduction: percent(saved, original_size),
        modules_pruned: counted.clone().map(|r| r.prune.removed_count()).sum(),
        modules_kept: counted.map(|r| r.prune.kept_count()).sum(),
    }
}

/// Results grouped by library, libraries in name order, chunk order preserved.
pub fn group_by_library(results: &[OptimizationResult]) -> BTreeMap<&str, Vec<&OptimizationResult>> {
    let mut by_library: BTreeMap<&str, Vec<&OptimizationResult>> = BTreeMap::new();
    for result in results {
        by_library.entry(result.library.as_str()).or_default().push(result);
    }
    by_library
}
