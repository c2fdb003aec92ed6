use chrono::Utc;
use log::{debug, trace};
use std::collections::BTreeMap;

use crate::types::{LoadedReport, MergeMetadata, MergedUsage};

/// OR-merge export flags across all applications.
///
/// An export ends up `true` as soon as one application uses it and can never be
/// turned back. Chunk characteristics are not part of the merge.
pub fn merge_usage(reports: &[LoadedReport]) -> MergedUsage {
    let mut tree_shake: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();

    for loaded in reports {
        trace!("Merging usage from '{}'", loaded.app);
        for (library, usage) in &loaded.report.tree_shake {
            let merged = tree_shake.entry(library.clone()).or_default();
            for (export, used) in &usage.exports {
                *merged.entry(export.clone()).or_insert(false) |= *used;
            }
        }
    }

    debug!("Merged export flags for {} libraries", tree_shake.len());
    let metadata = MergeMetadata {
        timestamp: Utc::now().to_rfc3339(),
        apps: reports.iter().map(|r| r.app.clone()).collect(),
        libraries: tree_shake.keys().cloned().collect(),
    };
    MergedUsage { tree_shake, metadata }
}
