use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::{fs, path::Path};

use crate::{
    error::FatalError,
    types::{AppTarget, LoadedReport, UsageReport},
};

/// Load the usage file of every application that has one.
///
/// Missing or unreadable files only drop that application. Ending up with no
/// report at all is fatal, since there would be nothing to merge.
pub fn load_usage_reports(apps: &[AppTarget], usage_file: &str) -> Result<Vec<LoadedReport>> {
    info!("Reading {} files for {} apps", usage_file, apps.len());
    let mut loaded = Vec::new();

    for app in apps {
        let path = app.output_dir.join(usage_file);
        if !path.is_file() {
            debug!("No usage file for '{}' at {}", app.name, path.display());
            continue;
        }

        match read_usage_report(&path) {
            Ok(report) => {
                debug!(
                    "Loaded usage for '{}' ({} libraries) from {}",
                    app.name,
                    report.tree_shake.len(),
                    path.display()
                );
                loaded.push(LoadedReport {
                    app: app.name.clone(),
                    report,
                    source_path: path,
                    output_dir: app.output_dir.clone(),
                });
            }
            Err(e) => warn!("Ignoring usage file for '{}': {:#}", app.name, e),
        }
    }

    if loaded.is_empty() {
        return Err(FatalError::NoUsageReports {
            file_name: usage_file.to_string(),
            apps: apps.iter().map(|a| a.name.clone()).collect(),
        }
        .into());
    }

    info!("Found {} usage files", loaded.len());
    Ok(loaded)
}

pub fn read_usage_report(path: &Path) -> Result<UsageReport> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
