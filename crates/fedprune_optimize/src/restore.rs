use anyhow::{Context, Result};
use fedprune_core::{AppTarget, BACKUP_SUFFIX, CHUNK_EXTENSION};
use ignore::WalkBuilder;
use log::{debug, info, trace, warn};
use std::{fs, path::PathBuf};

/// Put every `<chunk>.original` backup back in place of its chunk.
///
/// Build output is usually git-ignored, so ignore files are not honored while
/// walking. Returns the restored chunk paths, sorted.
pub fn restore_backups(apps: &[AppTarget]) -> Result<Vec<PathBuf>> {
    let mut restored = Vec::new();

    for app in apps {
        if !app.output_dir.is_dir() {
            warn!("Output directory of '{}' not found: {}", app.name, app.output_dir.display());
            continue;
        }
        debug!("Scanning {} for backups", app.output_dir.display());

        let walker = WalkBuilder::new(&app.output_dir)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_exclude(false)
            .parents(false)
            .build();

        // Collect before renaming anything
        let mut backups = Vec::new();
        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(chunk) = chunk_for_backup(path.to_string_lossy().as_ref()) {
                backups.push((path.to_path_buf(), chunk));
            }
        }

        for (backup, chunk) in backups {
            trace!("Restoring {} from {}", chunk.display(), backup.display());
            fs::rename(&backup, &chunk).with_context(|| {
                format!("Failed to restore {} from {}", chunk.display(), backup.display())
            })?;
            restored.push(chunk);
        }
    }

    restored.sort();
    info!("Restored {} chunk(s)", restored.len());
    Ok(restored)
}

/// `dist/lib.js.original` -> `dist/lib.js`
fn chunk_for_backup(path: &str) -> Option<PathBuf> {
    let chunk = path.strip_suffix(BACKUP_SUFFIX)?;
    chunk.ends_with(CHUNK_EXTENSION).then(|| PathBuf::from(chunk))
}
