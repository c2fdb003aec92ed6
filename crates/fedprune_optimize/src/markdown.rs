use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use log::{debug, info};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::{
    aggregator::{Summary, group_by_library},
    engine::PruneReport,
    reporter::{format_mb, format_thousands},
    types::OptimizationResult,
};

/// Removed module ids listed per chunk before the rest is summarized
pub const REMOVED_DISPLAY_LIMIT: usize = 50;

/// Kept module ids listed per chunk with `--kept-sample`
pub const KEPT_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub kept_sample: bool,
}

pub fn write_markdown_report(
    path: &Path,
    results: &[OptimizationResult],
    summary: &Summary,
    options: ReportOptions,
) -> Result<()> {
    info!("Writing pruning report to {}", path.display());
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    render_markdown_report(&mut writer, results, summary, options)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn render_markdown_report<W: Write>(
    writer: &mut W,
    results: &[OptimizationResult],
    summary: &Summary,
    options: ReportOptions,
) -> io::Result<()> {
    debug!("Rendering report for {} chunks", results.len());
    writeln!(writer, "# Module Federation Optimization Report\n")?;
    writeln!(writer, "Generated: {}\n", Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))?;

    let signed_mb = |bytes: i64| {
        let sign = if bytes < 0 { "-" } else { "" };
        format!("{}{}", sign, format_mb(bytes.unsigned_abs()))
    };
    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total Original Size:** {}", format_mb(summary.total_original as u64))?;
    writeln!(writer, "- **Total Optimized Size:** {}", format_mb(summary.total_optimized as u64))?;
    writeln!(
        writer,
        "- **Total Size Saved:** {} ({:.2}%)",
        signed_mb(summary.total_saved),
        summary.total_reduction
    )?;
    writeln!(writer, "- **Total Modules Analyzed:** {}", summary.modules_analyzed())?;
    writeln!(writer, "- **Total Modules Pruned:** {}\n", summary.modules_pruned)?;

    writeln!(writer, "## Detailed Results by Library\n")?;
    for (library, results) in group_by_library(results) {
        writeln!(writer, "### {}\n", library)?;
        for result in results {
            write_chunk(writer, result, options)?;
        }
    }
    Ok(())
}

fn write_chunk<W: Write>(
    writer: &mut W,
    result: &OptimizationResult,
    options: ReportOptions,
) -> io::Result<()> {
    writeln!(writer, "#### {}/{}\n", result.app, result.file_name)?;
    writeln!(writer, "- **Original Size:** {} bytes", format_thousands(result.original_size as u64))?;
    writeln!(writer, "- **Optimized Size:** {} bytes", format_thousands(result.optimized_size as u64))?;
    writeln!(writer, "- **Size Reduction:** {:.2}%", result.reduction)?;

    let prune = &result.prune;
    match &prune.skip_reason {
        Some(reason) => writeln!(writer, "- **Status:** Skipped ({})", reason)?,
        None => write_module_details(writer, prune, options)?,
    }
    writeln!(writer)
}

fn write_module_details<W: Write>(
    writer: &mut W,
    prune: &PruneReport,
    options: ReportOptions,
) -> io::Result<()> {
    let count = |list: &Option<Vec<String>>| {
        list.as_ref().map_or_else(|| "unknown".to_string(), |l| l.len().to_string())
    };
    writeln!(writer, "- **Module Pruning:**")?;
    writeln!(
        writer,
        "  - Original Modules: {}",
        prune.original_count.filter(|n| *n > 0).map_or_else(|| "unknown".to_string(), |n| n.to_string())
    )?;
    writeln!(writer, "  - Modules Kept: {}", count(&prune.kept_modules))?;
    writeln!(writer, "  - Modules Removed: {}", count(&prune.removed_modules))?;

    match prune.removed_modules.as_deref() {
        Some([]) => writeln!(writer, "\n**Removed Modules:** None (all modules kept)")?,
        Some(removed) => {
            writeln!(writer, "\n**Removed Modules:**\n")?;
            for module in removed.iter().take(REMOVED_DISPLAY_LIMIT) {
                writeln!(writer, "- `{}`", module)?;
            }
            if removed.len() > REMOVED_DISPLAY_LIMIT {
                writeln!(
                    writer,
                    "\n... and {} more removed modules",
                    removed.len() - REMOVED_DISPLAY_LIMIT
                )?;
            }
        }
        None => {}
    }

    if let Some(kept) = prune.kept_modules.as_deref()
        && !kept.is_empty()
    {
        writeln!(writer, "\n**Kept Modules:** {} modules retained", kept.len())?;
        if options.kept_sample {
            writeln!(writer, "\n**Sample of Kept Modules (first {}):**\n", KEPT_SAMPLE_SIZE)?;
            for module in kept.iter().take(KEPT_SAMPLE_SIZE) {
                writeln!(writer, "- `{}`", module)?;
            }
        }
    }
    Ok(())
}
