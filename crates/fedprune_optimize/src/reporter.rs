use std::{
    io::{self, Write},
    path::PathBuf,
};

use colored::Colorize;
use log::debug;

use crate::{
    aggregator::{Summary, TOP_SAVINGS_LIMIT, group_by_library},
    engine::PruneReport,
    types::{OptimizationResult, SkipKind, SkippedChunk},
};

const RULE_WIDTH: usize = 60;

/// `1234567` -> `1,234,567`
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn sizes(bytes: u64) -> String {
    format!("{} ({} bytes)", format_mb(bytes), format_thousands(bytes))
}

pub fn print_no_chunks_message<W: Write>(writer: &mut W) -> io::Result<()> {
    debug!("No shared library chunks found");
    writeln!(writer, "{} No shared library chunks found to optimize.", "✓".green().bold())?;
    writer.flush()?;
    Ok(())
}

/// Per-chunk results grouped by library.
pub fn print_results<W: Write>(writer: &mut W, results: &[OptimizationResult]) -> io::Result<()> {
    writeln!(writer, "\n{}", "Optimization Summary".bold())?;
    writeln!(writer, "{}", "=".repeat(24).dimmed())?;

    for (library, results) in group_by_library(results) {
        writeln!(writer, "\n{}:", library.cyan().bold())?;
        for result in results {
            writeln!(writer, "  {}/{}:", result.app, result.file_name)?;
            writeln!(
                writer,
                "    Size reduction: {} ({} → {} bytes)",
                colored_percent(result.reduction),
                format_thousands(result.original_size as u64),
                format_thousands(result.optimized_size as u64)
            )?;
            write_prune_line(writer, &result.prune)?;
        }
    }
    Ok(())
}

fn write_prune_line<W: Write>(writer: &mut W, prune: &PruneReport) -> io::Result<()> {
    if let Some(reason) = &prune.skip_reason {
        return writeln!(writer, "    Pruning skipped: {}", reason.yellow());
    }
    let count = |list: &Option<Vec<String>>| {
        list.as_ref().map_or_else(|| "unknown".to_string(), |l| l.len().to_string())
    };
    writeln!(
        writer,
        "    Modules kept/pruned: {}/{} (original: {})",
        count(&prune.kept_modules),
        count(&prune.removed_modules),
        prune.original_count.map_or_else(|| "unknown".to_string(), |n| n.to_string())
    )
}

fn colored_percent(value: f64) -> String {
    let text = format!("{:.2}%", value);
    if value < 0.0 { text.red().to_string() } else { text.green().to_string() }
}

/// Run-wide totals, top savings, size increases and module pruning figures.
pub fn print_overall<W: Write>(writer: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(writer, "\n{}", "=".repeat(RULE_WIDTH))?;
    writeln!(writer, "{}", "OVERALL OPTIMIZATION RESULTS".bold())?;
    writeln!(writer, "{}", "=".repeat(RULE_WIDTH))?;

    writeln!(writer, "\n{}", "Bundle Size Analysis:".bold())?;
    writeln!(writer, "  Original Total Size: {}", sizes(summary.total_original as u64))?;
    writeln!(writer, "  Optimized Total Size: {}", sizes(summary.total_optimized as u64))?;
    writeln!(writer, "  {}", "-".repeat(40))?;

    let magnitude = summary.total_saved.unsigned_abs();
    if summary.is_increase() {
        writeln!(
            writer,
            "  {} Total Increase: {}",
            "⚠".yellow().bold(),
            format!("{:.2}%", summary.total_reduction.abs()).red()
        )?;
        writeln!(writer, "  Total Added: {}", sizes(magnitude))?;
    } else {
        writeln!(
            writer,
            "  {} Total Reduction: {}",
            "✓".green().bold(),
            format!("{:.2}%", summary.total_reduction).green()
        )?;
        writeln!(writer, "  Total Saved: {}", sizes(magnitude))?;
    }

    let top: Vec<_> = summary.top_savings(TOP_SAVINGS_LIMIT).collect();
    if !top.is_empty() {
        writeln!(writer, "\n{}", "Top Optimizations:".bold())?;
        for (rank, stats) in top.iter().enumerate() {
            writeln!(writer, "  {}. {}:", rank + 1, stats.library.cyan())?;
            writeln!(
                writer,
                "      Saved: {} ({:.1}%)",
                format_mb(stats.saved.unsigned_abs()),
                stats.reduction
            )?;
            if stats.modules_kept + stats.modules_pruned > 0 {
                writeln!(
                    writer,
                    "      Modules: {} kept, {} pruned",
                    stats.modules_kept, stats.modules_pruned
                )?;
            }
        }
    }

    let grown = summary.increased();
    if !grown.is_empty() {
        writeln!(writer, "\n{} {}", "⚠".yellow().bold(), "Libraries with Size Increases:".bold())?;
        for stats in grown {
            writeln!(
                writer,
                "    {}: +{} ({:.1}%)",
                stats.library,
                format_kb(stats.saved.unsigned_abs()).red(),
                stats.reduction.abs()
            )?;
        }
    }

    if summary.modules_analyzed() > 0 {
        writeln!(writer, "\n{}", "Module Pruning Summary:".bold())?;
        writeln!(writer, "  Total Modules Analyzed: {}", summary.modules_analyzed())?;
        writeln!(writer, "  Modules Kept: {}", summary.modules_kept)?;
        writeln!(writer, "  Modules Pruned: {}", summary.modules_pruned)?;
        writeln!(writer, "  Prune Rate: {:.1}%", summary.prune_rate())?;
    }

    writeln!(writer, "\n{}", "=".repeat(RULE_WIDTH))?;
    Ok(())
}

pub fn print_skipped<W: Write>(writer: &mut W, skipped: &[SkippedChunk]) -> io::Result<()> {
    if skipped.is_empty() {
        return Ok(());
    }
    debug!("Printing {} skipped chunks", skipped.len());
    writeln!(writer, "\n{} {} chunk(s) not optimized:", "ℹ".blue().bold(), skipped.len())?;
    for chunk in skipped {
        let label = match chunk.kind {
            SkipKind::Unsafe => "skipped".yellow(),
            SkipKind::NotApplied => "not applied".blue(),
            SkipKind::Failed => "failed".red(),
        };
        writeln!(
            writer,
            "  {}/{} ({}) {}: {}",
            chunk.app,
            chunk.file_name,
            chunk.library.cyan(),
            label,
            chunk.reason
        )?;
    }
    Ok(())
}

pub fn print_restored<W: Write>(writer: &mut W, restored: &[PathBuf]) -> io::Result<()> {
    if restored.is_empty() {
        writeln!(writer, "{} No backups found, nothing to restore.", "✓".green().bold())?;
    } else {
        for path in restored {
            writeln!(writer, "  restored {}", path.display())?;
        }
        writeln!(writer, "{} Restored {} chunk(s)", "✓".green().bold(), restored.len())?;
    }
    writer.flush()?;
    Ok(())
}

/// Everything the `optimize` command prints after the run.
pub fn print_summary<W: Write>(
    writer: &mut W,
    results: &[OptimizationResult],
    skipped: &[SkippedChunk],
    summary: &Summary,
) -> io::Result<()> {
    if results.is_empty() {
        writeln!(writer, "No chunks were optimized.")?;
    } else {
        print_results(writer, results)?;
        print_overall(writer, summary)?;
    }
    print_skipped(writer, skipped)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::tests::result;

    fn render(results: &[OptimizationResult], skipped: &[SkippedChunk]) -> String {
        colored::control::set_override(false);
        let summary = Summary::from_results(results);
        let mut out = Vec::new();
        print_summary(&mut out, results, skipped, &summary).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_format_sizes() {
        assert_eq!(format_mb(1024 * 1024 * 3 / 2), "1.50 MB");
        assert_eq!(format_kb(2048), "2.0 KB");
    }

    #[test]
    fn test_summary_output() {
        let output = render(
            &[result("host", "libX", 10_000, 4_000, 2, 3), result("remote", "libY", 1_000, 2_024, 1, 0)],
            &[],
        );

        assert!(output.contains("libX:"));
        assert!(output.contains("host/libX.js:"));
        assert!(output.contains("Size reduction: 60.00% (10,000 → 4,000 bytes)"));
        assert!(output.contains("Modules kept/pruned: 2/3 (original: 5)"));
        assert!(output.contains("Total Reduction: 45.24%"));
        assert!(output.contains("1. libX:"));
        assert!(output.contains("Libraries with Size Increases:"));
        assert!(output.contains("libY: +1.0 KB (102.4%)"));
        assert!(output.contains("Prune Rate: 50.0%"));
    }

    #[test]
    fn test_total_increase_output() {
        let output = render(&[result("host", "libX", 1_000, 1_500, 0, 0)], &[]);
        assert!(output.contains("Total Increase: 50.00%"));
        assert!(output.contains("Total Added:"));
        assert!(!output.contains("Top Optimizations"));
    }

    #[test]
    fn test_restored_output() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        print_restored(&mut out, &[PathBuf::from("host/dist/libX.js")]).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("restored host/dist/libX.js"));
        assert!(output.contains("Restored 1 chunk(s)"));
    }

    #[test]
    fn test_no_results_lists_skipped() {
        let skipped = SkippedChunk {
            app: "host".to_string(),
            file_name: "libX.js".to_string(),
            library: "libX".to_string(),
            kind: SkipKind::Unsafe,
            reason: "no export flags defined".to_string(),
        };
        let output = render(&[], &[skipped]);
        assert!(output.contains("No chunks were optimized."));
        assert!(output.contains("host/libX.js (libX) skipped: no export flags defined"));
    }
}
