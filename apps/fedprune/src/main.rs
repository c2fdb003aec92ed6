use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use fedprune_optimize::{CommandEngine, Config, MergeConfig, RestoreConfig};
use log::{debug, info};
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fedprune")]
#[command(about = "Post-build pruning of library chunks shared by federated applications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prune unused exports from the shared library chunks of every application
    Optimize(Config),
    /// Print the export usage merged across all applications
    Merge(MergeConfig),
    /// Restore optimized chunks from their .original backups
    Restore(RestoreConfig),
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Optimize(cfg) => {
            // Fatal before anything is read or written
            let engine = CommandEngine::load(&cfg.engine, cfg.engine_args.clone())?;

            if let Some(jobs) = cfg.jobs {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build_global()
                    .context("Failed to configure the worker pool")?;
            }
            let num_threads = rayon::current_num_threads();
            info!(
                "Running optimization with engine {} (using {} threads)",
                engine.program().display(),
                num_threads
            );

            let run = fedprune_optimize::run_optimization(&cfg, &engine)?;
            debug!("Optimized {} chunks, skipped {}", run.results.len(), run.skipped.len());

            if run.chunks_found == 0 {
                fedprune_optimize::print_no_chunks_message(&mut stdout)?;
            } else {
                fedprune_optimize::print_summary(
                    &mut stdout,
                    &run.results,
                    &run.skipped,
                    &run.summary,
                )?;
            }
            if let Some(path) = &run.report_path {
                writeln!(stdout, "{} Detailed report saved to: {}", "✓".green().bold(), path.display())?;
            }

            let elapsed_ms = start.elapsed().as_millis();
            writeln!(
                stdout,
                "\n{} Finished in {}ms on {} chunks from {} apps (using {} threads).",
                "●".bright_blue(),
                elapsed_ms.to_string().cyan(),
                run.chunks_found.to_string().cyan(),
                run.apps.len().to_string().cyan(),
                num_threads.to_string().cyan()
            )?;
            stdout.flush()?;

            Ok(())
        }
        Commands::Merge(cfg) => {
            let merged = fedprune_optimize::run_merge(&cfg)?;
            info!("Merged usage of {} libraries", merged.tree_shake.len());

            if cfg.output.is_none() {
                let json = serde_json::to_string_pretty(&merged)?;
                writeln!(stdout, "{}", json)?;
            }
            stdout.flush()?;

            Ok(())
        }
        Commands::Restore(cfg) => {
            let restored = fedprune_optimize::run_restore(&cfg)?;
            fedprune_optimize::print_restored(&mut stdout, &restored)?;

            let elapsed_ms = start.elapsed().as_millis();
            writeln!(stdout, "\n{} Finished in {}ms.", "●".bright_blue(), elapsed_ms.to_string().cyan())?;
            stdout.flush()?;

            Ok(())
        }
    }
}
