//! Shared chunk pruning for federated applications.
//!
//! Takes the usage merged by `fedprune_core`, hands every located chunk to a
//! pruning engine with a config scoped to its library, writes the result back
//! behind a one-time `.original` backup and summarizes what was saved.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use fedprune_optimize::{CommandEngine, Config, print_summary, run_optimization};
//! use std::io::{BufWriter, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = Config::parse_from(["optimize", "--root", "/srv/shop", "--engine", "swc-prune"]);
//! let engine = CommandEngine::load(&cfg.engine, cfg.engine_args.clone())?;
//!
//! let run = run_optimization(&cfg, &engine)?;
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! print_summary(&mut stdout, &run.results, &run.skipped, &run.summary)?;
//! stdout.flush()?;
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod config;
mod engine;
mod markdown;
mod optimizer;
mod reporter;
mod restore;
mod runner;
mod types;
mod validate;

// Re-export public API
pub use aggregator::{LibraryStats, Summary, TOP_SAVINGS_LIMIT};
pub use config::{AppSpec, Config, MergeConfig, RestoreConfig, WorkspaceArgs};
pub use engine::{CommandEngine, EngineResponse, PruneEngine, PruneReport};
pub use markdown::{ReportOptions, render_markdown_report, write_markdown_report};
pub use optimizer::{
    OptimizeOptions, build_engine_config, library_keep_flags, optimize_chunk, optimize_chunks,
    write_backup,
};
pub use reporter::{print_no_chunks_message, print_restored, print_summary};
pub use restore::restore_backups;
pub use runner::{RunResult, run_merge, run_optimization, run_restore};
pub use types::{BatchOutcome, ChunkOutcome, OptimizationResult, SkipKind, SkippedChunk};
