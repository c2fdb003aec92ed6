use clap::{Args, Parser};
use fedprune_core::{AppTarget, USAGE_FILE_NAME};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{markdown::ReportOptions, optimizer::OptimizeOptions};

/// Applications inspected when no `--app` is given
pub const DEFAULT_APPS: &[&str] = &["host", "remote"];

/// Build output directory of an application, relative to `<root>/<app>`
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Default report file name, relative to the root
pub const DEFAULT_REPORT_FILE: &str = "optimization_report.md";

/// Where to find the applications of a federated deployment.
#[derive(Debug, Clone, Args)]
pub struct WorkspaceArgs {
    /// Root directory of the deployment (defaults to git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Application to include, as NAME or NAME=OUTPUT_DIR (defaults to host and remote)
    #[arg(long = "app", value_name = "NAME[=DIR]")]
    pub apps: Vec<AppSpec>,

    /// Name of the usage file in each application's output directory
    #[arg(long, default_value = USAGE_FILE_NAME)]
    pub usage_file: String,
}

impl WorkspaceArgs {
    /// Resolve the application list against the project root.
    pub fn targets(&self, root: &Path) -> Vec<AppTarget> {
        if self.apps.is_empty() {
            return DEFAULT_APPS.iter().map(|name| AppSpec::named(name).target(root)).collect();
        }
        self.apps.iter().map(|spec| spec.target(root)).collect()
    }
}

/// An `--app` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    pub name: String,
    pub output_dir: Option<PathBuf>,
}

impl AppSpec {
    fn named(name: &str) -> Self {
        Self { name: name.to_string(), output_dir: None }
    }

    pub fn target(&self, root: &Path) -> AppTarget {
        let output_dir = match &self.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(&self.name).join(DEFAULT_OUTPUT_DIR),
        };
        AppTarget::new(self.name.clone(), output_dir)
    }
}

impl FromStr for AppSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, dir) = match s.split_once('=') {
            Some((name, dir)) => (name.trim(), Some(dir.trim())),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err(format!("missing application name in '{}'", s));
        }
        match dir {
            Some("") => Err(format!("missing output directory in '{}'", s)),
            Some(dir) => Ok(Self { name: name.to_string(), output_dir: Some(PathBuf::from(dir)) }),
            None => Ok(Self::named(name)),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "optimize")]
#[command(about = "Prune unused exports from shared library chunks of federated applications")]
pub struct Config {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Pruning engine executable (name on PATH or a path)
    #[arg(long)]
    pub engine: String,

    /// Extra argument passed to the engine before the config JSON
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Generate a detailed Markdown pruning report
    #[arg(short, long)]
    pub report: bool,

    /// Where to write the report (defaults to <root>/optimization_report.md)
    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// List a sample of kept modules per chunk in the report
    #[arg(long)]
    pub kept_sample: bool,

    /// Write engine output even if it does not parse as JavaScript
    #[arg(long)]
    pub no_validate: bool,

    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(long)]
    pub jobs: Option<usize>,
}

impl Config {
    pub fn optimize_options(&self) -> OptimizeOptions {
        OptimizeOptions { validate_output: !self.no_validate }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions { kept_sample: self.kept_sample }
    }

    pub fn report_path(&self, root: &Path) -> PathBuf {
        match &self.report_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root.join(path),
            None => root.join(DEFAULT_REPORT_FILE),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "merge")]
#[command(about = "Print the export usage merged across all applications")]
pub struct MergeConfig {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Write the merged usage to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "restore")]
#[command(about = "Restore optimized chunks from their .original backups")]
pub struct RestoreConfig {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,
}
