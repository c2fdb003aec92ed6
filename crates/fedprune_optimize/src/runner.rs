use anyhow::{Context, Result};
use fedprune_core::{MergedUsage, load_usage_reports, locate_chunks, merge_usage, resolve_root};
use log::{debug, info};
use std::{fs, path::PathBuf};

use crate::{
    aggregator::Summary,
    config::{Config, MergeConfig, RestoreConfig},
    engine::PruneEngine,
    markdown::write_markdown_report,
    optimizer::optimize_chunks,
    restore::restore_backups,
    types::{OptimizationResult, SkippedChunk},
};

/// Everything one `optimize` run produced.
#[derive(Debug)]
pub struct RunResult {
    pub root: PathBuf,
    /// Applications whose usage file was loaded
    pub apps: Vec<String>,
    pub libraries: Vec<String>,
    pub chunks_found: usize,
    pub results: Vec<OptimizationResult>,
    pub skipped: Vec<SkippedChunk>,
    pub summary: Summary,
    /// Set when a Markdown report was written
    pub report_path: Option<PathBuf>,
}

/// Load, merge, locate, optimize and summarize.
///
/// Only fails on the fatal conditions (no usage file anywhere) or when the
/// requested report cannot be written; per-chunk problems end up in `skipped`.
pub fn run_optimization(cfg: &Config, engine: &dyn PruneEngine) -> Result<RunResult> {
    info!("Starting shared chunk optimization");

    let root = resolve_root(cfg.workspace.root.clone())?;
    let targets = cfg.workspace.targets(&root);
    debug!("Application targets: {:?}", targets);

    let reports = load_usage_reports(&targets, &cfg.workspace.usage_file)?;
    let apps: Vec<String> = reports.iter().map(|r| r.app.clone()).collect();
    info!("Found {} usage files: {}", reports.len(), apps.join(", "));

    let merged = merge_usage(&reports);
    info!(
        "Prepared merged export flags for libraries: {}",
        merged.metadata.libraries.join(", ")
    );

    let chunks = locate_chunks(&reports);

    let batch = optimize_chunks(&chunks, &merged, engine, cfg.optimize_options());
    let summary = Summary::from_results(&batch.results);
    info!(
        "Optimized {} of {} chunks ({} skipped)",
        batch.results.len(),
        chunks.len(),
        batch.skipped.len()
    );

    let report_path = if cfg.report && !batch.results.is_empty() {
        let path = cfg.report_path(&root);
        write_markdown_report(&path, &batch.results, &summary, cfg.report_options())?;
        Some(path)
    } else {
        None
    };

    Ok(RunResult {
        root,
        apps,
        libraries: merged.metadata.libraries,
        chunks_found: chunks.len(),
        results: batch.results,
        skipped: batch.skipped,
        summary,
        report_path,
    })
}

/// Merged usage across all applications, written to `--output` when given.
pub fn run_merge(cfg: &MergeConfig) -> Result<MergedUsage> {
    let root = resolve_root(cfg.workspace.root.clone())?;
    let reports = load_usage_reports(&cfg.workspace.targets(&root), &cfg.workspace.usage_file)?;
    let merged = merge_usage(&reports);

    if let Some(output) = &cfg.output {
        let json = serde_json::to_string_pretty(&merged).context("Failed to serialize merged usage")?;
        fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Merged usage written to {}", output.display());
    }
    Ok(merged)
}

pub fn run_restore(cfg: &RestoreConfig) -> Result<Vec<PathBuf>> {
    let root = resolve_root(cfg.workspace.root.clone())?;
    restore_backups(&cfg.workspace.targets(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::tests::FakeEngine;
    use clap::Parser;
    use fedprune_core::FatalError;
    use serde_json::{Value, json};
    use std::path::Path;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn config(root: &Path, extra: &[&str]) -> Config {
        let root = root.to_string_lossy().to_string();
        let mut args = vec!["optimize", "--root", root.as_str(), "--engine", "engine"];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).unwrap()
    }

    const LIB_SOURCE: &str = "var a = 1;\nvar b = 2;\n";

    /// host uses `a`, remote uses neither; each emitted its own libX chunk.
    fn host_remote_fixture(root: &Path) {
        create_test_file(
            root,
            "host/dist/share-usage.json",
            &json!({ "treeShake": { "libX": {
                "a": true,
                "b": false,
                "chunk_characteristics": { "entry_module_id": "h1", "chunk_files": ["libX.js"] }
            } } })
            .to_string(),
        );
        create_test_file(
            root,
            "remote/dist/share-usage.json",
            &json!({ "treeShake": { "libX": {
                "a": false,
                "b": false,
                "chunk_characteristics": {
                    "entry_module_id": "r1",
                    "chunk_files": ["libX.js", "libX.js.map"]
                }
            } } })
            .to_string(),
        );
        create_test_file(root, "host/dist/libX.js", LIB_SOURCE);
        create_test_file(root, "remote/dist/libX.js", LIB_SOURCE);
        create_test_file(root, "remote/dist/libX.js.map", "{}");
    }

    #[test]
    fn test_host_remote_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        host_remote_fixture(root);
        let engine = FakeEngine::first_line();

        let run = run_optimization(&config(root, &["-r"]), &engine).unwrap();

        assert_eq!(run.apps, vec!["host", "remote"]);
        assert_eq!(run.chunks_found, 2);
        assert_eq!(run.results.len(), 2);
        assert!(run.skipped.is_empty());
        assert_eq!(run.results[0].app, "host");
        assert_eq!(run.results[1].app, "remote");

        let mut calls = engine.calls();
        assert_eq!(calls.len(), 2);
        calls.sort_by_key(|(_, config)| {
            config["treeShake"]["libX"]["chunk_characteristics"]["entry_module_id"].to_string()
        });
        for (_, config) in &calls {
            let lib = &config["treeShake"]["libX"];
            assert_eq!(lib["a"], json!(true));
            assert_eq!(lib["b"], json!(false));
            assert_eq!(config["treeShake"].as_object().map(|m| m.len()), Some(1));
        }
        let entries: Vec<&Value> = calls
            .iter()
            .map(|(_, c)| &c["treeShake"]["libX"]["chunk_characteristics"]["entry_module_id"])
            .collect();
        assert_eq!(entries, vec![&json!("h1"), &json!("r1")]);

        for app in ["host", "remote"] {
            let dist = root.join(app).join("dist");
            assert_eq!(fs::read_to_string(dist.join("libX.js")).unwrap(), "var a = 1;");
            assert_eq!(fs::read_to_string(dist.join("libX.js.original")).unwrap(), LIB_SOURCE);
        }
        assert_eq!(fs::read_to_string(root.join("remote/dist/libX.js.map")).unwrap(), "{}");

        assert_eq!(run.summary.total_saved, 2 * "var b = 2;\n".len() as i64 + 2);
        let report = run.report_path.unwrap();
        assert_eq!(report, root.canonicalize().unwrap().join("optimization_report.md"));
        assert!(fs::read_to_string(report).unwrap().contains("#### remote/libX.js"));
    }

    #[test]
    fn test_no_usage_files_is_fatal_and_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let chunk = create_test_file(root, "host/dist/libX.js", LIB_SOURCE);
        create_test_file(root, "remote/dist/share-usage.json", "{ not json");
        let engine = FakeEngine::first_line();

        let err = run_optimization(&config(root, &[]), &engine).unwrap_err();

        assert!(matches!(err.downcast_ref::<FatalError>(), Some(FatalError::NoUsageReports { .. })));
        assert!(engine.calls().is_empty());
        assert_eq!(fs::read_to_string(&chunk).unwrap(), LIB_SOURCE);
        assert!(!root.join("host/dist/libX.js.original").exists());
    }

    #[test]
    fn test_missing_app_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        host_remote_fixture(root);
        fs::remove_file(root.join("remote/dist/share-usage.json")).unwrap();
        let engine = FakeEngine::first_line();

        let run = run_optimization(&config(root, &[]), &engine).unwrap();
        assert_eq!(run.apps, vec!["host"]);
        assert_eq!(run.results.len(), 1);
        assert!(run.report_path.is_none());
        assert_eq!(fs::read_to_string(root.join("remote/dist/libX.js")).unwrap(), LIB_SOURCE);
    }

    #[test]
    fn test_custom_app_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "apps/shell/build/share-usage.json",
            &json!({ "treeShake": { "libZ": {
                "z": true,
                "chunk_characteristics": { "entry_module_id": 7, "chunk_files": ["libZ.js"] }
            } } })
            .to_string(),
        );
        create_test_file(root, "apps/shell/build/libZ.js", LIB_SOURCE);
        let engine = FakeEngine::first_line();

        let run =
            run_optimization(&config(root, &["--app", "shell=apps/shell/build"]), &engine).unwrap();
        assert_eq!(run.apps, vec!["shell"]);
        assert_eq!(run.libraries, vec!["libZ"]);
        assert_eq!(run.results.len(), 1);
    }

    #[test]
    fn test_merge_and_restore() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        host_remote_fixture(root);
        let root_arg = root.to_string_lossy().to_string();

        let output = root.join("merged.json");
        let output_arg = output.to_string_lossy().to_string();
        let merge_args = ["merge", "--root", root_arg.as_str(), "-o", output_arg.as_str()];
        let merge_cfg = MergeConfig::try_parse_from(merge_args).unwrap();
        let merged = run_merge(&merge_cfg).unwrap();
        assert_eq!(merged.tree_shake["libX"]["a"], true);
        assert_eq!(merged.tree_shake["libX"]["b"], false);
        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["metadata"]["apps"], json!(["host", "remote"]));

        let engine = FakeEngine::first_line();
        run_optimization(&config(root, &[]), &engine).unwrap();

        let restore_cfg =
            RestoreConfig::try_parse_from(["restore", "--root", root_arg.as_str()]).unwrap();
        let restored = run_restore(&restore_cfg).unwrap();
        assert_eq!(restored.len(), 2);
        for app in ["host", "remote"] {
            let dist = root.join(app).join("dist");
            assert_eq!(fs::read_to_string(dist.join("libX.js")).unwrap(), LIB_SOURCE);
            assert!(!dist.join("libX.js.original").exists());
        }
    }
}
