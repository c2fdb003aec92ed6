use anyhow::{Context, Result, anyhow, bail};
use fedprune_core::FatalError;
use log::{debug, info, trace};
use serde::Serialize;
use serde_json::{Value, json};
use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

/// The source-to-source transformer that removes code.
///
/// Receives the chunk source and a config of the form
/// `{ "treeShake": { "<library>": { "<export>": bool, ..., "chunk_characteristics": {..} } } }`
/// and returns the raw JSON response. Calls for different chunks may run concurrently.
pub trait PruneEngine: Send + Sync {
    fn optimize(&self, source: &str, config_json: &str) -> Result<String>;
}

/// Runs an external executable per chunk: `<program> [args...]`.
///
/// The request is one JSON document on stdin, `{ "source": "<chunk>", "config": {..} }`,
/// and the response JSON is read from stdout. Nothing request-sized goes through argv,
/// which the OS caps per argument.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    /// Resolve the engine executable. Failure here aborts the run.
    pub fn load(program: &str, args: Vec<String>) -> Result<Self> {
        debug!("Resolving pruning engine: {}", program);
        let resolved = which::which(program).map_err(|e| {
            FatalError::EngineUnavailable(format!("'{}' could not be resolved: {}", program, e))
        })?;
        info!("Loaded pruning engine from: {}", resolved.display());
        Ok(Self { program: resolved, args })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl PruneEngine for CommandEngine {
    fn optimize(&self, source: &str, config_json: &str) -> Result<String> {
        let config: Value =
            serde_json::from_str(config_json).context("Engine config is not valid JSON")?;
        let request = json!({ "source": source, "config": config }).to_string();

        trace!(
            "Spawning {} with {} extra args ({} byte request)",
            self.program.display(),
            self.args.len(),
            request.len()
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        let mut stdin = child.stdin.take().context("Engine stdin was not captured")?;

        // Feed stdin from another thread so a chatty engine cannot fill its stdout pipe
        // while we are still writing.
        let (written, output) = thread::scope(|s| {
            let writer = s.spawn(move || stdin.write_all(request.as_bytes()));
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.context("Failed to wait for the pruning engine")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Pruning engine exited with {}: {}", output.status, stderr.trim());
        }
        written
            .map_err(|_| anyhow!("Engine input writer panicked"))?
            .context("Failed to send the request to the pruning engine")?;

        String::from_utf8(output.stdout).context("Pruning engine output is not valid UTF-8")
    }
}

/// Validated engine response.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineResponse {
    Success { optimized_source: String, prune: PruneReport },
    Skipped { reason: String },
    EngineError { message: String },
}

impl EngineResponse {
    /// Parse and classify the engine's JSON. Only invalid JSON is an error.
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).context("Optimizer did not return valid JSON")?;
        Ok(Self::from_value(&value))
    }

    fn from_value(value: &Value) -> Self {
        if let Some(source) = value.get("optimized_source").and_then(Value::as_str)
            && !source.is_empty()
        {
            return EngineResponse::Success {
                optimized_source: source.to_string(),
                prune: PruneReport::from_value(value.get("prune_result")),
            };
        }

        match value.get("error") {
            Some(Value::String(message)) if !message.is_empty() => {
                EngineResponse::EngineError { message: message.clone() }
            }
            Some(Value::Null) | Some(Value::Bool(false)) | Some(Value::String(_)) | None => {
                EngineResponse::Skipped { reason: "unexpected response shape".to_string() }
            }
            Some(other) => EngineResponse::EngineError { message: other.to_string() },
        }
    }
}

/// Module-level outcome reported by the engine for one chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PruneReport {
    pub original_count: Option<u64>,
    pub kept_modules: Option<Vec<String>>,
    pub removed_modules: Option<Vec<String>>,
    pub skip_reason: Option<String>,
}

impl PruneReport {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return PruneReport::default();
        };
        PruneReport {
            original_count: value.get("original_count").and_then(Value::as_u64),
            kept_modules: module_list(value.get("kept_modules")),
            removed_modules: module_list(value.get("removed_modules")),
            skip_reason: value
                .get("skip_reason")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    pub fn kept_count(&self) -> usize {
        self.kept_modules.as_ref().map_or(0, Vec::len)
    }

    pub fn removed_count(&self) -> usize {
        self.removed_modules.as_ref().map_or(0, Vec::len)
    }
}

fn module_list(value: Option<&Value>) -> Option<Vec<String>> {
    let modules = value?.as_array()?;
    Some(
        modules
            .iter()
            .map(|m| match m {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}
