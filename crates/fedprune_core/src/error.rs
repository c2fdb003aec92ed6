use thiserror::Error;

/// Conditions that abort the whole run before any chunk is touched.
///
/// Everything else (a bad library entry, a chunk the engine rejects) is handled
/// where it happens and never reaches the caller.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("Pruning engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error(
        "No usable {file_name} files found for apps: {}. Please run the build first.",
        .apps.join(", ")
    )]
    NoUsageReports { file_name: String, apps: Vec<String> },
}
