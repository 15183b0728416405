use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a whole import run. Per-record failures never surface
/// here; they end up as `RecordOutcome::Skipped` in the section report.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File {} not found", .0.to_string_lossy())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.to_string_lossy())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON file: {0}")]
    MalformedInput(String),

    #[error("Invalid CSV file: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown import section: {0}")]
    UnknownSection(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ImportError {
    /// Short machine-readable code used by sidecar error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::FileNotFound(_) => "file_not_found",
            ImportError::Read { .. } => "read_failed",
            ImportError::MalformedInput(_) => "bad_json",
            ImportError::Csv(_) => "bad_csv",
            ImportError::UnknownSection(_) => "unknown_section",
            ImportError::Store(_) => "db_failed",
            ImportError::Config(_) => "bad_config",
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
