//! Error handling for collision analysis

use certaudit_archive::ArchiveError;
use std::path::Path;
use thiserror::Error;

/// Collision-analysis errors
#[derive(Debug, Error)]
pub enum DetectError {
    /// The record's raw bytes could not be decoded
    #[error("Record error: {0}")]
    Record(#[from] ArchiveError),

    /// The scratch file for the detection tool could not be written
    #[error("Temporary file error: {0}")]
    TempFile(#[source] std::io::Error),

    /// The detection tool could not be started
    #[error("Failed to start detection tool {tool}: {source}")]
    Spawn {
        /// Tool path as configured
        tool: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A blocking detection task panicked or was cancelled
    #[error("Detection task failed: {0}")]
    Task(String),

    /// Unknown analyzer mode name
    #[error("Invalid analyzer mode: {0}")]
    InvalidMode(String),
}

impl DetectError {
    /// Create a spawn error for the given tool path
    #[must_use]
    pub fn spawn(tool: &Path, source: std::io::Error) -> Self {
        Self::Spawn {
            tool: tool.display().to_string(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for DetectError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Result type for collision analysis
pub type Result<T> = std::result::Result<T, DetectError>;
