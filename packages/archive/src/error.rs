//! Error types for the archive crate

use std::fmt;
use thiserror::Error;

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Main error type for archive decoding
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive could not be opened
    #[error("Failed to open archive {path}: {source}")]
    Open {
        /// Path that was opened
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The compressed stream is not valid gzip or ended early
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// A decompressed line is not a valid record object
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number within the decompressed body
        line: u64,
        /// Parse failure or length violation
        reason: String,
    },

    /// A record field is not valid base64
    #[error("Invalid {field} encoding: {reason}")]
    InvalidEncoding {
        /// JSON field name
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    /// A content hash could not be parsed as hex
    #[error("Invalid content hash: {0}")]
    InvalidHash(String),
}

impl ArchiveError {
    /// Create a `DecompressionFailed` error with a formatted message
    #[must_use]
    pub fn decompression_failed(msg: impl fmt::Display) -> Self {
        Self::DecompressionFailed(msg.to_string())
    }

    /// Create a `MalformedRecord` error for the given line
    #[must_use]
    pub fn malformed_record(line: u64, msg: impl fmt::Display) -> Self {
        Self::MalformedRecord {
            line,
            reason: msg.to_string(),
        }
    }

    /// Create an `InvalidEncoding` error for the given field
    #[must_use]
    pub fn invalid_encoding(field: &'static str, msg: impl fmt::Display) -> Self {
        Self::InvalidEncoding {
            field,
            reason: msg.to_string(),
        }
    }

    /// Create an `InvalidHash` error with a formatted message
    #[must_use]
    pub fn invalid_hash(msg: impl fmt::Display) -> Self {
        Self::InvalidHash(msg.to_string())
    }

    /// Whether this error ends the record sequence.
    ///
    /// Open and decompression failures are archive-level; everything else
    /// concerns one record and the sequence continues past it.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::DecompressionFailed(_))
    }
}
