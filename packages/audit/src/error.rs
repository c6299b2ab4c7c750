//! Error types for the audit pipeline

use certaudit_archive::ArchiveError;
use certaudit_detect::DetectError;
use std::fmt;
use thiserror::Error;

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Main error type for the audit pipeline
#[derive(Error, Debug)]
pub enum AuditError {
    /// Archive open, decompression or record decoding failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Collision analysis failed
    #[error(transparent)]
    Detect(#[from] DetectError),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive reference could not be fetched
    #[error("Failed to fetch {reference}: {reason}")]
    Fetch {
        /// Archive reference
        reference: String,
        /// Failure description
        reason: String,
    },

    /// A collision report could not be written
    #[error("Collision store write for {key} failed: {reason}")]
    Store {
        /// Store key
        key: String,
        /// Failure description
        reason: String,
    },

    /// The certificate lookup request failed before a response
    #[error("Certificate lookup failed: {0}")]
    Lookup(String),

    /// The certificate lookup answered with a failure status
    #[error("Certificate lookup returned HTTP {status} after {attempts} attempt(s)")]
    LookupStatus {
        /// HTTP status code
        status: u16,
        /// Attempts made, including retries
        attempts: u32,
    },

    /// A transient local copy could not be removed
    #[error("Failed to clean up {path}: {source}")]
    Cleanup {
        /// Path of the transient file
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Processing stopped on a cancellation request before the archive was
    /// finished or attempted
    #[error("Cancelled before the archive was fully processed")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuditError {
    /// Create a `Fetch` error
    #[must_use]
    pub fn fetch(reference: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Fetch {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a `Store` error
    #[must_use]
    pub fn store(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Store {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a `Lookup` error with a formatted message
    #[must_use]
    pub fn lookup(msg: impl fmt::Display) -> Self {
        Self::Lookup(msg.to_string())
    }

    /// Create a `Config` error with a formatted message
    #[must_use]
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }
}
