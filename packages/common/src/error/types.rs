//! Fault taxonomy for the audit pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Granularity at which a fault was caught while processing one archive.
///
/// A record fault is recovered and the archive continues; an archive fault
/// ends the remainder of that archive. Neither aborts sibling archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultScope {
    /// Malformed encoding or analyzer failure for a single record
    Record,

    /// The archive stream could not be opened or decompressed
    Archive,
}

impl fmt::Display for FaultScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record => f.write_str("record fault"),
            Self::Archive => f.write_str("archive fault"),
        }
    }
}
