//! Collision analyzer capability and strategy selection

use crate::{DetectError, InProcessAnalyzer, IsolatedAnalyzer, Result};
use async_trait::async_trait;
use certaudit_archive::CertificateRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decides whether a record's raw bytes carry a SHA-1 collision-attack signature.
///
/// Contract shared by every strategy:
/// - a record with an empty content hash or empty raw field returns
///   `Ok(false)` without running detection
/// - malformed raw encoding is an `Err`, never folded into the boolean
#[async_trait]
pub trait CollisionAnalyzer: Send + Sync {
    /// Analyze one record
    async fn analyze(&self, record: &CertificateRecord) -> Result<bool>;
}

/// Execution strategy for collision analysis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerMode {
    /// Drive the detection state machine inside this process
    #[default]
    InProcess,
    /// Run the external detection tool once per record
    Isolated,
}

impl fmt::Display for AnalyzerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProcess => write!(f, "in-process"),
            Self::Isolated => write!(f, "isolated"),
        }
    }
}

impl FromStr for AnalyzerMode {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in-process" | "inprocess" => Ok(Self::InProcess),
            "isolated" => Ok(Self::Isolated),
            other => Err(DetectError::InvalidMode(other.to_string())),
        }
    }
}

/// The configured analyzer, resolved once at startup
pub enum Analyzer {
    /// In-process strategy
    InProcess(InProcessAnalyzer),
    /// Subprocess strategy
    Isolated(IsolatedAnalyzer),
}

impl Analyzer {
    /// Build the analyzer for `mode`
    ///
    /// `isolated` is only used when the mode selects the isolated strategy.
    #[must_use]
    pub fn from_mode(mode: AnalyzerMode, in_process: InProcessAnalyzer, isolated: IsolatedAnalyzer) -> Self {
        match mode {
            AnalyzerMode::InProcess => Self::InProcess(in_process),
            AnalyzerMode::Isolated => Self::Isolated(isolated),
        }
    }

    /// Mode of this analyzer
    #[must_use]
    pub fn mode(&self) -> AnalyzerMode {
        match self {
            Self::InProcess(_) => AnalyzerMode::InProcess,
            Self::Isolated(_) => AnalyzerMode::Isolated,
        }
    }
}

#[async_trait]
impl CollisionAnalyzer for Analyzer {
    async fn analyze(&self, record: &CertificateRecord) -> Result<bool> {
        match self {
            Self::InProcess(analyzer) => analyzer.analyze(record).await,
            Self::Isolated(analyzer) => analyzer.analyze(record).await,
        }
    }
}
