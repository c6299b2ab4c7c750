//! Runtime configuration
//!
//! Loaded once at startup from an optional JSON file. Missing fields take
//! their defaults; lookup credentials are read from the environment.

use crate::lookup::{CensysClient, CertificateLookup, LookupCredentials, RetryPolicy, DEFAULT_ENDPOINT};
use crate::{AuditError, Result};
use certaudit_detect::{Analyzer, AnalyzerMode, InProcessAnalyzer, IsolatedAnalyzer, DEFAULT_CHUNK_SIZE, DEFAULT_TOOL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runtime configuration, resolved once at startup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Collision analysis strategy
    #[serde(default)]
    pub analyzer: AnalyzerMode,
    /// Detection executable for the isolated strategy
    #[serde(default = "default_detection_tool")]
    pub detection_tool: PathBuf,
    /// Wait bound for one detection tool run, in milliseconds
    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,
    /// Bytes fed to the detection context per update
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Directory batch references resolve against
    #[serde(default = "default_archive_root")]
    pub archive_root: PathBuf,
    /// Directory collision reports are written to
    #[serde(default = "default_collision_dir")]
    pub collision_dir: PathBuf,
    /// Certificate lookup settings; credentials come from the environment
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// Certificate lookup endpoint and retry settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Base URL; the certificate hash is appended as a path segment
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Total attempts when rate limited
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff step in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_detection_tool() -> PathBuf {
    PathBuf::from(DEFAULT_TOOL)
}

fn default_tool_timeout_ms() -> u64 {
    3000
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_archive_root() -> PathBuf {
    PathBuf::from("archives")
}

fn default_collision_dir() -> PathBuf {
    PathBuf::from("collisions")
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500 // grows linearly per attempt
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerMode::default(),
            detection_tool: default_detection_tool(),
            tool_timeout_ms: default_tool_timeout_ms(),
            chunk_size: default_chunk_size(),
            archive_root: default_archive_root(),
            collision_dir: default_collision_dir(),
            lookup: LookupConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from a JSON file, or defaults when `path` is `None`
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Config` if the file cannot be read or parsed, or
    /// holds out-of-range values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| AuditError::config(format!("failed to read {}: {e}", path.display())))?;
                serde_json::from_str::<Self>(&text)
                    .map_err(|e| AuditError::config(format!("failed to parse {}: {e}", path.display())))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AuditError::config("chunk_size must be greater than zero"));
        }
        if self.tool_timeout_ms == 0 {
            return Err(AuditError::config("tool_timeout_ms must be greater than zero"));
        }
        if self.lookup.max_attempts == 0 {
            return Err(AuditError::config("lookup.max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Wait bound for one detection tool run
    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    /// Resolve the configured analyzer, optionally overriding the mode
    #[must_use]
    pub fn build_analyzer(&self, mode: Option<AnalyzerMode>) -> Analyzer {
        let mode = mode.unwrap_or(self.analyzer);
        info!(%mode, "collision analyzer selected");
        Analyzer::from_mode(
            mode,
            InProcessAnalyzer::new(self.chunk_size),
            IsolatedAnalyzer::new(&self.detection_tool, self.tool_timeout()),
        )
    }

    /// Build the lookup client when credentials are present in the environment
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Lookup` if the HTTP client cannot be built.
    pub fn build_lookup(&self) -> Result<Option<Arc<dyn CertificateLookup>>> {
        let Some(credentials) = LookupCredentials::from_env() else {
            warn!("lookup credentials not set; collision reports will hold the record itself");
            return Ok(None);
        };

        let client = CensysClient::new(
            self.lookup.endpoint.as_str(),
            credentials,
            RetryPolicy {
                max_attempts: self.lookup.max_attempts,
                backoff: Duration::from_millis(self.lookup.backoff_ms),
            },
        )?;
        Ok(Some(Arc::new(client)))
    }
}
