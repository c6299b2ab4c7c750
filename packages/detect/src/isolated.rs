//! Subprocess collision analysis
//!
//! Each record is written to its own temporary file and handed to an external
//! detection tool (`sha1dcsum`-compatible) as its only argument. The tool's
//! stdout and stderr are captured and scanned for [`COLLISION_SENTINEL`]; exit
//! status and timing carry no meaning beyond the wait bound.

use crate::{CollisionAnalyzer, DetectError, Result};
use async_trait::async_trait;
use certaudit_archive::CertificateRecord;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Marker the detection tool prints next to a file with a collision
pub const COLLISION_SENTINEL: &str = "*coll*";

/// Default detection executable, resolved through `PATH`
pub const DEFAULT_TOOL: &str = "sha1dcsum";

/// Default bound on waiting for the tool to exit
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Grace period for draining pipes once the tool has exited or been killed
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Performs SHA-1 collision analysis by invoking a new process per record
#[derive(Clone, Debug)]
pub struct IsolatedAnalyzer {
    tool: PathBuf,
    timeout: Duration,
}

impl Default for IsolatedAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL, DEFAULT_TIMEOUT)
    }
}

/// Whether captured tool output reports a collision
#[must_use]
pub fn scan_output(output: &str) -> bool {
    output.contains(COLLISION_SENTINEL)
}

impl IsolatedAnalyzer {
    /// Analyzer running `tool`, waiting at most `timeout` for it to exit
    #[must_use]
    pub fn new(tool: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }

    /// Path of the detection tool
    #[must_use]
    pub fn tool(&self) -> &Path {
        &self.tool
    }

    /// Write `bytes` to a scratch file, run the tool on it and scan its output.
    ///
    /// The scratch file is removed on every path. A removal failure is logged
    /// and does not change the result.
    ///
    /// # Errors
    ///
    /// Returns `DetectError::TempFile` if the scratch file cannot be written,
    /// `DetectError::Spawn` if the tool cannot be started, or
    /// `DetectError::Task` if the blocking file task dies.
    pub async fn evaluate(&self, bytes: &[u8]) -> Result<bool> {
        let scratch = tokio::task::spawn_blocking(|| {
            tempfile::Builder::new()
                .prefix("certaudit-")
                .suffix(".der")
                .tempfile()
        })
        .await?
        .map_err(DetectError::TempFile)?;

        let outcome = match tokio::fs::write(scratch.path(), bytes).await {
            Ok(()) => self.run_tool(scratch.path()).await,
            Err(e) => Err(DetectError::TempFile(e)),
        };

        let scratch_path = scratch.path().display().to_string();
        match tokio::task::spawn_blocking(move || scratch.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(path = %scratch_path, error = %e, "failed to delete scratch file"),
            Err(e) => warn!(path = %scratch_path, error = %e, "scratch cleanup task failed"),
        }

        let output = outcome?;
        Ok(scan_output(&output))
    }

    /// Run the tool on `path`, returning combined stdout and stderr text.
    ///
    /// After the wait bound elapses the tool is killed and whatever output was
    /// captured so far is returned.
    async fn run_tool(&self, path: &Path) -> Result<String> {
        let mut child = Command::new(&self.tool)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DetectError::spawn(&self.tool, e))?;

        let stdout = Arc::new(Mutex::new(Vec::new()));
        let stderr = Arc::new(Mutex::new(Vec::new()));

        let stdout_pump = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, Arc::clone(&stdout))));
        let stderr_pump = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, Arc::clone(&stderr))));

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => debug!(tool = %self.tool.display(), %status, "detection tool exited"),
            Ok(Err(e)) => warn!(tool = %self.tool.display(), error = %e, "failed waiting on detection tool"),
            Err(_) => {
                warn!(
                    tool = %self.tool.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "detection tool timed out; using captured output"
                );
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "detection tool already gone");
                }
            }
        }

        let _ = tokio::time::timeout(DRAIN_GRACE, async {
            for pump in [stdout_pump, stderr_pump].into_iter().flatten() {
                let _ = pump.await;
            }
        })
        .await;

        let stdout = stdout.lock().await;
        let stderr = stderr.lock().await;
        Ok(format!(
            "[stdout]:{}\r\n[stderr]:{}",
            String::from_utf8_lossy(&stdout),
            String::from_utf8_lossy(&stderr)
        ))
    }
}

/// Copy a pipe into a shared buffer until EOF or error
async fn pump<R: AsyncRead + Unpin>(mut pipe: R, sink: Arc<Mutex<Vec<u8>>>) {
    let mut buf = [0u8; 4096];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().await.extend_from_slice(&buf[..n]),
        }
    }
}

#[async_trait]
impl CollisionAnalyzer for IsolatedAnalyzer {
    async fn analyze(&self, record: &CertificateRecord) -> Result<bool> {
        if !record.is_resolvable() {
            return Ok(false);
        }

        let der = record.der_bytes()?;
        let collision = self.evaluate(&der).await?;
        debug!(
            content_hash = record.content_hash(),
            collision,
            "isolated analysis finished"
        );
        Ok(collision)
    }
}
