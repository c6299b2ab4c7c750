//! Archive sources: where batch references are fetched from

use crate::{AuditError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Fetches the archive named by a reference into a local file
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Copy the archive for `reference` into `dest`, replacing its contents
    async fn fetch(&self, reference: &str, dest: &Path) -> Result<()>;
}

/// Archive source backed by a local directory tree
#[derive(Clone, Debug)]
pub struct LocalArchiveSource {
    root: PathBuf,
}

impl LocalArchiveSource {
    /// Source resolving references relative to `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory references resolve against
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a reference to a path under the root
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Fetch` for references that escape the root.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        validate_reference(reference)?;
        Ok(self.root.join(reference))
    }

    /// List archive references under `prefix`, in path order.
    ///
    /// Only files that sit inside a folder are archives; top-level entries
    /// without a folder component are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Fetch` for an unsafe prefix, or `AuditError::Io`
    /// if the tree cannot be walked.
    pub fn enumerate(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let start = match prefix {
            Some(prefix) if !prefix.is_empty() => {
                validate_reference(prefix)?;
                self.root.join(prefix)
            }
            _ => self.root.clone(),
        };

        if !start.exists() {
            return Ok(Vec::new());
        }

        let mut references = Vec::new();
        for entry in WalkDir::new(&start).sort_by_file_name() {
            let entry = entry.map_err(|e| AuditError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if relative.components().count() < 2 {
                continue;
            }
            let reference = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            references.push(reference);
        }
        Ok(references)
    }
}

#[async_trait]
impl ArchiveSource for LocalArchiveSource {
    async fn fetch(&self, reference: &str, dest: &Path) -> Result<()> {
        let path = self.resolve(reference)?;
        let bytes = tokio::fs::copy(&path, dest)
            .await
            .map_err(|e| AuditError::fetch(reference, e))?;
        debug!(reference, bytes, "fetched archive");
        Ok(())
    }
}

/// Reject references that are absolute or climb out of the source root
fn validate_reference(reference: &str) -> Result<()> {
    if reference.is_empty() {
        return Err(AuditError::fetch(reference, "empty reference"));
    }
    if reference.split(['/', '\\']).any(|part| part == "..") {
        return Err(AuditError::fetch(reference, "reference contains a parent directory component"));
    }
    if reference.starts_with('/') || reference.starts_with('\\') || reference.contains(':') {
        return Err(AuditError::fetch(reference, "reference must be relative"));
    }
    if reference.contains('\0') {
        return Err(AuditError::fetch(reference, "reference contains a null byte"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_references() {
        for bad in ["", "../etc/passwd", "a/../../b", "/abs/path.gz", "C:\\x.gz", "a\0b"] {
            assert!(validate_reference(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(validate_reference("2024/01/certs.gz").is_ok());
        assert!(validate_reference("folder/..hidden.gz").is_ok());
    }

    #[test]
    fn enumerate_skips_top_level_files() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("2024/02"))?;
        std::fs::write(dir.path().join("loose.gz"), b"x")?;
        std::fs::write(dir.path().join("2024/b.gz"), b"x")?;
        std::fs::write(dir.path().join("2024/02/a.gz"), b"x")?;

        let source = LocalArchiveSource::new(dir.path());
        assert_eq!(source.enumerate(None)?, vec!["2024/02/a.gz", "2024/b.gz"]);
        assert_eq!(source.enumerate(Some("2024/02"))?, vec!["2024/02/a.gz"]);
        assert!(source.enumerate(Some("missing"))?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn fetch_missing_reference_is_a_fetch_error() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let source = LocalArchiveSource::new(dir.path());
        let dest = dir.path().join("copy");

        let result = source.fetch("nope/missing.gz", &dest).await;
        assert!(matches!(result, Err(AuditError::Fetch { .. })));
        Ok(())
    }
}
