//! Collision store: one write-once object per colliding record

use crate::{AuditError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Durable sink for collision reports keyed by content hash
///
/// Writing the same key twice with the same bytes must be harmless, since a
/// redelivered batch reports its collisions again.
#[async_trait]
pub trait CollisionStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous object
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Collision store writing one file per key into a directory
#[derive(Clone, Debug)]
pub struct FsCollisionStore {
    dir: PathBuf,
}

impl FsCollisionStore {
    /// Store rooted at `dir`, created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the store writes into
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CollisionStore for FsCollisionStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if key.is_empty() || key.contains(['/', '\\', '\0']) || key.starts_with('.') {
            return Err(AuditError::store(key, "key must be a plain file name"));
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AuditError::store(key, e))?;

        let path = self.dir.join(key);
        let temp_path = self.dir.join(format!(".{key}.tmp"));

        fs::write(&temp_path, bytes)
            .await
            .map_err(|e| AuditError::store(key, format!("failed to write {}: {e}", temp_path.display())))?;

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(AuditError::store(
                key,
                format!("failed to rename {} to {}: {e}", temp_path.display(), path.display()),
            ));
        }

        debug!(key, bytes = bytes.len(), "stored collision report");
        Ok(())
    }
}
