//! In-process collision analysis
//!
//! Drives a fresh [`Sha1DcContext`] per record over the decoded DER bytes.

use crate::context::Sha1DcContext;
use crate::{CollisionAnalyzer, Result};
use async_trait::async_trait;
use certaudit_archive::CertificateRecord;

/// Default streaming chunk size (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Performs SHA-1 collision analysis inside the calling process
#[derive(Clone, Debug)]
pub struct InProcessAnalyzer {
    chunk_size: usize,
}

impl Default for InProcessAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl InProcessAnalyzer {
    /// Analyzer that feeds input in chunks of `chunk_size` bytes
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Run detection over raw bytes
    #[must_use]
    pub fn detect(&self, bytes: &[u8]) -> bool {
        let mut ctx = Sha1DcContext::new().with_safe_hash(false).init();
        for chunk in bytes.chunks(self.chunk_size) {
            ctx.update(chunk);
        }
        ctx.finalize().is_collision()
    }
}

#[async_trait]
impl CollisionAnalyzer for InProcessAnalyzer {
    async fn analyze(&self, record: &CertificateRecord) -> Result<bool> {
        if !record.is_resolvable() {
            return Ok(false);
        }

        let der = record.der_bytes()?;
        let bytes = der.len();
        let analyzer = self.clone();
        let collision = tokio::task::spawn_blocking(move || analyzer.detect(&der)).await?;
        tracing::debug!(
            content_hash = record.content_hash(),
            bytes,
            collision,
            "in-process analysis finished"
        );
        Ok(collision)
    }
}
