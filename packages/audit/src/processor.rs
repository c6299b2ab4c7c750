//! Per-archive processing with per-record fault isolation

use crate::summary::Summary;
use crate::AuditError;
use certaudit_archive::open_archive;
use certaudit_common::LoggingTransformer;
use certaudit_detect::CollisionAnalyzer;
use futures::StreamExt;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Progress callback: records reached so far and the current record's hash
pub type ProgressFn = Box<dyn Fn(u64, &str) + Send + Sync>;

/// Runs a collision analyzer over every record of one archive.
///
/// Faults in one record are recorded and processing moves on to the next
/// record. A failure to open or decompress the archive ends that archive.
#[derive(Default)]
pub struct FileProcessor {
    progress: Option<ProgressFn>,
}

impl FileProcessor {
    /// Processor without progress notifications
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `progress` after every record reached
    #[must_use]
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(u64, &str) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Process the archive at `path`, labeling the summary with the path
    pub async fn process<A>(&self, analyzer: &A, path: &Path, cancel: &CancellationToken) -> Summary
    where
        A: CollisionAnalyzer + ?Sized,
    {
        let label = path.display().to_string();
        self.process_labeled(analyzer, path, &label, cancel).await
    }

    /// Process the archive at `path`, labeling the summary with `source`.
    ///
    /// Cancellation is checked before each record's analysis starts; a
    /// cancelled run returns the partial summary.
    pub async fn process_labeled<A>(
        &self,
        analyzer: &A,
        path: &Path,
        source: &str,
        cancel: &CancellationToken,
    ) -> Summary
    where
        A: CollisionAnalyzer + ?Sized,
    {
        let started = Instant::now();
        let mut summary = Summary::new(source);

        let mut stream = match open_archive(path).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(source, error = %e, "archive could not be opened");
                summary.push_archive_fault(AuditError::from(e));
                return summary;
            }
        };

        while let Some(item) = stream.next().await {
            if cancel.is_cancelled() {
                info!(source, records = summary.records_analyzed(), "cancellation requested; stopping archive");
                summary.mark_cancelled();
                break;
            }

            let record = match item {
                Ok(record) => record,
                Err(e) if e.is_terminal() => {
                    warn!(source, records = summary.records_analyzed(), error = %e, "archive stream aborted");
                    summary.push_archive_fault(AuditError::from(e));
                    break;
                }
                Err(e) => {
                    let index = summary.reach_record();
                    debug!(source, record = index, error = %e, "record could not be decoded");
                    summary.push_record_fault(index, None, AuditError::from(e));
                    self.notify(index, "");
                    continue;
                }
            };

            let index = summary.reach_record();
            if !record.is_resolvable() {
                summary.mark_unresolved();
            }

            match analyzer.analyze(&record).await {
                Ok(true) => {
                    LoggingTransformer::log_collision(record.content_hash(), source);
                    self.notify(index, record.content_hash());
                    summary.push_collision(record);
                }
                Ok(false) => self.notify(index, record.content_hash()),
                Err(e) => {
                    debug!(source, record = index, content_hash = record.content_hash(), error = %e, "record analysis failed");
                    let hash = Some(record.content_hash().to_string()).filter(|h| !h.is_empty());
                    summary.push_record_fault(index, hash, AuditError::from(e));
                    self.notify(index, record.content_hash());
                }
            }
        }

        LoggingTransformer::log_archive_finished(
            source,
            summary.records_analyzed(),
            summary.faults().len(),
            started.elapsed(),
        );
        summary
    }

    fn notify(&self, count: u64, content_hash: &str) {
        if let Some(progress) = &self.progress {
            progress(count, content_hash);
        }
    }
}
