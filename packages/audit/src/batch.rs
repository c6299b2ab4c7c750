//! Batch consumption with per-item fault isolation
//!
//! Every reference in a delivered batch is attempted. Failures are collected
//! per reference and turned into one terminal signal once the batch is done:
//! success, the single fault, or an aggregate of all faults. Collisions
//! already reported stay reported; the store tolerates duplicate writes when
//! the queue redelivers the batch.
//!
//! A cancelled batch never signals success. The archive interrupted mid-way
//! and every reference not yet attempted each get an [`AuditError::Cancelled`]
//! fault, so the runtime redelivers the batch.

use crate::processor::FileProcessor;
use crate::report::CollisionReporter;
use crate::source::ArchiveSource;
use crate::AuditError;
use certaudit_common::{metrics, LoggingTransformer};
use certaudit_detect::CollisionAnalyzer;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A fault attributed to one batch reference
#[derive(Debug)]
pub struct ItemFault {
    /// The archive reference being processed
    pub reference: String,
    /// The underlying error
    pub error: AuditError,
}

impl fmt::Display for ItemFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reference, self.error)
    }
}

/// Terminal failure signal for a batch
#[derive(Error, Debug)]
pub enum BatchFailure {
    /// Exactly one fault was recorded
    #[error("{error} (while processing {reference})")]
    Single {
        /// The archive reference being processed
        reference: String,
        /// The underlying error
        #[source]
        error: AuditError,
    },

    /// More than one fault was recorded
    #[error("{} faults in batch: {}", .0.len(), join_faults(.0))]
    Aggregate(Vec<ItemFault>),
}

fn join_faults(faults: &[ItemFault]) -> String {
    faults
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl BatchFailure {
    /// Every underlying cause with its reference, in the order recorded
    #[must_use]
    pub fn causes(&self) -> Vec<(&str, &AuditError)> {
        match self {
            Self::Single { reference, error } => vec![(reference.as_str(), error)],
            Self::Aggregate(faults) => faults
                .iter()
                .map(|f| (f.reference.as_str(), &f.error))
                .collect(),
        }
    }
}

/// Accounting for one batch invocation
#[derive(Debug, Default)]
pub struct BatchOutcome {
    processed_count: usize,
    records_analyzed: u64,
    collisions_reported: usize,
    errored: Vec<ItemFault>,
    cancelled: bool,
}

impl BatchOutcome {
    /// References fetched, processed to the end and fully reported
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    /// Records reached across every processed archive
    #[must_use]
    pub fn records_analyzed(&self) -> u64 {
        self.records_analyzed
    }

    /// Collisions written to the collision store
    #[must_use]
    pub fn collisions_reported(&self) -> usize {
        self.collisions_reported
    }

    /// Recorded faults, in the order they occurred
    #[must_use]
    pub fn errored(&self) -> &[ItemFault] {
        &self.errored
    }

    /// Whether the batch stopped early on a cancellation request.
    ///
    /// A cancelled outcome always carries at least one `Cancelled` fault.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Record a fault for `reference`
    pub fn record_failure(&mut self, reference: &str, error: AuditError) {
        LoggingTransformer::log_processing_error(reference, &error);
        LoggingTransformer::log_metric(metrics::CERTS_PROCESSED_ERROR_COUNT, 1);
        self.errored.push(ItemFault {
            reference: reference.to_string(),
            error,
        });
    }

    /// Collapse the outcome into the signal returned to the queue runtime
    ///
    /// # Errors
    ///
    /// `BatchFailure::Single` for one recorded fault, `BatchFailure::Aggregate`
    /// for more than one.
    pub fn into_signal(self) -> std::result::Result<(), BatchFailure> {
        let mut errored = self.errored;
        match errored.len() {
            0 => Ok(()),
            1 => {
                let ItemFault { reference, error } = errored.remove(0);
                Err(BatchFailure::Single { reference, error })
            }
            _ => Err(BatchFailure::Aggregate(errored)),
        }
    }
}

/// Processes a delivered batch of archive references
pub struct BatchConsumer {
    source: Arc<dyn ArchiveSource>,
    reporter: CollisionReporter,
    analyzer: Arc<dyn CollisionAnalyzer>,
    processor: FileProcessor,
}

impl BatchConsumer {
    /// Consumer fetching from `source`, analyzing with `analyzer` and
    /// reporting through `reporter`
    #[must_use]
    pub fn new(
        source: Arc<dyn ArchiveSource>,
        reporter: CollisionReporter,
        analyzer: Arc<dyn CollisionAnalyzer>,
    ) -> Self {
        Self {
            source,
            reporter,
            analyzer,
            processor: FileProcessor::new(),
        }
    }

    /// Replace the file processor, e.g. to attach a progress callback
    #[must_use]
    pub fn with_processor(mut self, processor: FileProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Attempt every reference and account for each fault.
    ///
    /// Cancellation is checked between archives and, through the file
    /// processor, between records.
    pub async fn consume<I, S>(&self, references: I, cancel: &CancellationToken) -> BatchOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = BatchOutcome::default();
        let mut attempted = 0usize;

        for reference in references {
            let reference = reference.as_ref();
            if cancel.is_cancelled() {
                if !outcome.cancelled {
                    info!(attempted, "cancellation requested; stopping batch");
                    outcome.cancelled = true;
                }
                outcome.record_failure(reference, AuditError::Cancelled);
                continue;
            }
            attempted += 1;
            self.consume_one(reference, &mut outcome, cancel).await;
        }

        LoggingTransformer::log_metric(metrics::CERTS_PROCESSED_COUNT, outcome.records_analyzed);
        LoggingTransformer::log_batch_finished(
            outcome.processed_count,
            outcome.records_analyzed,
            outcome.errored.len(),
        );
        outcome
    }

    async fn consume_one(&self, reference: &str, outcome: &mut BatchOutcome, cancel: &CancellationToken) {
        let local = match tempfile::Builder::new()
            .prefix("certaudit-archive-")
            .suffix(".gz")
            .tempfile()
        {
            Ok(local) => local,
            Err(e) => {
                outcome.record_failure(reference, AuditError::Io(e));
                return;
            }
        };

        let succeeded = self.process_local(reference, local.path(), outcome, cancel).await;
        if succeeded {
            outcome.processed_count += 1;
        }

        let path = local.path().display().to_string();
        if let Err(source) = local.close() {
            let error = AuditError::Cleanup { path, source };
            LoggingTransformer::log_cleanup_warning(reference, &error);
            outcome.record_failure(reference, error);
        }
    }

    /// Fetch, process and report one archive. Returns false when the fetch or
    /// a collision report failed, or the archive was cancelled part way.
    async fn process_local(
        &self,
        reference: &str,
        local: &Path,
        outcome: &mut BatchOutcome,
        cancel: &CancellationToken,
    ) -> bool {
        if let Err(e) = self.source.fetch(reference, local).await {
            outcome.record_failure(reference, e);
            return false;
        }

        let summary = self
            .processor
            .process_labeled(&*self.analyzer, local, reference, cancel)
            .await;
        outcome.records_analyzed += summary.records_analyzed();
        let finished = !summary.was_cancelled();

        let (collisions, faults) = summary.into_parts();
        for fault in faults {
            outcome.record_failure(reference, fault.error);
        }
        if !finished {
            outcome.cancelled = true;
            outcome.record_failure(reference, AuditError::Cancelled);
        }

        let mut reported_all = finished;
        for record in &collisions {
            match self.reporter.report(record).await {
                Ok(()) => outcome.collisions_reported += 1,
                Err(e) => {
                    warn!(reference, content_hash = record.content_hash(), error = %e, "collision report failed");
                    outcome.record_failure(reference, e);
                    reported_all = false;
                }
            }
        }
        reported_all
    }
}
