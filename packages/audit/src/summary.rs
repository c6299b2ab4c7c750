//! Per-archive aggregate of analyzed records, collisions and faults

use crate::AuditError;
use certaudit_archive::CertificateRecord;
use certaudit_common::FaultScope;

/// A non-fatal fault recorded while processing one archive
#[derive(Debug)]
pub struct SummaryFault {
    /// Record or archive scope
    pub scope: FaultScope,
    /// 1-based ordinal of the record reached, absent for archive faults
    pub record_index: Option<u64>,
    /// Content hash of the record when one was decoded
    pub content_hash: Option<String>,
    /// The underlying error
    pub error: AuditError,
}

/// Outcome of processing one archive.
///
/// Built and mutated only by the file processor that owns it. `collisions` and
/// `faults` keep encounter order.
#[derive(Debug)]
pub struct Summary {
    source: String,
    records_analyzed: u64,
    records_unresolved: u64,
    collisions: Vec<CertificateRecord>,
    faults: Vec<SummaryFault>,
    cancelled: bool,
}

impl Summary {
    /// Empty summary for `source`
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            records_analyzed: 0,
            records_unresolved: 0,
            collisions: Vec::new(),
            faults: Vec::new(),
            cancelled: false,
        }
    }

    /// Identifier of the processed archive
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Records reached, including records that faulted
    #[must_use]
    pub fn records_analyzed(&self) -> u64 {
        self.records_analyzed
    }

    /// Records skipped as unresolvable (empty hash or empty raw field)
    #[must_use]
    pub fn records_unresolved(&self) -> u64 {
        self.records_unresolved
    }

    /// Records whose bytes carry a collision-attack signature
    #[must_use]
    pub fn collisions(&self) -> &[CertificateRecord] {
        &self.collisions
    }

    /// Recorded faults
    #[must_use]
    pub fn faults(&self) -> &[SummaryFault] {
        &self.faults
    }

    /// Whether processing stopped on a cancellation request
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether no faults were recorded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Split into collisions and faults
    #[must_use]
    pub fn into_parts(self) -> (Vec<CertificateRecord>, Vec<SummaryFault>) {
        (self.collisions, self.faults)
    }

    /// Count a record as reached and return its ordinal
    pub(crate) fn reach_record(&mut self) -> u64 {
        self.records_analyzed += 1;
        self.records_analyzed
    }

    pub(crate) fn mark_unresolved(&mut self) {
        self.records_unresolved += 1;
    }

    pub(crate) fn push_collision(&mut self, record: CertificateRecord) {
        self.collisions.push(record);
    }

    pub(crate) fn push_record_fault(
        &mut self,
        record_index: u64,
        content_hash: Option<String>,
        error: AuditError,
    ) {
        self.faults.push(SummaryFault {
            scope: FaultScope::Record,
            record_index: Some(record_index),
            content_hash,
            error,
        });
    }

    pub(crate) fn push_archive_fault(&mut self, error: AuditError) {
        self.faults.push(SummaryFault {
            scope: FaultScope::Archive,
            record_index: None,
            content_hash: None,
            error,
        });
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_in_encounter_order() {
        let mut summary = Summary::new("a.gz");
        let first = summary.reach_record();
        summary.push_collision(CertificateRecord::new("AAE=", "MA=="));
        let second = summary.reach_record();
        summary.push_record_fault(second, None, AuditError::lookup("boom"));
        summary.push_collision(CertificateRecord::new("AgM=", "MA=="));

        assert_eq!((first, second), (1, 2));
        assert_eq!(summary.records_analyzed(), 2);
        let hashes: Vec<&str> = summary.collisions().iter().map(|r| r.content_hash()).collect();
        assert_eq!(hashes, vec!["0001", "0203"]);
        assert_eq!(summary.faults()[0].record_index, Some(2));
        assert!(!summary.is_clean());
    }

    #[test]
    fn archive_fault_has_no_record_index() {
        let mut summary = Summary::new("missing.gz");
        summary.push_archive_fault(AuditError::config("unreadable"));

        assert_eq!(summary.records_analyzed(), 0);
        assert_eq!(summary.faults()[0].scope, FaultScope::Archive);
        assert_eq!(summary.faults()[0].record_index, None);
    }
}
