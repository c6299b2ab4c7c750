//! Collision reporting: enrich a positive and persist it

use crate::lookup::CertificateLookup;
use crate::store::CollisionStore;
use crate::{AuditError, Result};
use certaudit_archive::CertificateRecord;
use certaudit_common::{metrics, LoggingTransformer};
use std::sync::Arc;
use tracing::info;

/// Writes one collision report per colliding record.
///
/// The report body is the lookup service's certificate document when a
/// lookup is configured, otherwise the record's own JSON line.
#[derive(Clone)]
pub struct CollisionReporter {
    store: Arc<dyn CollisionStore>,
    lookup: Option<Arc<dyn CertificateLookup>>,
}

impl CollisionReporter {
    /// Reporter writing to `store`, enriching through `lookup` when present
    #[must_use]
    pub fn new(store: Arc<dyn CollisionStore>, lookup: Option<Arc<dyn CertificateLookup>>) -> Self {
        Self { store, lookup }
    }

    /// Store key for a record
    #[must_use]
    pub fn key_for(record: &CertificateRecord) -> String {
        format!("{}.json", record.content_hash())
    }

    /// Enrich and store one collision
    ///
    /// # Errors
    ///
    /// Returns the lookup or store failure; nothing is written on lookup failure.
    pub async fn report(&self, record: &CertificateRecord) -> Result<()> {
        let hash = record.content_hash();
        let body = match &self.lookup {
            Some(lookup) => lookup.certificate_json(hash).await?,
            None => record
                .to_json_line()
                .map_err(|e| AuditError::store(Self::key_for(record), e))?,
        };

        self.store.put(&Self::key_for(record), body.as_bytes()).await?;

        LoggingTransformer::log_metric(metrics::HASH_COLLISION_FOUND_COUNT, 1);
        info!(content_hash = hash, enriched = self.lookup.is_some(), "collision reported");
        Ok(())
    }
}
