//! Production structured logging infrastructure
//!
//! Provides env_logger-based logging for the audit binaries. Library crates emit
//! `tracing` events, which reach this logger through the `log` facade.

use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use std::sync::Once;
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// Metric names emitted as structured log fields
pub mod metrics {
    /// Certificates analyzed across a run or batch
    pub const CERTS_PROCESSED_COUNT: &str = "CertificatesProcessedCount";
    /// Errors recorded while processing certificates
    pub const CERTS_PROCESSED_ERROR_COUNT: &str = "CertificatesProcessedErrorCount";
    /// Collisions reported to the collision store
    pub const HASH_COLLISION_FOUND_COUNT: &str = "HashCollisionsFoundCount";
}

/// Production logging infrastructure using `env_logger`
pub struct LoggingTransformer;

impl LoggingTransformer {
    /// Initialize logging system (should be called once at application startup)
    ///
    /// Configure logging levels via `RUST_LOG` environment variable:
    /// - `RUST_LOG=info` - Archive and batch progress (recommended for production)
    /// - `RUST_LOG=debug` - Per-record and per-subprocess detail
    /// - `RUST_LOG=certaudit_detect=debug,certaudit=info` - Module-specific levels
    pub fn init() {
        INIT_LOGGER.call_once(|| {
            env_logger::Builder::new()
                .filter_level(log::LevelFilter::Info)
                .parse_default_env()
                .format_timestamp_micros()
                .init();

            debug!("Structured logging initialized");
        });
    }

    /// Initialize logging for test environments
    ///
    /// Use this in test modules to avoid initialization conflicts
    pub fn init_test() {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .try_init();
    }

    /// Log a positive collision finding at the highest severity
    pub fn log_collision(content_hash: &str, source: &str) {
        error!("CRITICAL: found a SHA-1 collision for hash {content_hash} in {source}");
    }

    /// Log the completion of one archive
    pub fn log_archive_finished(source: &str, records: u64, faults: usize, elapsed: Duration) {
        info!(
            "Finished processing {records} certs from {source} in {}ms ({faults} errors)",
            elapsed.as_millis()
        );
    }

    /// Log the completion of one batch
    pub fn log_batch_finished(files: usize, records: u64, failed_items: usize) {
        if failed_items == 0 {
            info!("Processed batch of {files} files with {records} certificates");
        } else {
            warn!(
                "Processed batch of {files} files with {records} certificates; {failed_items} errors recorded"
            );
        }
    }

    /// Log a metric sample as a structured line
    pub fn log_metric(name: &str, value: u64) {
        info!("metric {name}={value}");
    }

    /// Log a processing error attributed to an archive reference
    pub fn log_processing_error(reference: &str, error: &dyn std::error::Error) {
        error!("Exception {error} while processing file {reference}");
    }

    /// Log cleanup and shutdown events with error context
    pub fn log_cleanup_warning(component: &str, error: &dyn std::error::Error) {
        warn!("Cleanup failed for {component}: {error}");
    }

    /// Log the lookup service identity without exposing the credential itself
    pub fn log_lookup_configured(endpoint: &str, app_id: &str) {
        let app_hash = Self::secure_hash_key(app_id);
        info!("Certificate lookup enabled against {endpoint} (app_hash: {app_hash})");
    }

    /// Cryptographically secure key hashing for logging
    ///
    /// Returns the first 12 characters of the hex-encoded SHA-256.
    fn secure_hash_key(key: &str) -> String {
        let hash = Sha256::digest(key.as_bytes());
        let hex_hash = format!("{hash:x}");
        format!("#{}", &hex_hash[..12])
    }
}
