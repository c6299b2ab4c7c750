//! Certificate archive auditing for SHA-1 collision attacks
//!
//! Three nested accumulation units, each with its own fault list:
//! - [`FileProcessor`] runs a collision analyzer over one archive and returns
//!   a [`Summary`]; a bad record is recorded and skipped
//! - [`BatchConsumer`] runs the file processor over a batch of archive
//!   references and reports collisions; a bad reference is recorded and skipped
//! - [`BatchOutcome::into_signal`] turns the batch's faults into the single
//!   success or failure signal handed back to the queue runtime

#![forbid(unsafe_code)]

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod lookup;
pub mod processor;
pub mod report;
pub mod source;
pub mod store;
pub mod summary;

// Re-export error types
pub use error::{AuditError, Result};

pub use batch::{BatchConsumer, BatchFailure, BatchOutcome, ItemFault};
pub use config::{AuditConfig, LookupConfig};
pub use lookup::{CensysClient, CertificateLookup, LookupCredentials, RetryPolicy};
pub use processor::{FileProcessor, ProgressFn};
pub use report::CollisionReporter;
pub use source::{ArchiveSource, LocalArchiveSource};
pub use store::{CollisionStore, FsCollisionStore};
pub use summary::{Summary, SummaryFault};
