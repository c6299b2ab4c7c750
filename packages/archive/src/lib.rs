//! Certificate archive decoding
//!
//! Archives are single-member gzip streams whose body is newline-delimited
//! JSON, one certificate record per line.

#![forbid(unsafe_code)]

pub mod decoder;
pub mod error;
pub mod record;

// Re-export error types
pub use error::{ArchiveError, Result};

// Re-export the decoding entry points
pub use decoder::{
    open_archive, records, stream_records, RecordIter, RecordStream, MAX_LINE_BYTES,
};
pub use record::{CertificateRecord, FINGERPRINT_FIELD, RAW_FIELD};
