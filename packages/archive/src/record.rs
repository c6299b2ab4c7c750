//! Certificate record as read from one archive line

use crate::{ArchiveError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// JSON field carrying the base64 SHA-256 fingerprint
pub const FINGERPRINT_FIELD: &str = "fingerprint_sha256";

/// JSON field carrying the base64 DER certificate
pub const RAW_FIELD: &str = "raw";

/// Wire shape of one archive line
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RecordLine {
    #[serde(default)]
    fingerprint_sha256: Option<String>,
    #[serde(default)]
    raw: Option<String>,
}

/// One certificate's identifying hash plus its raw encoded bytes.
///
/// The hex `content_hash` is derived from the base64 fingerprint when the
/// record is built. An undecodable fingerprint yields an empty hash, which
/// marks the record as unresolvable rather than failing construction. The raw
/// certificate stays in its base64 source form until [`der_bytes`] is called,
/// so malformed certificate encoding surfaces at analysis time.
///
/// [`der_bytes`]: CertificateRecord::der_bytes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordLine", into = "RecordLine")]
pub struct CertificateRecord {
    content_hash: String,
    fingerprint_base64: String,
    raw_base64: String,
}

impl CertificateRecord {
    /// Build a record from its two base64 source fields
    #[must_use]
    pub fn new(fingerprint_base64: impl Into<String>, raw_base64: impl Into<String>) -> Self {
        let fingerprint_base64 = fingerprint_base64.into();
        let content_hash = STANDARD
            .decode(fingerprint_base64.trim())
            .map(hex::encode)
            .unwrap_or_default();

        Self {
            content_hash,
            fingerprint_base64,
            raw_base64: raw_base64.into(),
        }
    }

    /// Build a record from a hex content hash
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::InvalidHash` if `hex_hash` is not valid hex.
    pub fn from_hex_hash(hex_hash: &str, raw_base64: impl Into<String>) -> Result<Self> {
        let bytes = hex::decode(hex_hash).map_err(ArchiveError::invalid_hash)?;

        Ok(Self {
            content_hash: hex::encode(&bytes),
            fingerprint_base64: STANDARD.encode(&bytes),
            raw_base64: raw_base64.into(),
        })
    }

    /// Parse a single decompressed archive line
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the line is not a record object.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Serialize back to the archive line format
    ///
    /// # Errors
    ///
    /// Returns the JSON error if serialization fails.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Lowercase hex content hash, empty when the fingerprint was undecodable
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Fingerprint in its base64 source form
    #[must_use]
    pub fn fingerprint_base64(&self) -> &str {
        &self.fingerprint_base64
    }

    /// Certificate in its base64 source form
    #[must_use]
    pub fn raw_base64(&self) -> &str {
        &self.raw_base64
    }

    /// Whether both the content hash and the raw certificate are present
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        !self.content_hash.is_empty() && !self.raw_base64.is_empty()
    }

    /// Decode the DER certificate bytes
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::InvalidEncoding` if the raw field is not valid base64.
    pub fn der_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.raw_base64.trim())
            .map_err(|e| ArchiveError::invalid_encoding(RAW_FIELD, e))
    }
}

impl From<RecordLine> for CertificateRecord {
    fn from(line: RecordLine) -> Self {
        Self::new(
            line.fingerprint_sha256.unwrap_or_default(),
            line.raw.unwrap_or_default(),
        )
    }
}

impl From<CertificateRecord> for RecordLine {
    fn from(record: CertificateRecord) -> Self {
        Self {
            fingerprint_sha256: Some(record.fingerprint_base64),
            raw: Some(record.raw_base64),
        }
    }
}
