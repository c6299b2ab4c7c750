//! Fixture archives and stand-in collaborators shared by the audit tests
#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use certaudit::{ArchiveSource, AuditError, CertificateLookup, CollisionStore};
use certaudit_archive::CertificateRecord;
use certaudit_detect::CollisionAnalyzer;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Bytes that make [`MarkerAnalyzer`] report a collision
pub const COLLIDE: &[u8] = b"COLLIDE";

/// Archive line for a certificate whose fingerprint is the SHA-256 of `der`
pub fn line(der: &[u8]) -> String {
    format!(
        r#"{{"fingerprint_sha256": "{}", "raw": "{}"}}"#,
        STANDARD.encode(Sha256::digest(der)),
        STANDARD.encode(der)
    )
}

/// Hex content hash of the record built by [`line`]
pub fn hash_of(der: &[u8]) -> String {
    format!("{:x}", Sha256::digest(der))
}

/// Distinct certificate-like byte strings
pub fn ders(count: u16) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let mut der = vec![0x30, 0x82];
            der.extend_from_slice(&i.to_be_bytes());
            der.extend_from_slice(b" certificate body");
            der
        })
        .collect()
}

/// Certificate bytes that [`MarkerAnalyzer`] flags
pub fn colliding_der(tag: u8) -> Vec<u8> {
    let mut der = vec![0x30, 0x82, tag];
    der.extend_from_slice(COLLIDE);
    der
}

/// Gzip the given lines into archive bytes
pub fn gzip_lines(lines: &[String]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        writeln!(encoder, "{line}")?;
    }
    encoder.finish()
}

/// Write an archive of `lines` into `dir/name`
pub fn write_archive(dir: &Path, name: &str, lines: &[String]) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, gzip_lines(lines)?)?;
    Ok(path)
}

/// Analyzer reporting a collision for any record whose bytes contain [`COLLIDE`]
pub struct MarkerAnalyzer;

#[async_trait]
impl CollisionAnalyzer for MarkerAnalyzer {
    async fn analyze(&self, record: &CertificateRecord) -> certaudit_detect::Result<bool> {
        if !record.is_resolvable() {
            return Ok(false);
        }
        let der = record.der_bytes()?;
        Ok(der.windows(COLLIDE.len()).any(|w| w == COLLIDE))
    }
}

/// Archive source serving in-memory archives and remembering fetch targets
#[derive(Default)]
pub struct MemorySource {
    archives: HashMap<String, Vec<u8>>,
    pub fetched_to: Mutex<Vec<PathBuf>>,
}

impl MemorySource {
    pub fn with(mut self, reference: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(reference.to_string(), bytes);
        self
    }

    pub fn fetched_paths(&self) -> Vec<PathBuf> {
        self.fetched_to.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ArchiveSource for MemorySource {
    async fn fetch(&self, reference: &str, dest: &Path) -> certaudit::Result<()> {
        if let Ok(mut seen) = self.fetched_to.lock() {
            seen.push(dest.to_path_buf());
        }
        let bytes = self
            .archives
            .get(reference)
            .ok_or_else(|| AuditError::fetch(reference, "no such object"))?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }
}

/// Collision store keeping writes in memory, optionally failing every write
#[derive(Default)]
pub struct MemoryStore {
    pub puts: Mutex<Vec<(String, Vec<u8>)>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts
            .lock()
            .map(|puts| puts.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    pub fn body(&self, key: &str) -> Option<Vec<u8>> {
        self.puts
            .lock()
            .ok()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl CollisionStore for MemoryStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> certaudit::Result<()> {
        if self.fail {
            return Err(AuditError::store(key, "store unavailable"));
        }
        if let Ok(mut puts) = self.puts.lock() {
            puts.push((key.to_string(), bytes.to_vec()));
        }
        Ok(())
    }
}

/// Lookup answering with a fixed document per hash
pub struct StaticLookup;

#[async_trait]
impl CertificateLookup for StaticLookup {
    async fn certificate_json(&self, sha256: &str) -> certaudit::Result<String> {
        Ok(format!(r#"{{"fingerprint_sha256":"{sha256}","source":"lookup"}}"#))
    }
}
