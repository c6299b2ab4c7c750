//! Certificate metadata lookup used to enrich collision reports

use crate::{AuditError, Result};
use async_trait::async_trait;
use certaudit_common::LoggingTransformer;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, warn};

/// Default certificate search endpoint; the SHA-256 hash is appended as a path segment
pub const DEFAULT_ENDPOINT: &str = "https://search.censys.io/api/v2/certificates";

/// Environment variable holding the lookup application id
pub const APP_ID_ENV: &str = "CENSYS_APPID";

/// Environment variable holding the lookup secret
pub const SECRET_ENV: &str = "CENSYS_SECRET";

/// Fetches full metadata for a certificate by content hash
#[async_trait]
pub trait CertificateLookup: Send + Sync {
    /// JSON document describing the certificate with `sha256` hash
    async fn certificate_json(&self, sha256: &str) -> Result<String>;
}

/// Credentials for the lookup service
pub struct LookupCredentials {
    app_id: String,
    secret: SecretString,
}

impl LookupCredentials {
    /// Credentials from an application id and secret
    #[must_use]
    pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Read credentials from `CENSYS_APPID` / `CENSYS_SECRET`.
    ///
    /// Returns `None` unless both are set and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let app_id = std::env::var(APP_ID_ENV).ok().filter(|v| !v.is_empty())?;
        let secret = std::env::var(SECRET_ENV).ok().filter(|v| !v.is_empty())?;
        Some(Self::new(app_id, secret))
    }

    /// Application id
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

/// Retry policy for rate-limited lookups
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff` before retrying
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// HTTP client for the Censys certificate search API
pub struct CensysClient {
    client: Client,
    endpoint: String,
    credentials: LookupCredentials,
    retry: RetryPolicy,
}

impl CensysClient {
    /// Create a client against `endpoint`
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Lookup` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, credentials: LookupCredentials, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("certaudit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuditError::lookup(format!("failed to initialize HTTP client: {e}")))?;

        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        LoggingTransformer::log_lookup_configured(&endpoint, credentials.app_id());

        Ok(Self {
            client,
            endpoint,
            credentials,
            retry: RetryPolicy {
                max_attempts: retry.max_attempts.max(1),
                backoff: retry.backoff,
            },
        })
    }

    fn url(&self, sha256: &str) -> String {
        format!("{}/{sha256}", self.endpoint)
    }
}

#[async_trait]
impl CertificateLookup for CensysClient {
    async fn certificate_json(&self, sha256: &str) -> Result<String> {
        let url = self.url(sha256);
        let mut attempts = 1;

        loop {
            let response = self
                .client
                .get(&url)
                .header("Accept", "application/json")
                .basic_auth(
                    &self.credentials.app_id,
                    Some(self.credentials.secret.expose_secret()),
                )
                .send()
                .await
                .map_err(|e| AuditError::lookup(format!("request for {sha256} failed: {e}")))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .text()
                    .await
                    .map_err(|e| AuditError::lookup(format!("reading response for {sha256} failed: {e}")));
            }

            if status != StatusCode::TOO_MANY_REQUESTS || attempts >= self.retry.max_attempts {
                warn!(sha256, status = status.as_u16(), attempts, "certificate lookup failed");
                return Err(AuditError::LookupStatus {
                    status: status.as_u16(),
                    attempts,
                });
            }

            let delay = self.retry.backoff * attempts;
            debug!(sha256, attempts, delay_ms = delay.as_millis() as u64, "rate limited; retrying lookup");
            tokio::time::sleep(delay).await;
            attempts += 1;
        }
    }
}
