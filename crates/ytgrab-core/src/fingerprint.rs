//! URL fingerprint cache
//!
//! Telegram limits callback data to 64 bytes, so buttons carry a short
//! fingerprint instead of the full URL. The cache maps fingerprints back to
//! URLs. It is bounded by capacity and idle time; a fingerprint that was
//! evicted resolves to [`FingerprintError::Expired`].

use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Number of hex characters kept from the URL digest.
pub const FINGERPRINT_LEN: usize = 12;

/// Short deterministic token standing in for a URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint of a URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use ytgrab_core::fingerprint::{Fingerprint, FINGERPRINT_LEN};
    ///
    /// let a = Fingerprint::of("https://youtu.be/dQw4w9WgXcQ");
    /// let b = Fingerprint::of("https://youtu.be/dQw4w9WgXcQ");
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
    /// ```
    #[must_use]
    pub fn of(url: &str) -> Self {
        let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
        Self(digest[..FINGERPRINT_LEN].to_string())
    }

    /// Wrap a fingerprint received from a callback token.
    #[must_use]
    pub fn from_token(raw: &str) -> Self {
        Self(raw.to_string())
    }

    /// Borrow the raw token text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint lookup failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    /// Fingerprint was never registered or has been evicted
    #[error("fingerprint {0} is expired or unknown")]
    Expired(Fingerprint),
}

/// Bounded, concurrent fingerprint → URL map
#[derive(Clone)]
pub struct FingerprintCache {
    cache: Cache<Fingerprint, String>,
}

impl FingerprintCache {
    /// Creates a cache holding at most `max_capacity` URLs, each expiring
    /// after `idle` without a lookup or re-registration.
    #[must_use]
    pub fn new(max_capacity: u64, idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(idle)
            .build();
        Self { cache }
    }

    /// Register a URL and return its fingerprint. Idempotent per URL.
    pub async fn register(&self, url: &str) -> Fingerprint {
        let fingerprint = Fingerprint::of(url);
        self.cache.insert(fingerprint.clone(), url.to_string()).await;
        debug!(fingerprint = %fingerprint, "Registered URL");
        fingerprint
    }

    /// Resolve a fingerprint back to its URL.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Expired`] if the fingerprint is unknown.
    pub async fn resolve(&self, fingerprint: &Fingerprint) -> Result<String, FingerprintError> {
        self.cache
            .get(fingerprint)
            .await
            .ok_or_else(|| FingerprintError::Expired(fingerprint.clone()))
    }

    /// Returns the current number of entries in the cache
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
