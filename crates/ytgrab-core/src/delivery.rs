//! Artifact delivery
//!
//! Uploads extracted files through the [`ChatTransport`], retrying transient
//! network failures and refusing files the platform would reject anyway.

use crate::config::{CoreSettings, DELIVERY_BACKOFF_STEP_SECS};
use crate::extractor::Artifact;
use crate::transport::{ChatRef, ChatTransport, MediaUpload};
use crate::utils::{escape_html, truncate_with_ellipsis};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Error substrings treated as transient, matched case-insensitively.
const TRANSIENT_MARKERS: &[&str] = &[
    "connection reset",
    "client connection force closed",
    "timeout",
    "temporary",
];

/// Caption titles are cut well below Telegram's 1024-character caption limit.
const MAX_CAPTION_TITLE: usize = 1000;

const MIB: u64 = 1024 * 1024;

/// User notice for a file above `limit` bytes, e.g. `>50MB` for the default.
fn too_large_notice(limit: u64) -> String {
    let shown = if limit >= MIB {
        format!("{}MB", limit / MIB)
    } else {
        format!("{limit} bytes")
    };
    format!("❌ File is too large (>{shown}). Try a lower quality.")
}

/// Delivery failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// File exceeds the upload limit, nothing was sent
    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge {
        /// Actual size
        size: u64,
        /// Configured limit
        limit: u64,
    },
    /// File could not be inspected
    #[error("error reading file: {0}")]
    Unreadable(String),
    /// Every attempt failed, or a non-transient error stopped the retries
    #[error("send failed after {attempts} attempt(s): {last}")]
    Transport {
        /// Attempts made
        attempts: u32,
        /// Last transport error
        last: String,
    },
}

/// Returns `true` if a transport error looks worth retrying.
#[must_use]
pub fn is_transient(error: &str) -> bool {
    let lower = error.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Caption shown under a delivered file
#[must_use]
pub fn caption_for(artifact: &Artifact) -> String {
    let title = artifact.title.trim();
    if title.is_empty() {
        format!("✅ Here's your {}!", artifact.media.noun())
    } else {
        format!(
            "✅ {}",
            escape_html(&truncate_with_ellipsis(title, MAX_CAPTION_TITLE))
        )
    }
}

/// Sends artifacts with bounded retries.
pub struct DeliveryManager {
    transport: Arc<dyn ChatTransport>,
    max_bytes: u64,
    max_attempts: u32,
    backoff_step: Duration,
}

impl DeliveryManager {
    /// Create a manager using the configured limits
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, settings: &CoreSettings) -> Self {
        Self {
            transport,
            max_bytes: settings.max_upload_bytes,
            max_attempts: settings.delivery_max_attempts.max(1),
            backoff_step: Duration::from_secs(DELIVERY_BACKOFF_STEP_SECS),
        }
    }

    /// Deliver an artifact to a chat.
    ///
    /// The local file is removed after a successful upload and kept on any
    /// failure. The user is told about every failure.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::TooLarge`] without contacting the transport
    /// when the file exceeds the limit, [`DeliveryError::Unreadable`] when the
    /// file cannot be inspected, and [`DeliveryError::Transport`] when the
    /// upload did not succeed.
    #[instrument(skip(self, artifact), fields(path = %artifact.path.display()))]
    pub async fn deliver(&self, chat: ChatRef, artifact: &Artifact) -> Result<(), DeliveryError> {
        let size = match tokio::fs::metadata(&artifact.path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(error = %e, "Cannot stat artifact");
                self.notify(chat, "❌ Error reading file").await;
                return Err(DeliveryError::Unreadable(e.to_string()));
            }
        };

        if size > self.max_bytes {
            warn!(size, limit = self.max_bytes, "Artifact exceeds upload limit");
            self.notify(chat, &too_large_notice(self.max_bytes)).await;
            return Err(DeliveryError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let upload = MediaUpload {
            path: artifact.path.clone(),
            media: artifact.media,
            caption: caption_for(artifact),
        };

        let mut attempts = 0;
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            attempts = attempt;
            match self.transport.send_media(chat, upload.clone()).await {
                Ok(_) => {
                    info!(attempt, size, "Artifact delivered");
                    self.cleanup(artifact).await;
                    return Ok(());
                }
                Err(e) => {
                    last_error = format!("{e:#}");
                    if !is_transient(&last_error) {
                        warn!(attempt, error = %last_error, "Send failed with non-transient error");
                        break;
                    }
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %last_error,
                        "Transient send error"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff_step * attempt).await;
                    }
                }
            }
        }

        self.notify(
            chat,
            &format!(
                "❌ Error sending file after {attempts} attempts: {}",
                escape_html(&last_error)
            ),
        )
        .await;
        Err(DeliveryError::Transport {
            attempts,
            last: last_error,
        })
    }

    async fn cleanup(&self, artifact: &Artifact) {
        match tokio::fs::remove_file(&artifact.path).await {
            Ok(()) => debug!(path = %artifact.path.display(), "Removed delivered artifact"),
            Err(e) => warn!(path = %artifact.path.display(), error = %e, "Failed to remove artifact"),
        }
    }

    async fn notify(&self, chat: ChatRef, text: &str) {
        if let Err(e) = self.transport.send_text(chat, text, None).await {
            warn!(error = %e, "Failed to send delivery notice");
        }
    }
}
