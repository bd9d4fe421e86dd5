//! Media extraction
//!
//! Turns a URL and a [`Selection`] into a local file by driving yt-dlp as a
//! subprocess under a single deadline.

/// Subprocess execution with deadlines.
pub mod process;
/// yt-dlp command construction and output interpretation.
pub mod ytdlp;

use crate::callback::{MediaKind, Selection};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use process::{ProcessOutput, ProcessRunner, RunError, TokioProcessRunner};
pub use ytdlp::YtDlp;

/// Locally produced media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path on local disk
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// Declared media kind
    pub media: MediaKind,
    /// Display title (unsanitized)
    pub title: String,
}

/// Extraction failures, worded for the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// TLS, handshake or timeout problems, or the deadline fired
    #[error("Connection timeout. The platform may be blocking downloads. Please try again later.")]
    Connectivity,
    /// Page could not be fetched
    #[error("Cannot access this video. It may be private or region-locked.")]
    AccessDenied,
    /// Video was taken down
    #[error("Video is unavailable or has been removed.")]
    Removed,
    /// yt-dlp reported an error we do not classify
    #[error("{0}")]
    Tool(String),
    /// Failure without a recognizable error line
    #[error("Download failed")]
    Failed,
    /// yt-dlp could not be started
    #[error("Download failed: the extraction tool could not be started")]
    Spawn,
    /// yt-dlp reported success but the file is not where expected
    #[error("output file not found: {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Produces artifacts from URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Download `url` in the requested format and quality.
    async fn extract(&self, url: &str, selection: Selection) -> Result<Artifact, ExtractionError>;
}
