//! Playlist resolution
//!
//! Lists the items of a playlist without downloading them, using yt-dlp's
//! flat-playlist mode.

use crate::extractor::process::{run_with_deadline, RunError};
use crate::extractor::YtDlp;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Separator between title and link in yt-dlp's `--print` output.
const ENTRY_DELIMITER: &str = "||";

/// One playlist item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Item title as reported by the platform
    pub title: String,
    /// Item URL
    pub link: String,
}

/// Playlist listing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionError {
    /// Listing did not finish in time
    #[error("playlist listing timed out")]
    TimedOut,
    /// yt-dlp could not be started
    #[error("failed to start yt-dlp: {0}")]
    Spawn(String),
    /// yt-dlp exited with failure
    #[error("playlist fetch failed: {0}")]
    Failed(String),
}

/// Lists playlist entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch up to `max` entries of the playlist at `url`, in playlist order.
    async fn list_entries(
        &self,
        url: &str,
        max: usize,
    ) -> Result<Vec<CollectionEntry>, CollectionError>;
}

#[async_trait]
impl CollectionSource for YtDlp {
    #[instrument(skip(self))]
    async fn list_entries(
        &self,
        url: &str,
        max: usize,
    ) -> Result<Vec<CollectionEntry>, CollectionError> {
        let binary = self.binary().await.to_string();
        let args = vec![
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--print".to_string(),
            format!("%(title)s{ENTRY_DELIMITER}%(url)s"),
            "--playlist-end".to_string(),
            max.to_string(),
            url.to_string(),
        ];

        let output = run_with_deadline(
            self.runner(),
            &binary,
            &args,
            self.settings().playlist_timeout(),
        )
        .await
        .map_err(|e| match e {
            RunError::TimedOut(_) => CollectionError::TimedOut,
            RunError::Spawn(e) => CollectionError::Spawn(e.to_string()),
        })?;

        if !output.success {
            let combined = output.combined();
            warn!(url = %url, output = %combined, "Playlist fetch failed");
            return Err(CollectionError::Failed(combined.trim().to_string()));
        }

        let entries = parse_entries(&output.stdout, max);
        info!(url = %url, count = entries.len(), "Fetched playlist entries");
        Ok(entries)
    }
}

/// Parse `title||url` lines, skipping lines without the delimiter.
#[must_use]
pub fn parse_entries(stdout: &str, max: usize) -> Vec<CollectionEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let (title, link) = line.split_once(ENTRY_DELIMITER)?;
            let link = link.trim();
            (!link.is_empty()).then(|| CollectionEntry {
                title: title.trim().to_string(),
                link: link.to_string(),
            })
        })
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreSettings;
    use crate::extractor::process::{MockProcessRunner, ProcessOutput};
    use crate::testing::PendingRunner;
    use std::sync::Arc;

    #[test]
    fn test_parse_entries_skips_noise() {
        let stdout = "First || https://youtu.be/aaaaaaaaaaa\n\
                      garbage line\n\
                      Second||https://youtu.be/bbbbbbbbbbb\n\
                      Third||https://youtu.be/ccccccccccc\n";
        let entries = parse_entries(stdout, 2);
        assert_eq!(
            entries,
            vec![
                CollectionEntry {
                    title: "First".to_string(),
                    link: "https://youtu.be/aaaaaaaaaaa".to_string(),
                },
                CollectionEntry {
                    title: "Second".to_string(),
                    link: "https://youtu.be/bbbbbbbbbbb".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_entries_keeps_delimiter_in_link() {
        let entries = parse_entries("a||b||c", 10);
        assert_eq!(entries[0].title, "a");
        assert_eq!(entries[0].link, "b||c");
    }

    #[tokio::test]
    async fn test_list_entries_passes_limit() {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, args| {
            if args.first().map(String::as_str) == Some("--version") {
                return Ok(ProcessOutput::ok("2025.01.01"));
            }
            let end = args
                .iter()
                .position(|a| a == "--playlist-end")
                .and_then(|i| args.get(i + 1))
                .cloned();
            assert_eq!(end.as_deref(), Some("25"));
            Ok(ProcessOutput::ok("One||https://youtu.be/aaaaaaaaaaa\n"))
        });

        let ytdlp = YtDlp::with_runner(Arc::new(CoreSettings::default()), Arc::new(runner));
        let entries = ytdlp
            .list_entries("https://www.youtube.com/playlist?list=PLxyz", 25)
            .await
            .expect("listing succeeds");
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_list_entries_reports_failure() {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, args| {
            if args.first().map(String::as_str) == Some("--version") {
                Ok(ProcessOutput::ok("2025.01.01"))
            } else {
                Ok(ProcessOutput::failed("ERROR: The playlist does not exist"))
            }
        });
        let ytdlp = YtDlp::with_runner(Arc::new(CoreSettings::default()), Arc::new(runner));
        let err = ytdlp
            .list_entries("https://www.youtube.com/playlist?list=PLnope", 25)
            .await
            .expect_err("listing fails");
        assert_eq!(
            err,
            CollectionError::Failed("ERROR: The playlist does not exist".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_entries_times_out() {
        let settings = Arc::new(CoreSettings {
            ytdlp_path: Some("yt-dlp".to_string()),
            playlist_timeout_secs: 5,
            ..CoreSettings::default()
        });
        let ytdlp = YtDlp::with_runner(settings, Arc::new(PendingRunner));
        let err = ytdlp
            .list_entries("https://www.youtube.com/playlist?list=PLxyz", 5)
            .await
            .expect_err("listing hangs");
        assert_eq!(err, CollectionError::TimedOut);
    }
}
