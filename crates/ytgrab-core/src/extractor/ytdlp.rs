//! yt-dlp backend
//!
//! Builds yt-dlp command lines, runs them through a [`ProcessRunner`] and
//! maps failures to [`ExtractionError`] categories the user can act on.

use super::process::{run_with_deadline, ProcessRunner, RunError, TokioProcessRunner};
use super::{Artifact, ExtractionError, MediaExtractor};
use crate::callback::{Selection, VideoQuality};
use crate::config::{CoreSettings, PROBE_TIMEOUT_SECS};
use crate::utils::{last_non_empty_line, truncate_str};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Locations probed for the yt-dlp binary, in order.
pub const BINARY_CANDIDATES: &[&str] = &[
    "yt-dlp",
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
    ".venv/bin/yt-dlp",
];

/// Longest sanitized title used in file names, in grapheme clusters.
pub const MAX_FILENAME_TITLE: usize = 120;

/// Error substrings mapped to [`ExtractionError::Connectivity`]
const CONNECTIVITY_PATTERNS: &[&str] = &["SSL", "handshake", "timed out"];
/// Error substrings mapped to [`ExtractionError::AccessDenied`]
const ACCESS_DENIED_PATTERNS: &[&str] = &["Unable to download webpage"];
/// Error substrings mapped to [`ExtractionError::Removed`]
const REMOVED_PATTERNS: &[&str] = &["Video unavailable"];

#[derive(Debug, Clone)]
struct ResolvedBinary {
    path: String,
    verified: bool,
}

/// yt-dlp driver shared by extraction and playlist listing
pub struct YtDlp {
    runner: Arc<dyn ProcessRunner>,
    settings: Arc<CoreSettings>,
    binary: OnceCell<ResolvedBinary>,
}

impl YtDlp {
    /// Create a driver that spawns real processes
    #[must_use]
    pub fn new(settings: Arc<CoreSettings>) -> Self {
        Self::with_runner(settings, Arc::new(TokioProcessRunner))
    }

    /// Create a driver with a custom process runner
    #[must_use]
    pub fn with_runner(settings: Arc<CoreSettings>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            settings,
            binary: OnceCell::new(),
        }
    }

    pub(crate) fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    pub(crate) fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    fn candidates(&self) -> Vec<String> {
        self.settings
            .ytdlp_path
            .iter()
            .cloned()
            .chain(BINARY_CANDIDATES.iter().map(|c| (*c).to_string()))
            .collect()
    }

    async fn resolve_binary(&self) -> &ResolvedBinary {
        self.binary
            .get_or_init(|| async {
                for candidate in self.candidates() {
                    let probe = run_with_deadline(
                        self.runner(),
                        &candidate,
                        &["--version".to_string()],
                        Duration::from_secs(PROBE_TIMEOUT_SECS),
                    )
                    .await;
                    match probe {
                        Ok(out) if out.success => {
                            info!(
                                path = %candidate,
                                version = %out.stdout.trim(),
                                "Found yt-dlp"
                            );
                            return ResolvedBinary {
                                path: candidate,
                                verified: true,
                            };
                        }
                        Ok(_) => debug!(path = %candidate, "yt-dlp probe exited with failure"),
                        Err(e) => debug!(path = %candidate, error = %e, "yt-dlp probe failed"),
                    }
                }
                warn!("No yt-dlp candidate answered --version, relying on PATH");
                ResolvedBinary {
                    path: BINARY_CANDIDATES[0].to_string(),
                    verified: false,
                }
            })
            .await
    }

    /// Path of the yt-dlp binary, probed once per process.
    pub async fn binary(&self) -> &str {
        &self.resolve_binary().await.path
    }

    /// Whether any candidate location answered `--version`.
    pub async fn is_available(&self) -> bool {
        self.resolve_binary().await.verified
    }

    /// Arguments shared by every download invocation
    async fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--user-agent".to_string(),
            self.settings.user_agent.clone(),
        ];
        let cookies = &self.settings.cookies_file;
        if tokio::fs::try_exists(cookies).await.unwrap_or(false) {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }
        args
    }

    /// Single-line metadata query, `None` on any failure.
    ///
    /// Scoped to the linked video so a `list=` parameter does not expand the
    /// query to the whole playlist.
    async fn metadata_line(&self, binary: &str, flag: &str, url: &str) -> Option<String> {
        let args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            flag.to_string(),
            url.to_string(),
        ];
        match run_with_deadline(
            self.runner(),
            binary,
            &args,
            Duration::from_secs(PROBE_TIMEOUT_SECS),
        )
        .await
        {
            Ok(out) if out.success => last_non_empty_line(&out.stdout).map(str::to_string),
            Ok(out) => {
                debug!(flag = flag, output = %out.combined(), "Metadata query failed");
                None
            }
            Err(e) => {
                debug!(flag = flag, error = %e, "Metadata query failed");
                None
            }
        }
    }

    async fn extract_within_deadline(
        &self,
        url: &str,
        selection: Selection,
    ) -> Result<Artifact, ExtractionError> {
        let binary = self.binary().await.to_string();

        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let title = self
            .metadata_line(&binary, "--get-title", url)
            .await
            .unwrap_or_else(|| format!("media_{nanos}"));
        let id = self
            .metadata_line(&binary, "--get-id", url)
            .await
            .unwrap_or_else(|| nanos.to_string());

        let media = selection.media();
        let output_path = output_path(&self.settings.download_dir, &title, &id, selection);

        let args = build_download_args(selection, &output_path, self.common_args().await, url);
        info!(url = %url, output = %output_path.display(), "Running yt-dlp download");

        // The outer deadline in `extract` bounds this call; the inner one is a
        // backstop for direct callers.
        let result = run_with_deadline(
            self.runner(),
            &binary,
            &args,
            self.settings.extract_timeout(),
        )
        .await;

        let output = match result {
            Ok(out) => out,
            Err(RunError::TimedOut(after)) => {
                warn!(url = %url, secs = after.as_secs(), "yt-dlp timed out");
                return Err(ExtractionError::Connectivity);
            }
            Err(RunError::Spawn(e)) => {
                warn!(url = %url, error = %e, "Failed to start yt-dlp");
                return Err(ExtractionError::Spawn);
            }
        };

        if !output.success {
            let combined = output.combined();
            warn!(url = %url, output = %combined, "yt-dlp exited with failure");
            return Err(classify_failure(&combined));
        }

        // yt-dlp may report success yet name the file differently
        let size_bytes = match tokio::fs::metadata(&output_path).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                warn!(output = %output_path.display(), "yt-dlp succeeded but output file is missing");
                return Err(ExtractionError::MissingOutput(output_path));
            }
        };

        info!(output = %output_path.display(), size_bytes, "Download finished");
        Ok(Artifact {
            path: output_path,
            size_bytes,
            media,
            title,
        })
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    #[instrument(skip(self), fields(media = %selection.media(), quality = selection.quality_str()))]
    async fn extract(&self, url: &str, selection: Selection) -> Result<Artifact, ExtractionError> {
        let deadline = self.settings.extract_timeout();
        match tokio::time::timeout(deadline, self.extract_within_deadline(url, selection)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %url, secs = deadline.as_secs(), "Extraction deadline exceeded");
                Err(ExtractionError::Connectivity)
            }
        }
    }
}

/// Make a title safe to use as a file name.
///
/// # Examples
///
/// ```
/// use ytgrab_core::extractor::ytdlp::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC-DC- Live-");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    truncate_str(replaced.trim(), MAX_FILENAME_TITLE)
}

/// Format selector for a video quality, always preferring MP4 streams.
#[must_use]
pub fn video_format(quality: VideoQuality) -> String {
    match quality.max_height() {
        None => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
        Some(h) => format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best"
        ),
    }
}

/// Full argument list for a download.
#[must_use]
pub fn build_download_args(
    selection: Selection,
    output: &Path,
    common: Vec<String>,
    url: &str,
) -> Vec<String> {
    let output = output.display().to_string();
    let mut args = match selection {
        Selection::Video(quality) => vec![
            "-f".to_string(),
            video_format(quality),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            output,
        ],
        Selection::Audio(quality) => vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            quality.ytdlp_bitrate().to_string(),
            "-o".to_string(),
            output,
        ],
    };
    args.extend(common);
    args.push(url.to_string());
    args
}

/// Map yt-dlp output to a user-facing error category.
#[must_use]
pub fn classify_failure(output: &str) -> ExtractionError {
    let Some(message) = output
        .lines()
        .find_map(|line| line.split_once("ERROR:").map(|(_, rest)| rest.trim()))
    else {
        return ExtractionError::Failed;
    };

    let matches_any = |patterns: &[&str]| patterns.iter().any(|p| message.contains(p));
    if matches_any(CONNECTIVITY_PATTERNS) {
        ExtractionError::Connectivity
    } else if matches_any(ACCESS_DENIED_PATTERNS) {
        ExtractionError::AccessDenied
    } else if matches_any(REMOVED_PATTERNS) {
        ExtractionError::Removed
    } else if message.is_empty() {
        ExtractionError::Failed
    } else {
        ExtractionError::Tool(message.to_string())
    }
}

/// Output location for a title/id pair: `<dir>/<title> - <id>.<ext>`.
#[must_use]
pub fn output_path(download_dir: &Path, title: &str, id: &str, selection: Selection) -> PathBuf {
    download_dir.join(format!(
        "{} - {}.{}",
        sanitize_filename(title),
        sanitize_filename(id),
        selection.media().extension()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::AudioQuality;
    use crate::extractor::process::{MockProcessRunner, ProcessOutput};
    use crate::testing::PendingRunner;
    use std::sync::Mutex;

    fn settings_in(dir: &Path) -> Arc<CoreSettings> {
        Arc::new(CoreSettings {
            download_dir: dir.to_path_buf(),
            cookies_file: dir.join("no-cookies.txt"),
            ..CoreSettings::default()
        })
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("  a/b\\c\nd  "), "a-b-c d");
        assert_eq!(sanitize_filename("what? *yes* <no> |x| \"q\""), "what- -yes- -no- -x- -q-");
        assert_eq!(
            sanitize_filename(&"я".repeat(300)).chars().count(),
            MAX_FILENAME_TITLE
        );
    }

    #[test]
    fn test_video_format_caps_height() {
        assert_eq!(
            video_format(VideoQuality::P720),
            "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best"
        );
        assert!(!video_format(VideoQuality::Best).contains("height"));
    }

    #[test]
    fn test_audio_args() {
        let args = build_download_args(
            Selection::Audio(AudioQuality::K192),
            Path::new("downloads/x - id.mp3"),
            vec!["--no-playlist".to_string()],
            "https://youtu.be/dQw4w9WgXcQ",
        );
        assert_eq!(
            args,
            vec![
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "192K",
                "-o",
                "downloads/x - id.mp3",
                "--no-playlist",
                "https://youtu.be/dQw4w9WgXcQ",
            ]
        );
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("[youtube] x\nERROR: [youtube] x: SSL: CERTIFICATE_VERIFY_FAILED"),
            ExtractionError::Connectivity
        );
        assert_eq!(
            classify_failure("ERROR: Unable to download webpage: HTTP Error 403"),
            ExtractionError::AccessDenied
        );
        assert_eq!(
            classify_failure("ERROR: [youtube] abc: Video unavailable"),
            ExtractionError::Removed
        );
        assert_eq!(
            classify_failure("ERROR: Requested format is not available"),
            ExtractionError::Tool("Requested format is not available".to_string())
        );
        assert_eq!(classify_failure("Traceback ..."), ExtractionError::Failed);
    }

    #[test]
    fn test_output_path() {
        let path = output_path(
            Path::new("downloads"),
            "Song: Live",
            "abc",
            Selection::Audio(AudioQuality::Best),
        );
        assert_eq!(path, PathBuf::from("downloads/Song- Live - abc.mp3"));
    }

    #[tokio::test]
    async fn test_binary_probing_falls_through_candidates() {
        let probed = Arc::new(Mutex::new(Vec::new()));
        let seen = probed.clone();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(move |program, _| {
            seen.lock().expect("lock").push(program.to_string());
            if program == "/usr/bin/yt-dlp" {
                Ok(ProcessOutput::ok("2025.01.01\n"))
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "nope"))
            }
        });

        let ytdlp = YtDlp::with_runner(Arc::new(CoreSettings::default()), Arc::new(runner));
        assert_eq!(ytdlp.binary().await, "/usr/bin/yt-dlp");
        assert!(ytdlp.is_available().await);
        // Memoised: a second lookup does not probe again
        assert_eq!(ytdlp.binary().await, "/usr/bin/yt-dlp");
        assert_eq!(
            *probed.lock().expect("lock"),
            vec!["yt-dlp", "/usr/local/bin/yt-dlp", "/usr/bin/yt-dlp"]
        );
    }

    #[tokio::test]
    async fn test_binary_falls_back_to_path() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(ProcessOutput::failed("not found")));
        let ytdlp = YtDlp::with_runner(Arc::new(CoreSettings::default()), Arc::new(runner));
        assert_eq!(ytdlp.binary().await, "yt-dlp");
        assert!(!ytdlp.is_available().await);
    }

    #[tokio::test]
    async fn test_extract_success_verifies_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(dir.path());
        let expected = dir.path().join("Never Gonna - dQw4w9WgXcQ.mp4");
        let expected_clone = expected.clone();

        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(move |_, args| {
            let has = |flag: &str| args.iter().any(|a| a == flag);
            match args.first().map(String::as_str) {
                Some("--version") => Ok(ProcessOutput::ok("2025.01.01")),
                _ if has("--get-title") => {
                    assert!(has("--no-playlist"), "title query walks the playlist");
                    Ok(ProcessOutput::ok("WARNING: noise\nNever Gonna\n"))
                }
                _ if has("--get-id") => {
                    assert!(has("--no-playlist"), "id query walks the playlist");
                    Ok(ProcessOutput::ok("dQw4w9WgXcQ\n"))
                }
                _ => {
                    assert!(args.iter().any(|a| a == "--merge-output-format"));
                    assert!(args.iter().any(|a| a == "--no-playlist"));
                    assert!(!args.iter().any(|a| a == "--cookies"));
                    std::fs::write(&expected_clone, b"video").expect("write");
                    Ok(ProcessOutput::ok(""))
                }
            }
        });

        let ytdlp = YtDlp::with_runner(settings, Arc::new(runner));
        let artifact = ytdlp
            .extract(
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLxyz123",
                Selection::Video(VideoQuality::P720),
            )
            .await
            .expect("extraction succeeds");
        assert_eq!(artifact.path, expected);
        assert_eq!(artifact.size_bytes, 5);
        assert_eq!(artifact.title, "Never Gonna");
    }

    #[tokio::test]
    async fn test_extract_reports_missing_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, args| {
            if args.iter().any(|a| a == "--get-title") {
                Ok(ProcessOutput::ok("Title"))
            } else if args.iter().any(|a| a == "--get-id") {
                Ok(ProcessOutput::ok("abc"))
            } else {
                Ok(ProcessOutput::ok(""))
            }
        });
        let ytdlp = YtDlp::with_runner(settings_in(dir.path()), Arc::new(runner));
        let err = ytdlp
            .extract("https://youtu.be/abc", Selection::Audio(AudioQuality::Best))
            .await
            .expect_err("no file was written");
        assert_eq!(
            err,
            ExtractionError::MissingOutput(dir.path().join("Title - abc.mp3"))
        );
    }

    #[tokio::test]
    async fn test_extract_maps_tool_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, args| {
            if args.iter().any(|a| a == "-x" || a == "-f") {
                Ok(ProcessOutput::failed(
                    "ERROR: [youtube] abc: Video unavailable. This video has been removed",
                ))
            } else {
                Ok(ProcessOutput::ok("x"))
            }
        });
        let ytdlp = YtDlp::with_runner(settings_in(dir.path()), Arc::new(runner));
        let err = ytdlp
            .extract("https://youtu.be/abc", Selection::Audio(AudioQuality::K128))
            .await
            .expect_err("tool failed");
        assert_eq!(err, ExtractionError::Removed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_times_out_as_connectivity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Arc::new(CoreSettings {
            download_dir: dir.path().to_path_buf(),
            extract_timeout_secs: 30,
            ..CoreSettings::default()
        });
        let ytdlp = YtDlp::with_runner(settings, Arc::new(PendingRunner));

        let started = tokio::time::Instant::now();
        let err = ytdlp
            .extract("https://youtu.be/abc", Selection::Video(VideoQuality::Best))
            .await
            .expect_err("hanging tool must time out");
        assert_eq!(err, ExtractionError::Connectivity);
        assert!(started.elapsed() <= Duration::from_secs(30));
    }
}
