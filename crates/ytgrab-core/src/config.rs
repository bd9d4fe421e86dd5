//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the limits used by the dispatch core.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Telegram's hard upload limit for bot file sends (50 MiB).
pub const TELEGRAM_UPLOAD_LIMIT_BYTES: u64 = 50 * 1024 * 1024;
/// Callback payload ceiling imposed by Telegram.
pub const CALLBACK_DATA_LIMIT: usize = 64;
/// Per-item extraction timeout (10 minutes).
pub const EXTRACT_TIMEOUT_SECS: u64 = 600;
/// Playlist metadata fetch timeout (30 minutes).
pub const PLAYLIST_TIMEOUT_SECS: u64 = 1800;
/// Timeout for `--version` probes and metadata calls.
pub const PROBE_TIMEOUT_SECS: u64 = 60;
/// Maximum delivery attempts for one artifact.
pub const DELIVERY_MAX_ATTEMPTS: u32 = 3;
/// Backoff step between delivery attempts, multiplied by the attempt number.
pub const DELIVERY_BACKOFF_STEP_SECS: u64 = 2;
/// Largest batch a single button may request.
pub const MAX_BATCH_COUNT: u32 = 50;

/// Browser user agent passed to yt-dlp.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Core settings shared by every component of the dispatch pipeline
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoreSettings {
    /// Working directory for extracted files
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Explicit yt-dlp binary, probed before the built-in candidates
    #[serde(default)]
    pub ytdlp_path: Option<String>,
    /// Netscape cookie file passed to yt-dlp when present on disk
    #[serde(default = "default_cookies_file")]
    pub cookies_file: PathBuf,
    /// User agent passed to yt-dlp
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Wall-clock budget for one extraction
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout_secs: u64,
    /// Wall-clock budget for one playlist listing
    #[serde(default = "default_playlist_timeout")]
    pub playlist_timeout_secs: u64,
    /// Maximum number of fingerprints kept in memory
    #[serde(default = "default_cache_capacity")]
    pub fingerprint_cache_capacity: u64,
    /// Idle time after which a fingerprint expires
    #[serde(default = "default_cache_idle")]
    pub fingerprint_cache_idle_secs: u64,
    /// Largest file the transport accepts
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: u64,
    /// Delivery attempts per artifact
    #[serde(default = "default_delivery_attempts")]
    pub delivery_max_attempts: u32,
    /// Items offered by the "first N" playlist buttons
    #[serde(default = "default_batch_size")]
    pub playlist_batch_size: u32,
    /// Items shown by "View all items"
    #[serde(default = "default_list_limit")]
    pub playlist_list_limit: usize,
    /// Local welcome picture, used when the file exists
    #[serde(default = "default_welcome_image_path")]
    pub welcome_image_path: PathBuf,
    /// Remote welcome picture used otherwise
    #[serde(default = "default_welcome_image_url")]
    pub welcome_image_url: String,
    /// Link behind the "Examples" button
    #[serde(default = "default_examples_url")]
    pub examples_url: String,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_cookies_file() -> PathBuf {
    PathBuf::from("cookies.txt")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

const fn default_extract_timeout() -> u64 {
    EXTRACT_TIMEOUT_SECS
}

const fn default_playlist_timeout() -> u64 {
    PLAYLIST_TIMEOUT_SECS
}

const fn default_cache_capacity() -> u64 {
    10_000
}

const fn default_cache_idle() -> u64 {
    86_400
}

const fn default_max_upload() -> u64 {
    TELEGRAM_UPLOAD_LIMIT_BYTES
}

const fn default_delivery_attempts() -> u32 {
    DELIVERY_MAX_ATTEMPTS
}

const fn default_batch_size() -> u32 {
    5
}

const fn default_list_limit() -> usize {
    25
}

fn default_welcome_image_path() -> PathBuf {
    PathBuf::from("assets/welcome.jpg")
}

fn default_welcome_image_url() -> String {
    "https://images.unsplash.com/photo-1515879218367-8466d910aaa4?w=1200&q=80&auto=format&fit=crop"
        .to_string()
}

fn default_examples_url() -> String {
    "https://github.com/Milanz247/Yt-Video-mp3-downloader.bot-telegram#example-links-to-test"
        .to_string()
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            ytdlp_path: None,
            cookies_file: default_cookies_file(),
            user_agent: default_user_agent(),
            extract_timeout_secs: default_extract_timeout(),
            playlist_timeout_secs: default_playlist_timeout(),
            fingerprint_cache_capacity: default_cache_capacity(),
            fingerprint_cache_idle_secs: default_cache_idle(),
            max_upload_bytes: default_max_upload(),
            delivery_max_attempts: default_delivery_attempts(),
            playlist_batch_size: default_batch_size(),
            playlist_list_limit: default_list_limit(),
            welcome_image_path: default_welcome_image_path(),
            welcome_image_url: default_welcome_image_url(),
            examples_url: default_examples_url(),
        }
    }
}

/// Build the layered configuration source shared by all settings structs.
///
/// Sources, lowest priority first: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` variables, then bare environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if any source cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // ignore_empty treats empty env vars as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl CoreSettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Extraction deadline as a [`Duration`]
    #[must_use]
    pub const fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    /// Playlist listing deadline as a [`Duration`]
    #[must_use]
    pub const fn playlist_timeout(&self) -> Duration {
        Duration::from_secs(self.playlist_timeout_secs)
    }

    /// Fingerprint idle expiry as a [`Duration`]
    #[must_use]
    pub const fn fingerprint_idle(&self) -> Duration {
        Duration::from_secs(self.fingerprint_cache_idle_secs)
    }

    /// Batch size clamped to the range a callback token can carry
    #[must_use]
    pub fn batch_size(&self) -> u32 {
        self.playlist_batch_size.clamp(1, MAX_BATCH_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_defaults_match_transport_limits() {
        let settings = CoreSettings::default();
        assert_eq!(settings.max_upload_bytes, 52_428_800);
        assert_eq!(settings.extract_timeout(), Duration::from_secs(600));
        assert_eq!(settings.playlist_timeout(), Duration::from_secs(1800));
        assert_eq!(settings.delivery_max_attempts, 3);
        assert_eq!(settings.batch_size(), 5);
        assert_eq!(settings.playlist_list_limit, 25);
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let settings = CoreSettings {
            playlist_batch_size: 500,
            ..CoreSettings::default()
        };
        assert_eq!(settings.batch_size(), MAX_BATCH_COUNT);

        let settings = CoreSettings {
            playlist_batch_size: 0,
            ..CoreSettings::default()
        };
        assert_eq!(settings.batch_size(), 1);
    }

    #[test]
    fn test_env_overrides() -> Result<(), Box<dyn std::error::Error>> {
        env::set_var("DOWNLOAD_DIR", "/tmp/ytgrab-test");
        env::set_var("FINGERPRINT_CACHE_CAPACITY", "42");

        let settings = CoreSettings::new()?;
        assert_eq!(settings.download_dir, PathBuf::from("/tmp/ytgrab-test"));
        assert_eq!(settings.fingerprint_cache_capacity, 42);

        env::remove_var("DOWNLOAD_DIR");
        env::remove_var("FINGERPRINT_CACHE_CAPACITY");
        Ok(())
    }
}
