//! Telegram transport settings.

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ytgrab_core::config::CoreSettings;

/// Initial delay of the Telegram API retry backoff.
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound of a single Telegram API retry delay.
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Retries after the first failed Telegram API call.
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

/// Upload timeout for the HTTP client; large videos take a while.
pub const TELEGRAM_UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token (`TELEGRAM_TOKEN`).
    #[serde(default)]
    pub telegram_token: Option<String>,
    /// Alternative name used by older deployments (`TELEGRAM_BOT_TOKEN`).
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        ytgrab_core::config::build_config()?.try_deserialize()
    }

    /// The configured token, preferring `TELEGRAM_TOKEN`. Blank values count
    /// as missing.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        [&self.telegram_token, &self.telegram_bot_token]
            .into_iter()
            .filter_map(|t| t.as_deref().map(str::trim))
            .find(|t| !t.is_empty())
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Dispatch core settings shared across handlers.
    pub core: Arc<CoreSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(core: CoreSettings, telegram: TelegramSettings) -> Self {
        Self {
            core: Arc::new(core),
            telegram: Arc::new(telegram),
        }
    }
}
