//! Callback token codec
//!
//! Inline buttons carry an [`Action`] encoded as a colon-delimited token:
//!
//! | Shape | Example |
//! |---|---|
//! | `kind:quality:fp` | `v:720:1a2b3c4d5e6f` |
//! | `kind:count:quality:fp` | `pa:5:best:1a2b3c4d5e6f` |
//! | `kind:arg` | `list:1a2b3c4d5e6f`, `help:_` |
//!
//! Tokens must fit Telegram's 64-byte callback payload.

use crate::config::{CALLBACK_DATA_LIMIT, MAX_BATCH_COUNT};
use crate::fingerprint::Fingerprint;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TAG_VIDEO: &str = "v";
const TAG_AUDIO: &str = "a";
const TAG_PLAYLIST_VIDEO: &str = "p";
const TAG_PLAYLIST_AUDIO: &str = "pa";
const TAG_LIST: &str = "list";
const TAG_OPEN: &str = "open";
const TAG_HELP: &str = "help";
const TAG_SETTINGS: &str = "settings";

/// Placeholder argument for actions without a payload.
const NO_ARG: &str = "_";

/// Token decoding failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    /// Token does not match any known shape
    #[error("malformed callback token: {0:?}")]
    Malformed(String),
}

/// Kind of media the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// MP4 video
    Video,
    /// MP3 audio
    Audio,
}

impl MediaKind {
    /// File extension of the produced artifact
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "mp3",
        }
    }

    /// Human-readable noun used in captions
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// Vertical resolution cap for video downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoQuality {
    /// No cap
    Best,
    /// 1080p
    P1080,
    /// 720p
    P720,
    /// 480p
    P480,
    /// 360p
    P360,
}

impl VideoQuality {
    /// Every video quality, best first
    pub const ALL: [Self; 5] = [Self::Best, Self::P1080, Self::P720, Self::P480, Self::P360];

    /// Wire value used in tokens
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::P1080 => "1080",
            Self::P720 => "720",
            Self::P480 => "480",
            Self::P360 => "360",
        }
    }

    /// Height cap, `None` for [`VideoQuality::Best`]
    #[must_use]
    pub const fn max_height(self) -> Option<u32> {
        match self {
            Self::Best => None,
            Self::P1080 => Some(1080),
            Self::P720 => Some(720),
            Self::P480 => Some(480),
            Self::P360 => Some(360),
        }
    }

    /// Parse a wire value. Unknown values fall back to `Best` so that tokens
    /// minted by older or newer builds still work.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == raw)
            .unwrap_or(Self::Best)
    }
}

/// Bitrate for MP3 extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioQuality {
    /// Encoder default (VBR 0)
    Best,
    /// 320 kbps
    K320,
    /// 192 kbps
    K192,
    /// 128 kbps
    K128,
}

impl AudioQuality {
    /// Every audio quality, best first
    pub const ALL: [Self; 4] = [Self::Best, Self::K320, Self::K192, Self::K128];

    /// Wire value used in tokens
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::K320 => "320",
            Self::K192 => "192",
            Self::K128 => "128",
        }
    }

    /// Value passed to `--audio-quality`
    #[must_use]
    pub const fn ytdlp_bitrate(self) -> &'static str {
        match self {
            Self::Best => "0",
            Self::K320 => "320K",
            Self::K192 => "192K",
            Self::K128 => "128K",
        }
    }

    /// Parse a wire value. Unknown values fall back to `Best`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == raw)
            .unwrap_or(Self::Best)
    }
}

/// Media kind together with the quality valid for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Video at a resolution cap
    Video(VideoQuality),
    /// Audio at a bitrate
    Audio(AudioQuality),
}

impl Selection {
    /// Media kind of this selection
    #[must_use]
    pub const fn media(self) -> MediaKind {
        match self {
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
        }
    }

    /// Quality wire value
    #[must_use]
    pub const fn quality_str(self) -> &'static str {
        match self {
            Self::Video(q) => q.as_str(),
            Self::Audio(q) => q.as_str(),
        }
    }

    /// Best quality for a media kind
    #[must_use]
    pub const fn best(media: MediaKind) -> Self {
        match media {
            MediaKind::Video => Self::Video(VideoQuality::Best),
            MediaKind::Audio => Self::Audio(AudioQuality::Best),
        }
    }

    fn parse(media: MediaKind, raw_quality: &str) -> Self {
        match media {
            MediaKind::Video => Self::Video(VideoQuality::parse_lenient(raw_quality)),
            MediaKind::Audio => Self::Audio(AudioQuality::parse_lenient(raw_quality)),
        }
    }
}

/// Decoded button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Download one item
    Download {
        /// Media kind and quality
        selection: Selection,
        /// URL reference
        fingerprint: Fingerprint,
    },
    /// Download the first `count` items of a playlist
    Batch {
        /// Media kind and quality
        selection: Selection,
        /// Number of items
        count: u32,
        /// Playlist reference
        fingerprint: Fingerprint,
    },
    /// Show the items of a playlist
    List(Fingerprint),
    /// Show the choice screen for a URL
    Open(Fingerprint),
    /// Show usage help
    Help,
    /// Show settings
    Settings,
}

impl Action {
    /// Encode into a callback token.
    ///
    /// # Examples
    ///
    /// ```
    /// use ytgrab_core::callback::{Action, Selection, VideoQuality};
    /// use ytgrab_core::fingerprint::Fingerprint;
    ///
    /// let action = Action::Download {
    ///     selection: Selection::Video(VideoQuality::P720),
    ///     fingerprint: Fingerprint::from_token("1a2b3c4d5e6f"),
    /// };
    /// assert_eq!(action.encode(), "v:720:1a2b3c4d5e6f");
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        let token = match self {
            Self::Download {
                selection,
                fingerprint,
            } => {
                let tag = match selection.media() {
                    MediaKind::Video => TAG_VIDEO,
                    MediaKind::Audio => TAG_AUDIO,
                };
                format!("{tag}:{}:{fingerprint}", selection.quality_str())
            }
            Self::Batch {
                selection,
                count,
                fingerprint,
            } => {
                let tag = match selection.media() {
                    MediaKind::Video => TAG_PLAYLIST_VIDEO,
                    MediaKind::Audio => TAG_PLAYLIST_AUDIO,
                };
                format!("{tag}:{count}:{}:{fingerprint}", selection.quality_str())
            }
            Self::List(fingerprint) => format!("{TAG_LIST}:{fingerprint}"),
            Self::Open(fingerprint) => format!("{TAG_OPEN}:{fingerprint}"),
            Self::Help => format!("{TAG_HELP}:{NO_ARG}"),
            Self::Settings => format!("{TAG_SETTINGS}:{NO_ARG}"),
        };
        debug_assert!(token.len() <= CALLBACK_DATA_LIMIT);
        token
    }

    /// Decode a callback token.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::Malformed`] when the token does not have
    /// exactly the field count its kind requires, names an unknown kind, has
    /// an empty fingerprint, or carries an invalid batch count.
    pub fn decode(token: &str) -> Result<Self, CallbackError> {
        let malformed = || CallbackError::Malformed(token.to_string());
        let parts: Vec<&str> = token.split(':').collect();

        if token.len() > CALLBACK_DATA_LIMIT || parts.iter().any(|p| p.is_empty()) {
            return Err(malformed());
        }

        match parts.as_slice() {
            [TAG_LIST, fp] => Ok(Self::List(Fingerprint::from_token(fp))),
            [TAG_OPEN, fp] => Ok(Self::Open(Fingerprint::from_token(fp))),
            [TAG_HELP, _] => Ok(Self::Help),
            [TAG_SETTINGS, _] => Ok(Self::Settings),
            [tag @ (TAG_VIDEO | TAG_AUDIO), quality, fp] => {
                let media = if *tag == TAG_VIDEO {
                    MediaKind::Video
                } else {
                    MediaKind::Audio
                };
                Ok(Self::Download {
                    selection: Selection::parse(media, quality),
                    fingerprint: Fingerprint::from_token(fp),
                })
            }
            [tag @ (TAG_PLAYLIST_VIDEO | TAG_PLAYLIST_AUDIO), count, quality, fp] => {
                let media = if *tag == TAG_PLAYLIST_VIDEO {
                    MediaKind::Video
                } else {
                    MediaKind::Audio
                };
                let count = count
                    .parse::<u32>()
                    .ok()
                    .filter(|c| (1..=MAX_BATCH_COUNT).contains(c))
                    .ok_or_else(malformed)?;
                Ok(Self::Batch {
                    selection: Selection::parse(media, quality),
                    count,
                    fingerprint: Fingerprint::from_token(fp),
                })
            }
            _ => Err(malformed()),
        }
    }
}

impl FromStr for Action {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
