//! Chat transport abstraction.
//!
//! The dispatch core never talks to Telegram directly. Everything it needs
//! from the chat platform goes through [`ChatTransport`].

use crate::callback::{Action, MediaKind};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Chat a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef(pub i64);

/// A message previously sent by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(pub i32);

/// What a button does when pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonTarget {
    /// Sends an encoded [`Action`] back as callback data
    Callback(String),
    /// Opens an external link
    Url(String),
}

/// One inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Visible label
    pub label: String,
    /// Press behaviour
    pub target: ButtonTarget,
}

impl Button {
    /// Button that triggers an action
    #[must_use]
    pub fn action(label: impl Into<String>, action: &Action) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Callback(action.encode()),
        }
    }

    /// Button that opens a URL
    #[must_use]
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Url(url.into()),
        }
    }

    /// Callback payload, if this is an action button
    #[must_use]
    pub fn callback_data(&self) -> Option<&str> {
        match &self.target {
            ButtonTarget::Callback(data) => Some(data),
            ButtonTarget::Url(_) => None,
        }
    }
}

/// Inline keyboard: rows of buttons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    /// Button rows, top to bottom
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Builds a keyboard from rows
    #[must_use]
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// All buttons in reading order
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// Source of a photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// File on local disk
    Local(PathBuf),
    /// Remote URL fetched by the platform
    Remote(String),
}

/// File upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    /// Local file to upload
    pub path: PathBuf,
    /// Whether to send as video or audio
    pub media: MediaKind,
    /// Caption (HTML)
    pub caption: String,
}

/// Outbound operations the dispatch core needs from a chat platform.
///
/// Texts are HTML formatted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text message.
    async fn send_text(
        &self,
        chat: ChatRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef>;

    /// Send a photo with a caption.
    async fn send_photo(
        &self,
        chat: ChatRef,
        photo: PhotoSource,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef>;

    /// Upload a video or audio file. Errors are reported as text so the
    /// caller can classify transient failures.
    async fn send_media(&self, chat: ChatRef, upload: MediaUpload) -> Result<MessageRef>;

    /// Replace the text of a message sent earlier.
    async fn edit_text(&self, chat: ChatRef, message: MessageRef, text: &str) -> Result<()>;

    /// Delete a message sent earlier.
    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<()>;

    /// Acknowledge a button press, optionally with a short toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<String>) -> Result<()>;
}
