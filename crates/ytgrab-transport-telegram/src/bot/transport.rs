//! [`ChatTransport`] implementation backed by the Telegram Bot API.

use crate::bot::resilient::{
    edit_message_safe_resilient, retry_telegram_operation, send_message_resilient,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId,
    ParseMode,
};
use tracing::{debug, warn};
use ytgrab_core::callback::MediaKind;
use ytgrab_core::transport::{
    ButtonTarget, ChatRef, ChatTransport, Keyboard, MediaUpload, MessageRef, PhotoSource,
};

/// Telegram-backed chat transport.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a configured bot.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Convert a platform-neutral keyboard into Telegram inline markup.
///
/// Link buttons whose URL does not parse are dropped.
#[must_use]
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows = keyboard.rows.iter().map(|row| {
        row.iter()
            .filter_map(|button| match &button.target {
                ButtonTarget::Callback(data) => Some(InlineKeyboardButton::callback(
                    button.label.clone(),
                    data.clone(),
                )),
                ButtonTarget::Url(link) => match url::Url::parse(link) {
                    Ok(parsed) => Some(InlineKeyboardButton::url(button.label.clone(), parsed)),
                    Err(e) => {
                        warn!(link = %link, error = %e, "Dropping button with invalid URL");
                        None
                    }
                },
            })
            .collect::<Vec<_>>()
    });
    InlineKeyboardMarkup::new(rows)
}

const fn chat_id(chat: ChatRef) -> ChatId {
    ChatId(chat.0)
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(
        &self,
        chat: ChatRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        let msg = send_message_resilient(
            &self.bot,
            chat_id(chat),
            text,
            Some(ParseMode::Html),
            keyboard.as_ref().map(to_markup),
        )
        .await?;
        Ok(MessageRef(msg.id.0))
    }

    async fn send_photo(
        &self,
        chat: ChatRef,
        photo: PhotoSource,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        let file = match photo {
            PhotoSource::Local(path) => InputFile::file(path),
            PhotoSource::Remote(link) => {
                InputFile::url(url::Url::parse(&link).map_err(|e| anyhow!("bad photo URL: {e}"))?)
            }
        };
        let mut req = self
            .bot
            .send_photo(chat_id(chat), file)
            .caption(caption)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(to_markup(&keyboard));
        }
        let msg = req.await.map_err(|e| anyhow!("Telegram photo error: {e}"))?;
        Ok(MessageRef(msg.id.0))
    }

    async fn send_media(&self, chat: ChatRef, upload: MediaUpload) -> Result<MessageRef> {
        debug!(path = %upload.path.display(), media = ?upload.media, "Uploading file");
        let file = InputFile::file(upload.path);
        let sent = match upload.media {
            MediaKind::Video => {
                self.bot
                    .send_video(chat_id(chat), file)
                    .caption(upload.caption)
                    .parse_mode(ParseMode::Html)
                    .supports_streaming(true)
                    .await
            }
            MediaKind::Audio => {
                self.bot
                    .send_audio(chat_id(chat), file)
                    .caption(upload.caption)
                    .parse_mode(ParseMode::Html)
                    .await
            }
        };
        let msg = sent.map_err(|e| anyhow!("{e}"))?;
        Ok(MessageRef(msg.id.0))
    }

    async fn edit_text(&self, chat: ChatRef, message: MessageRef, text: &str) -> Result<()> {
        if edit_message_safe_resilient(&self.bot, chat_id(chat), MessageId(message.0), text).await
        {
            Ok(())
        } else {
            Err(anyhow!("message {} could not be edited", message.0))
        }
    }

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<()> {
        retry_telegram_operation(|| async {
            self.bot
                .delete_message(chat_id(chat), MessageId(message.0))
                .await
                .map_err(|e| anyhow!("Telegram delete error: {e}"))
        })
        .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<String>) -> Result<()> {
        let mut req = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_owned()));
        if let Some(text) = text {
            req = req.text(text);
        }
        req.await
            .map_err(|e| anyhow!("Telegram callback answer error: {e}"))?;
        Ok(())
    }
}
