//! Hand-written doubles for unit tests that need stateful behaviour
//! mockall expectations would make noisy.
#![allow(missing_docs)]

use crate::callback::Selection;
use crate::collection::{CollectionEntry, CollectionError, CollectionSource};
use crate::extractor::{Artifact, ExtractionError, MediaExtractor, ProcessOutput, ProcessRunner};
use crate::transport::{ChatRef, ChatTransport, Keyboard, MediaUpload, MessageRef, PhotoSource};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

/// Process runner whose processes never finish.
pub struct PendingRunner;

#[async_trait]
impl ProcessRunner for PendingRunner {
    async fn run(&self, _program: &str, _args: &[String]) -> std::io::Result<ProcessOutput> {
        std::future::pending().await
    }
}

/// Everything a [`RecordingTransport`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        photo: PhotoSource,
        caption: String,
        keyboard: Option<Keyboard>,
    },
    Media(MediaUpload),
    Edit {
        message: MessageRef,
        text: String,
    },
    Delete(MessageRef),
    Answer {
        id: String,
        text: Option<String>,
    },
}

/// Transport that records every call and always succeeds, except for
/// media uploads when `fail_media` is set.
#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<Sent>>,
    next_id: AtomicI32,
    fail_media: bool,
}

impl RecordingTransport {
    pub fn rejecting_uploads() -> Self {
        Self {
            fail_media: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Sent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn answers(&self) -> Vec<Option<String>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Sent::Answer { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<MediaUpload> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Sent::Media(upload) => Some(upload),
                _ => None,
            })
            .collect()
    }

    pub fn last_keyboard(&self) -> Option<Keyboard> {
        self.events().into_iter().rev().find_map(|e| match e {
            Sent::Text { keyboard, .. } | Sent::Photo { keyboard, .. } => keyboard,
            _ => None,
        })
    }

    fn record(&self, event: Sent) -> MessageRef {
        self.events.lock().expect("events lock").push(event);
        MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(
        &self,
        _chat: ChatRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        Ok(self.record(Sent::Text {
            text: text.to_string(),
            keyboard,
        }))
    }

    async fn send_photo(
        &self,
        _chat: ChatRef,
        photo: PhotoSource,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        Ok(self.record(Sent::Photo {
            photo,
            caption: caption.to_string(),
            keyboard,
        }))
    }

    async fn send_media(&self, _chat: ChatRef, upload: MediaUpload) -> Result<MessageRef> {
        let id = self.record(Sent::Media(upload));
        if self.fail_media {
            return Err(anyhow!("Bad Request: file rejected"));
        }
        Ok(id)
    }

    async fn edit_text(&self, _chat: ChatRef, message: MessageRef, text: &str) -> Result<()> {
        self.record(Sent::Edit {
            message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat: ChatRef, message: MessageRef) -> Result<()> {
        self.record(Sent::Delete(message));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<String>) -> Result<()> {
        self.record(Sent::Answer {
            id: callback_id.to_string(),
            text,
        });
        Ok(())
    }
}

/// Extractor that writes a small file per call, failing for chosen URLs.
pub struct ScriptedExtractor {
    dir: PathBuf,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, Selection)>>,
}

impl ScriptedExtractor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Selection)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl MediaExtractor for ScriptedExtractor {
    async fn extract(&self, url: &str, selection: Selection) -> Result<Artifact, ExtractionError> {
        let index = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push((url.to_string(), selection));
            calls.len()
        };
        if self.failing.contains(url) {
            return Err(ExtractionError::Removed);
        }
        let path = self
            .dir
            .join(format!("item {index}.{}", selection.media().extension()));
        std::fs::write(&path, b"media").map_err(|_| ExtractionError::MissingOutput(path.clone()))?;
        Ok(Artifact {
            path,
            size_bytes: 5,
            media: selection.media(),
            title: format!("Item {index}"),
        })
    }
}

/// Collection source serving a fixed list.
pub struct StaticCollection(pub Vec<CollectionEntry>);

impl StaticCollection {
    /// Playlist of `n` distinct video links.
    pub fn of_len(n: usize) -> Self {
        Self(
            (1..=n)
                .map(|i| CollectionEntry {
                    title: format!("Track {i}"),
                    link: format!("https://www.youtube.com/watch?v=vid{i:08}"),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl CollectionSource for StaticCollection {
    async fn list_entries(
        &self,
        _url: &str,
        max: usize,
    ) -> Result<Vec<CollectionEntry>, CollectionError> {
        Ok(self.0.iter().take(max).cloned().collect())
    }
}
