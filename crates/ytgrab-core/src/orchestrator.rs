//! Request orchestration
//!
//! Turns inbound texts and button presses into extraction and delivery work.
//! Every request moves `Idle → AwaitingChoice → Processing → {Delivered,
//! Failed}`; each entry point returns the [`FlowOutcome`] it reached.

use crate::callback::{Action, Selection};
use crate::collection::{CollectionError, CollectionSource};
use crate::config::CoreSettings;
use crate::delivery::{DeliveryError, DeliveryManager};
use crate::extractor::{ExtractionError, MediaExtractor};
use crate::fingerprint::{Fingerprint, FingerprintCache};
use crate::link::{classify, find_link, has_url_prefix, FoundLink, LinkKind};
use crate::transport::{ChatRef, ChatTransport, Keyboard, MessageRef, PhotoSource};
use crate::views;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Why a request ended in failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowFailure {
    /// Button payload could not be decoded
    InvalidCallback,
    /// yt-dlp did not produce a file
    Extraction(String),
    /// The file could not be delivered
    Delivery(String),
    /// The playlist could not be listed
    Collection(String),
    /// The playlist listed no items
    EmptyCollection,
}

impl From<ExtractionError> for FlowFailure {
    fn from(e: ExtractionError) -> Self {
        Self::Extraction(e.to_string())
    }
}

impl From<DeliveryError> for FlowFailure {
    fn from(e: DeliveryError) -> Self {
        Self::Delivery(e.to_string())
    }
}

impl From<CollectionError> for FlowFailure {
    fn from(e: CollectionError) -> Self {
        Self::Collection(e.to_string())
    }
}

/// Counters of a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Items listed and attempted
    pub attempted: usize,
    /// Items delivered
    pub succeeded: usize,
    /// Items that failed extraction or delivery
    pub failed: usize,
}

/// State a request reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Choice keyboard shown, waiting for a button press
    AwaitingChoice,
    /// Input was not a usable link or command
    Rejected,
    /// Button referred to a URL that is no longer cached
    Expired,
    /// File delivered
    Delivered,
    /// Request failed
    Failed(FlowFailure),
    /// Playlist items shown
    Listed(usize),
    /// Batch finished
    BatchCompleted(BatchSummary),
    /// Informational message shown
    Informed,
}

/// Drives requests from inbound events to delivered files.
pub struct RequestOrchestrator {
    transport: Arc<dyn ChatTransport>,
    extractor: Arc<dyn MediaExtractor>,
    collections: Arc<dyn CollectionSource>,
    cache: FingerprintCache,
    delivery: DeliveryManager,
    settings: Arc<CoreSettings>,
}

impl RequestOrchestrator {
    /// Wire an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        extractor: Arc<dyn MediaExtractor>,
        collections: Arc<dyn CollectionSource>,
        settings: Arc<CoreSettings>,
    ) -> Self {
        let cache = FingerprintCache::new(
            settings.fingerprint_cache_capacity,
            settings.fingerprint_idle(),
        );
        let delivery = DeliveryManager::new(transport.clone(), &settings);
        Self {
            transport,
            extractor,
            collections,
            cache,
            delivery,
            settings,
        }
    }

    /// Fingerprint cache shared by all requests
    #[must_use]
    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────

    /// `/start`: welcome photo with the main buttons.
    #[instrument(skip(self), fields(chat = chat.0))]
    pub async fn welcome(&self, chat: ChatRef) -> FlowOutcome {
        let local = &self.settings.welcome_image_path;
        let photo = if tokio::fs::try_exists(local).await.unwrap_or(false) {
            PhotoSource::Local(local.clone())
        } else {
            PhotoSource::Remote(self.settings.welcome_image_url.clone())
        };
        let keyboard = views::welcome_keyboard(&self.settings.examples_url);

        if let Err(e) = self
            .transport
            .send_photo(chat, photo, views::WELCOME_CAPTION, Some(keyboard.clone()))
            .await
        {
            warn!(error = %e, "Welcome photo failed, sending text instead");
            self.say(chat, views::WELCOME_CAPTION, Some(keyboard)).await;
        }
        FlowOutcome::Informed
    }

    /// `/help`
    #[instrument(skip(self), fields(chat = chat.0))]
    pub async fn help(&self, chat: ChatRef) -> FlowOutcome {
        self.say(chat, views::HELP_TEXT, None).await;
        FlowOutcome::Informed
    }

    /// Any other `/command`
    #[instrument(skip(self), fields(chat = chat.0))]
    pub async fn unknown_command(&self, chat: ChatRef) -> FlowOutcome {
        self.say(chat, views::UNKNOWN_COMMAND, None).await;
        FlowOutcome::Rejected
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inbound text
    // ─────────────────────────────────────────────────────────────────────

    /// Plain text: offer choices for a supported link, reject anything else.
    #[instrument(skip(self, text), fields(chat = chat.0))]
    pub async fn handle_text(&self, chat: ChatRef, text: &str) -> FlowOutcome {
        match find_link(text) {
            Some(FoundLink { kind, url }) => {
                let fingerprint = self.cache.register(url).await;
                self.present_choices(chat, &fingerprint, kind).await
            }
            None if has_url_prefix(text) => {
                info!("Unsupported link");
                self.say(chat, views::UNSUPPORTED_LINK, None).await;
                FlowOutcome::Rejected
            }
            None => {
                self.say(chat, views::SEND_VALID_LINK, None).await;
                FlowOutcome::Rejected
            }
        }
    }

    async fn present_choices(
        &self,
        chat: ChatRef,
        fingerprint: &Fingerprint,
        kind: LinkKind,
    ) -> FlowOutcome {
        let (text, keyboard) = if kind == LinkKind::Collection {
            (
                views::PLAYLIST_DETECTED,
                views::collection_keyboard(fingerprint, self.settings.batch_size()),
            )
        } else {
            (views::CHOOSE_QUALITY, views::quality_keyboard(fingerprint))
        };
        info!(fingerprint = %fingerprint, ?kind, "Presenting choices");
        self.say(chat, text, Some(keyboard)).await;
        FlowOutcome::AwaitingChoice
    }

    // ─────────────────────────────────────────────────────────────────────
    // Button presses
    // ─────────────────────────────────────────────────────────────────────

    /// Button press. The callback is answered exactly once.
    #[instrument(skip(self, callback_id), fields(chat = chat.0))]
    pub async fn handle_callback(&self, chat: ChatRef, callback_id: &str, data: &str) -> FlowOutcome {
        let action = match Action::decode(data) {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "Rejected callback");
                self.answer(callback_id, views::TOAST_INVALID).await;
                return FlowOutcome::Failed(FlowFailure::InvalidCallback);
            }
        };

        match action {
            Action::Help => {
                self.answer(callback_id, views::TOAST_HELP).await;
                self.help(chat).await
            }
            Action::Settings => {
                self.answer(callback_id, views::TOAST_SETTINGS).await;
                self.say(chat, views::SETTINGS_TEXT, None).await;
                FlowOutcome::Informed
            }
            Action::List(fingerprint) => self.list_items(chat, callback_id, &fingerprint).await,
            Action::Open(fingerprint) => self.open(chat, callback_id, &fingerprint).await,
            Action::Download {
                selection,
                fingerprint,
            } => {
                let Some(url) = self
                    .resolve_or_expire(callback_id, &fingerprint, views::LINK_EXPIRED)
                    .await
                else {
                    return FlowOutcome::Expired;
                };
                self.answer(callback_id, views::TOAST_PROCESSING).await;
                self.run_single(chat, &url, selection).await
            }
            Action::Batch {
                selection,
                count,
                fingerprint,
            } => {
                let Some(url) = self
                    .resolve_or_expire(callback_id, &fingerprint, views::LINK_EXPIRED)
                    .await
                else {
                    return FlowOutcome::Expired;
                };
                self.answer(callback_id, views::TOAST_PROCESSING).await;
                self.run_batch(chat, &url, selection, count).await
            }
        }
    }

    /// Resolve a fingerprint, answering the callback with `expired_text`
    /// when it is unknown.
    async fn resolve_or_expire(
        &self,
        callback_id: &str,
        fingerprint: &Fingerprint,
        expired_text: &str,
    ) -> Option<String> {
        match self.cache.resolve(fingerprint).await {
            Ok(url) => Some(url),
            Err(e) => {
                info!(error = %e, "Callback for expired link");
                self.answer(callback_id, expired_text).await;
                None
            }
        }
    }

    async fn open(&self, chat: ChatRef, callback_id: &str, fingerprint: &Fingerprint) -> FlowOutcome {
        let Some(url) = self
            .resolve_or_expire(callback_id, fingerprint, views::ITEM_EXPIRED)
            .await
        else {
            return FlowOutcome::Expired;
        };
        self.answer(callback_id, views::TOAST_OPEN_OPTIONS).await;
        // Playlist items are plain watch links; anything not a playlist gets
        // the single-item screen.
        let kind = match classify(&url) {
            LinkKind::Collection => LinkKind::Collection,
            LinkKind::Single | LinkKind::None => LinkKind::Single,
        };
        self.present_choices(chat, fingerprint, kind).await
    }

    async fn list_items(
        &self,
        chat: ChatRef,
        callback_id: &str,
        fingerprint: &Fingerprint,
    ) -> FlowOutcome {
        self.answer(callback_id, views::TOAST_OPEN_ITEMS).await;
        let Ok(url) = self.cache.resolve(fingerprint).await else {
            self.say(chat, views::PLAYLIST_EXPIRED, None).await;
            return FlowOutcome::Expired;
        };

        let entries = match self
            .collections
            .list_entries(&url, self.settings.playlist_list_limit)
            .await
        {
            Ok(entries) if entries.is_empty() => {
                self.say(chat, views::PLAYLIST_ITEMS_FAILED, None).await;
                return FlowOutcome::Failed(FlowFailure::EmptyCollection);
            }
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Playlist listing failed");
                self.say(chat, views::PLAYLIST_ITEMS_FAILED, None).await;
                return FlowOutcome::Failed(e.into());
            }
        };

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let item = self.cache.register(&entry.link).await;
            items.push((item, entry.title));
        }
        let count = items.len();
        self.say(
            chat,
            views::PLAYLIST_ITEMS,
            Some(views::items_keyboard(&items, fingerprint)),
        )
        .await;
        FlowOutcome::Listed(count)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Processing
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip(self), fields(chat = chat.0, media = %selection.media()))]
    async fn run_single(&self, chat: ChatRef, url: &str, selection: Selection) -> FlowOutcome {
        info!(url = %url, quality = selection.quality_str(), "Starting download");
        let progress = self.say(chat, views::DOWNLOADING, None).await;
        let extracted = self.extractor.extract(url, selection).await;
        self.retract(chat, progress).await;

        let artifact = match extracted {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(error = %e, "Download failed");
                self.say(chat, &views::extraction_failed(&e.to_string()), None)
                    .await;
                return FlowOutcome::Failed(e.into());
            }
        };

        match self.delivery.deliver(chat, &artifact).await {
            Ok(()) => FlowOutcome::Delivered,
            Err(e) => FlowOutcome::Failed(e.into()),
        }
    }

    #[instrument(skip(self), fields(chat = chat.0, media = %selection.media()))]
    async fn run_batch(
        &self,
        chat: ChatRef,
        url: &str,
        selection: Selection,
        count: u32,
    ) -> FlowOutcome {
        info!(url = %url, count, "Starting playlist download");
        let progress = self.say(chat, &views::batch_started(count), None).await;

        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        let entries = match self.collections.list_entries(url, limit).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Playlist fetch failed");
                self.retract(chat, progress).await;
                self.say(chat, views::PLAYLIST_FETCH_FAILED, None).await;
                return FlowOutcome::Failed(e.into());
            }
        };

        let total = entries.len();
        let mut summary = BatchSummary {
            attempted: total,
            ..BatchSummary::default()
        };
        for (i, entry) in entries.iter().enumerate() {
            if let Some(message) = progress {
                if let Err(e) = self
                    .transport
                    .edit_text(chat, message, &views::batch_progress(i + 1, total))
                    .await
                {
                    warn!(error = %e, "Failed to update batch progress");
                }
            }

            let artifact = match self.extractor.extract(&entry.link, selection).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!(item = i + 1, error = %e, "Playlist item download failed");
                    summary.failed += 1;
                    continue;
                }
            };
            match self.delivery.deliver(chat, &artifact).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    warn!(item = i + 1, error = %e, "Playlist item delivery failed");
                    summary.failed += 1;
                }
            }
        }

        self.retract(chat, progress).await;
        self.say(chat, &views::batch_summary(summary.succeeded, total), None)
            .await;
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            total,
            "Playlist download finished"
        );
        FlowOutcome::BatchCompleted(summary)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transport helpers: failures are logged, never propagated
    // ─────────────────────────────────────────────────────────────────────

    async fn say(&self, chat: ChatRef, text: &str, keyboard: Option<Keyboard>) -> Option<MessageRef> {
        match self.transport.send_text(chat, text, keyboard).await {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Failed to send message");
                None
            }
        }
    }

    async fn answer(&self, callback_id: &str, text: &str) {
        if let Err(e) = self
            .transport
            .answer_callback(callback_id, Some(text.to_string()))
            .await
        {
            warn!(error = %e, "Failed to answer callback");
        }
    }

    async fn retract(&self, chat: ChatRef, message: Option<MessageRef>) {
        if let Some(message) = message {
            if let Err(e) = self.transport.delete_message(chat, message).await {
                warn!(error = %e, "Failed to delete progress message");
            }
        }
    }
}
