//! View layer
//!
//! Texts and inline keyboards shown to the user. All texts are HTML.

use crate::callback::{Action, AudioQuality, MediaKind, Selection, VideoQuality};
use crate::fingerprint::Fingerprint;
use crate::transport::{Button, Keyboard};
use crate::utils::{escape_html, truncate_with_ellipsis};

/// Longest playlist item title shown on a button, in grapheme clusters.
pub const ITEM_LABEL_TITLE_LEN: usize = 50;

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Caption of the `/start` photo
pub const WELCOME_CAPTION: &str = "🎥 <b>Welcome to YouTube Downloader Bot!</b>

I can download YouTube videos and playlists. Send a link to get started.";

/// Usage help
pub const HELP_TEXT: &str = r"📖 <b>Help - How to use this bot</b>

<b>Supported Platform:</b>
• YouTube (videos, shorts, and playlists)

<b>Supported Formats:</b>
• Video: MP4 (various qualities: 360p, 480p, 720p, 1080p, best)
• Audio: MP3 (128kbps, 192kbps, 320kbps, best)
• Playlists: Download entire playlists or individual videos

<b>How to use:</b>
1. Copy a video or playlist link from YouTube
2. Send the link to me
3. Select your preferred quality from the options
4. Wait for the download to complete
5. Receive your media file!

<b>Playlist Options:</b>
• Download as single video (if playlist link)
• Download the first few videos from a playlist
• Browse the playlist and pick one item

<b>Commands:</b>
/start - Start the bot
/help - Show this help message

<b>Note:</b> Large files may take time to process. Please be patient! 🙏";

/// Settings screen
pub const SETTINGS_TEXT: &str = "⚙️ Settings are minimal for now. Send /help for instructions.";

/// Reply to text without any link
pub const SEND_VALID_LINK: &str = "Please send a valid YouTube video or playlist link.";
/// Reply to a link of an unsupported site
pub const UNSUPPORTED_LINK: &str =
    "❌ Unsupported link. Please send a YouTube video or playlist link.";
/// Reply to an unknown `/command`
pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help for available commands.";

/// Button pressed on a download choice whose URL is no longer known
pub const LINK_EXPIRED: &str = "❌ Link expired. Please send the link again.";
/// Playlist browse pressed after the playlist URL expired
pub const PLAYLIST_EXPIRED: &str = "❌ Playlist link expired. Please send the playlist again.";
/// Playlist item pressed after its URL expired
pub const ITEM_EXPIRED: &str = "❌ Link expired. Please view playlist again.";

/// Header of the single-item choice screen
pub const CHOOSE_QUALITY: &str =
    "📥 <b>Choose quality:</b>\n\nSelect the format and quality you prefer:";
/// Header of the playlist choice screen
pub const PLAYLIST_DETECTED: &str = "📋 <b>Playlist detected!</b>\n\nChoose what to download:";
/// Header of the playlist item list
pub const PLAYLIST_ITEMS: &str =
    "📋 <b>Playlist items</b>\n\nSelect an item to open quality options:";

/// Playlist could not be listed for a batch
pub const PLAYLIST_FETCH_FAILED: &str = "❌ Failed to fetch playlist. Please try again.";
/// Playlist could not be listed for browsing, or is empty
pub const PLAYLIST_ITEMS_FAILED: &str = "❌ Failed to fetch playlist items or playlist is empty.";

/// Progress message for a single download
pub const DOWNLOADING: &str = "⏳ Downloading... This may take a few moments.";

/// Progress message when a batch starts
#[must_use]
pub fn batch_started(count: u32) -> String {
    format!("⏳ Downloading {count} items from playlist... This may take a few minutes.")
}

/// Progress message for item `index` (1-based) of `total`
#[must_use]
pub fn batch_progress(index: usize, total: usize) -> String {
    format!("⏳ Downloading item {index}/{total} from playlist...")
}

/// Batch completion summary
#[must_use]
pub fn batch_summary(succeeded: usize, total: usize) -> String {
    format!("✅ Downloaded {succeeded}/{total} items from playlist!")
}

/// Extraction failure as shown to the user
#[must_use]
pub fn extraction_failed(error: &str) -> String {
    format!("❌ Error: {}", escape_html(error))
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback toasts
// ─────────────────────────────────────────────────────────────────────────────

/// Toast for download buttons
pub const TOAST_PROCESSING: &str = "Processing your request...";
/// Toast for "View all items"
pub const TOAST_OPEN_ITEMS: &str = "Opening playlist items...";
/// Toast for playlist items and "Back"
pub const TOAST_OPEN_OPTIONS: &str = "Opening video options...";
/// Toast for the help button
pub const TOAST_HELP: &str = "Opening help...";
/// Toast for the settings button
pub const TOAST_SETTINGS: &str = "Opening settings...";
/// Toast for unreadable button payloads
pub const TOAST_INVALID: &str = "❌ Invalid request";

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

fn video_label(quality: VideoQuality) -> String {
    match quality {
        VideoQuality::Best => "🎬 Best Quality Video".to_string(),
        q => format!("🎬 {}p", q.as_str()),
    }
}

fn audio_label(quality: AudioQuality) -> String {
    match quality {
        AudioQuality::Best => "🎵 MP3 Best".to_string(),
        q => format!("🎵 MP3 {}kbps", q.as_str()),
    }
}

fn download(selection: Selection, fingerprint: &Fingerprint) -> Action {
    Action::Download {
        selection,
        fingerprint: fingerprint.clone(),
    }
}

/// Single-item choices: every video quality, then every audio quality, two
/// buttons per row with video and audio never sharing a row.
#[must_use]
pub fn quality_keyboard(fingerprint: &Fingerprint) -> Keyboard {
    let video: Vec<Button> = VideoQuality::ALL
        .iter()
        .map(|&q| Button::action(video_label(q), &download(Selection::Video(q), fingerprint)))
        .collect();
    let audio: Vec<Button> = AudioQuality::ALL
        .iter()
        .map(|&q| Button::action(audio_label(q), &download(Selection::Audio(q), fingerprint)))
        .collect();

    let rows = video
        .chunks(2)
        .chain(audio.chunks(2))
        .map(<[Button]>::to_vec)
        .collect();
    Keyboard::new(rows)
}

/// Playlist choices, one button per row.
#[must_use]
pub fn collection_keyboard(fingerprint: &Fingerprint, batch: u32) -> Keyboard {
    let batch_of = |media: MediaKind| Action::Batch {
        selection: Selection::best(media),
        count: batch,
        fingerprint: fingerprint.clone(),
    };

    Keyboard::new(vec![
        vec![Button::action(
            "🎬 Single Video (Best)",
            &download(Selection::best(MediaKind::Video), fingerprint),
        )],
        vec![Button::action(
            format!("📋 First {batch} Videos (Best)"),
            &batch_of(MediaKind::Video),
        )],
        vec![Button::action(
            "🎵 Single Audio (MP3)",
            &download(Selection::best(MediaKind::Audio), fingerprint),
        )],
        vec![Button::action(
            format!("📋 First {batch} Audios (MP3)"),
            &batch_of(MediaKind::Audio),
        )],
        vec![Button::action(
            "📋 View all items",
            &Action::List(fingerprint.clone()),
        )],
    ])
}

/// Playlist item label, `NN. title`
#[must_use]
pub fn item_label(index: usize, title: &str) -> String {
    format!(
        "{:02}. {}",
        index + 1,
        truncate_with_ellipsis(title, ITEM_LABEL_TITLE_LEN)
    )
}

/// One button per playlist item followed by a "Back" button that reopens
/// the playlist choice screen.
#[must_use]
pub fn items_keyboard(items: &[(Fingerprint, String)], collection: &Fingerprint) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = items
        .iter()
        .enumerate()
        .map(|(i, (fingerprint, title))| {
            vec![Button::action(
                item_label(i, title),
                &Action::Open(fingerprint.clone()),
            )]
        })
        .collect();
    rows.push(vec![Button::action(
        "◀ Back",
        &Action::Open(collection.clone()),
    )]);
    Keyboard::new(rows)
}

/// Buttons under the welcome photo
#[must_use]
pub fn welcome_keyboard(examples_url: &str) -> Keyboard {
    Keyboard::new(vec![
        vec![
            Button::action("📥 Send a link", &Action::Help),
            Button::link("📚 Examples", examples_url),
        ],
        vec![
            Button::action("❓ Help", &Action::Help),
            Button::action("⚙️ Settings", &Action::Settings),
        ],
    ])
}
