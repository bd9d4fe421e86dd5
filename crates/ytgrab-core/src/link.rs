//! Link classification
//!
//! Pure, offline recognition of the YouTube link shapes the bot accepts.

// lazy_regex! validates the patterns at compile time
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;

/// Watch page or short link carrying an 11-character video id.
static RE_VIDEO: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|shorts/)|youtu\.be/)[a-zA-Z0-9_-]{11}"
);

/// Any YouTube URL with a `list=` query parameter.
static RE_PLAYLIST: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com|youtu\.be)/.*[?&]list=[a-zA-Z0-9_-]+"
);

/// Result of classifying inbound text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Not a supported link
    None,
    /// A single video
    Single,
    /// A playlist
    Collection,
}

/// A supported link found inside inbound text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundLink<'a> {
    /// What the link points at
    pub kind: LinkKind,
    /// The link itself, without surrounding text
    pub url: &'a str,
}

/// Returns `true` if the text looks like it contains a URL at all.
#[must_use]
pub fn has_url_prefix(text: &str) -> bool {
    text.contains("http://") || text.contains("https://") || text.contains("www.")
}

/// Classify inbound text.
///
/// # Examples
///
/// ```
/// use ytgrab_core::link::{classify, LinkKind};
///
/// assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), LinkKind::Single);
/// assert_eq!(
///     classify("https://www.youtube.com/playlist?list=PLxyz"),
///     LinkKind::Collection
/// );
/// assert_eq!(classify("hello there"), LinkKind::None);
/// ```
#[must_use]
pub fn classify(text: &str) -> LinkKind {
    find_link(text).map_or(LinkKind::None, |found| found.kind)
}

/// Locate the first supported link in `text`.
///
/// Links are whitespace-delimited, so words around the link are not part
/// of [`FoundLink::url`].
#[must_use]
pub fn find_link(text: &str) -> Option<FoundLink<'_>> {
    text.split_whitespace()
        .filter(|token| has_url_prefix(token))
        .find_map(|url| {
            let kind = if RE_PLAYLIST.is_match(url) {
                LinkKind::Collection
            } else if RE_VIDEO.is_match(url)
                || url.contains("youtube.com")
                || url.contains("youtu.be")
            {
                LinkKind::Single
            } else {
                return None;
            };
            Some(FoundLink { kind, url })
        })
}
