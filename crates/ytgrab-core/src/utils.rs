//! Utility functions for text processing shared across the dispatch core.

use unicode_segmentation::UnicodeSegmentation;

/// Safely truncates a string to a maximum number of grapheme clusters.
///
/// This is UTF-8 safe and never splits an emoji or a combining sequence.
///
/// # Examples
///
/// ```
/// use ytgrab_core::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_graphemes: usize) -> String {
    let s = s.as_ref();
    s.grapheme_indices(true)
        .nth(max_graphemes)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Truncates to `max_graphemes` and marks the cut with an ellipsis.
///
/// The result never exceeds `max_graphemes` clusters, ellipsis included.
pub fn truncate_with_ellipsis(s: &str, max_graphemes: usize) -> String {
    if s.graphemes(true).count() <= max_graphemes {
        return s.to_string();
    }
    let mut out = truncate_str(s, max_graphemes.saturating_sub(1));
    out.push('…');
    out
}

/// Returns the last non-empty line of command output, trimmed.
pub fn last_non_empty_line(output: &str) -> Option<&str> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

/// Escapes text for Telegram HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).to_string()
}
