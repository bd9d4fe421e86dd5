#![deny(missing_docs)]
//! ytgrab core library.
//!
//! Transport-agnostic request dispatch for the media download bot: link
//! classification, callback tokens, yt-dlp invocation and file delivery.

/// Callback token encoding and decoding.
pub mod callback;
/// Playlist listing via yt-dlp.
pub mod collection;
/// Configuration management.
pub mod config;
/// Delivery of extracted files with retries.
pub mod delivery;
/// Media extraction via yt-dlp.
pub mod extractor;
/// URL fingerprint cache.
pub mod fingerprint;
/// Link classification.
pub mod link;
/// Request state machine.
pub mod orchestrator;
/// Chat transport abstraction.
pub mod transport;
/// Utility functions.
pub mod utils;
/// Texts and keyboards shown to the user.
pub mod views;

#[cfg(test)]
pub mod testing;

pub use orchestrator::{FlowOutcome, RequestOrchestrator};
