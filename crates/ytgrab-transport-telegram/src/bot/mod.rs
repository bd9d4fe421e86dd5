/// Command and update handlers
pub mod handlers;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;
/// `ChatTransport` implementation on top of teloxide
pub mod transport;

pub use transport::TelegramTransport;
