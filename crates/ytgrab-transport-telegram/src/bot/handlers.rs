use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{debug, info};
use ytgrab_core::transport::ChatRef;
use ytgrab_core::RequestOrchestrator;

/// Bot commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Welcome message with the main buttons
    #[command(description = "Start the bot and show welcome")]
    Start,
    /// Usage instructions
    #[command(description = "Show help and usage")]
    Help,
}

fn chat_of(msg: &Message) -> ChatRef {
    ChatRef(msg.chat.id.0)
}

fn user_name(msg: &Message) -> String {
    msg.from
        .as_ref()
        .map(|u| {
            u.username
                .clone()
                .unwrap_or_else(|| u.first_name.clone())
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Returns true for messages that look like a slash command.
pub fn is_slash_command(msg: &Message) -> bool {
    msg.text().is_some_and(|t| t.trim_start().starts_with('/'))
}

/// Handler for the /start command.
///
/// # Errors
///
/// This handler does not currently fail; delivery problems are logged by the
/// orchestrator.
pub async fn start(msg: Message, orchestrator: Arc<RequestOrchestrator>) -> Result<()> {
    info!("User {} started the bot", user_name(&msg));
    orchestrator.welcome(chat_of(&msg)).await;
    Ok(())
}

/// Handler for the /help command.
///
/// # Errors
///
/// This handler does not currently fail.
pub async fn help(msg: Message, orchestrator: Arc<RequestOrchestrator>) -> Result<()> {
    orchestrator.help(chat_of(&msg)).await;
    Ok(())
}

/// Handler for slash commands the bot does not know.
///
/// # Errors
///
/// This handler does not currently fail.
pub async fn unknown_command(msg: Message, orchestrator: Arc<RequestOrchestrator>) -> Result<()> {
    debug!(text = ?msg.text(), "Unknown command");
    orchestrator.unknown_command(chat_of(&msg)).await;
    Ok(())
}

/// Handler for plain text messages.
///
/// # Errors
///
/// Returns an error if the message carries no text.
pub async fn handle_text(msg: Message, orchestrator: Arc<RequestOrchestrator>) -> Result<()> {
    let text = msg.text().ok_or_else(|| anyhow!("message without text"))?;
    info!("Text from {}", user_name(&msg));
    let outcome = orchestrator.handle_text(chat_of(&msg), text).await;
    debug!(?outcome, "Text handled");
    Ok(())
}

/// Handler for inline button presses.
///
/// Presses on messages too old for Telegram to include are acknowledged
/// silently.
///
/// # Errors
///
/// Returns an error if acknowledging an orphan press fails.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    orchestrator: Arc<RequestOrchestrator>,
) -> Result<()> {
    let Some(chat) = q.message.as_ref().map(|m| ChatRef(m.chat().id.0)) else {
        debug!("Callback without message, acknowledging");
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let data = q.data.as_deref().unwrap_or_default();
    let outcome = orchestrator
        .handle_callback(chat, &q.id.0, data)
        .await;
    debug!(?outcome, "Callback handled");
    Ok(())
}
