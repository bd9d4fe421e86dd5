use crate::bot::handlers::{self, is_slash_command, Command};
use crate::bot::TelegramTransport;
use crate::config::{BotSettings, TELEGRAM_UPLOAD_TIMEOUT_SECS};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use ytgrab_core::extractor::YtDlp;
use ytgrab_core::RequestOrchestrator;

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>, ytdlp: Arc<YtDlp>) {
    init_download_dir(&settings).await;

    let Some(bot) = init_bot(&settings) else {
        std::process::exit(1);
    };

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let orchestrator = Arc::new(RequestOrchestrator::new(
        transport,
        ytdlp.clone(),
        ytdlp,
        settings.core.clone(),
    ));
    info!("Request orchestrator initialized.");

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![orchestrator, settings])
        .distribution_function(|_| None::<Infallible>)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn init_download_dir(settings: &BotSettings) {
    let dir = &settings.core.download_dir;
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => info!("Download directory ready: {}", dir.display()),
        Err(e) => {
            error!("Failed to create download directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }
}

fn init_bot(settings: &BotSettings) -> Option<Bot> {
    let Some(token) = settings.telegram.token() else {
        error!("TELEGRAM_TOKEN environment variable is required");
        return None;
    };
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(TELEGRAM_UPLOAD_TIMEOUT_SECS))
        .build();
    match client {
        Ok(client) => Some(Bot::with_client(token, client)),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            None
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| is_slash_command(&msg))
                        .endpoint(handle_unknown_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    orchestrator: Arc<RequestOrchestrator>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(msg, orchestrator).await,
        Command::Help => handlers::help(msg, orchestrator).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_unknown_command(
    msg: Message,
    orchestrator: Arc<RequestOrchestrator>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::unknown_command(msg, orchestrator).await {
        error!("Unknown command handler error: {}", e);
    }
    respond(())
}

async fn handle_text(
    msg: Message,
    orchestrator: Arc<RequestOrchestrator>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(msg, orchestrator).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    orchestrator: Arc<RequestOrchestrator>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_callback(bot, q, orchestrator).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
