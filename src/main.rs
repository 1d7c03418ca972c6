use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use alfred::config::Config;
use alfred::relay::openai;
use alfred::relay::telegram::to_incoming;
use alfred::relay::{ConversationStore, Relay, TelegramClient, TriggerPolicy, WhisperClient};

struct BotState {
    config: Config,
    relay: Relay,
    denied: Mutex<HashSet<ChatId>>,
}

impl BotState {
    fn new(config: Config, bot: &Bot) -> Self {
        let transport = Arc::new(TelegramClient::new(bot.clone()));
        let transcriber = Arc::new(WhisperClient::new(
            config.openai_api_key.clone(),
            config.api_base.clone(),
            config.transcription_model.clone(),
        ));
        let completer = Arc::new(openai::Client::new(
            config.openai_api_key.clone(),
            config.api_base.clone(),
            config.completion_model.clone(),
        ));

        let relay = Relay::new(
            ConversationStore::new(config.persona.clone()),
            TriggerPolicy::new(&config.wake_words),
            transport,
            transcriber,
            completer,
        );

        Self {
            config,
            relay,
            denied: Mutex::new(HashSet::new()),
        }
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "alfred.json".to_string());
    let config = match Config::load_or_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "alfred.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting alfred...");
    info!("Loaded config from {config_path}: {:?}", config);

    let bot = Bot::new(&config.telegram_bot_token);
    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => {
            error!("Failed to reach Telegram: {e}");
            std::process::exit(1);
        }
    }

    let state = Arc::new(BotState::new(config, &bot));

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !state.config.is_allowed(msg.chat.id) {
        let mut denied = state.denied.lock().await;
        if denied.insert(msg.chat.id) {
            info!("Ignoring chat {} (not in allowed_chats)", msg.chat.id);
        }
        return Ok(());
    }

    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return Ok(());
    }

    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    state.relay.handle(&incoming).await;
    Ok(())
}
