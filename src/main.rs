use anyhow::Result;
use dotenvy::dotenv;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::signal;

use opibot::cli::{Cli, Commands};
use opibot::core::web_server::{self, WebhookState};
use opibot::core::{config, export, init_logger, install_panic_hook, metrics, Config};
use opibot::storage::WellStore;
use opibot::telegram::{
    create_bot, register_webhook, schema, setup_bot_commands, CommandDispatcher, HandlerDeps, Outbox, TelegramOutbox,
};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (configuration, database, webhook registration).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger(config::log_file_path_from_env().as_deref())?;
    install_panic_hook();

    match cli.command {
        Some(Commands::Run { polling }) => run_bot(polling).await,
        Some(Commands::Export { output }) => run_export(&output),
        None => run_bot(false).await,
    }
}

/// Writes the CSV export to `output` without contacting Telegram.
fn run_export(output: &str) -> Result<()> {
    let store = WellStore::open(&config::database_path_from_env())?;
    let count = export::export_to_file(&store, Path::new(output))?;
    log::info!("Exported {} records to {}", count, output);
    Ok(())
}

async fn run_bot(polling: bool) -> Result<()> {
    let config = Config::from_env().inspect_err(|e| log::error!("{}", e))?;
    metrics::init_metrics();

    let store = Arc::new(WellStore::open(&config.database_path)?);
    if config.seed_demo_data {
        store.seed_demo_records()?;
    }
    log::info!("Record store holds {} wells", store.count()?);

    let bot = create_bot(&config)?;
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&store), config.session_timeout));
    let outbox: Arc<dyn Outbox> = Arc::new(TelegramOutbox::new(bot.clone()));

    if polling {
        run_polling(bot, HandlerDeps::new(dispatcher, outbox)).await
    } else {
        run_webhook(&config, bot, WebhookState::new(dispatcher, outbox)).await
    }
}

async fn run_webhook(config: &Config, bot: Bot, state: WebhookState) -> Result<()> {
    let url = config.webhook_url().inspect_err(|e| log::error!("{}", e))?;
    log::info!("Starting bot in webhook mode");

    register_webhook(&bot, url).await?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to publish bot commands: {}", e);
    }

    web_server::serve(config.port, state, shutdown_signal()).await?;
    Ok(())
}

async fn run_polling(bot: Bot, deps: HandlerDeps) -> Result<()> {
    log::info!("Starting bot in long polling mode");

    // A registered webhook makes getUpdates fail
    bot.delete_webhook().await?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to publish bot commands: {}", e);
    }

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("Shutting down gracefully...");
}
