use anyhow::Context;
use duet::{
    admin::server::AdminServer,
    clock::SystemClock,
    config::{Config, SWEEP_INTERVAL},
    interface::telegram::{TelegramInterface, TelegramTransport},
    session::ChatSessionController,
};
use std::sync::Arc;
use teloxide::Bot;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // RUST_LOG wins; otherwise info.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = dotenv {
        info!("Skipping .env: {}", e);
    }

    let config = Config::from_env()?;
    info!(
        "Duet starting (chat duration {:?}, block duration {:?}, spam limit {} per {:?})",
        config.session.chat_duration,
        config.session.block_duration,
        config.session.spam_limit,
        config.session.spam_window
    );

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(130))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;
    let bot = Bot::with_client(config.bot_token.clone(), client);

    let controller = ChatSessionController::new(
        config.session.clone(),
        Arc::new(TelegramTransport::new(bot.clone())),
        Arc::new(SystemClock),
    );

    let sweeper = controller.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.sweep();
        }
    });

    let app = AdminServer::new(controller.clone()).router();
    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("Failed to bind admin server on {}", config.http_addr))?;
    info!("Admin server listening on http://{}", config.http_addr);

    let telegram = TelegramInterface::new(controller);
    let telegram_handle = tokio::spawn(async move {
        if let Err(e) = telegram.run(bot).await {
            error!("Telegram bot stopped with error: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        res = axum::serve(listener, app) => {
            if let Err(e) = res {
                error!("Admin server stopped with error: {}", e);
            }
        }
        _ = telegram_handle => {
            info!("Telegram dispatcher finished");
        }
    }

    Ok(())
}
