use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::Bot;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::core::clock::SystemClock;
use crate::core::config::{self, Overrides, Settings};
use crate::core::counter::IncidentCounter;
use crate::core::dispatcher::Dispatcher;
use crate::core::lifecycle::LifecycleManager;
use crate::core::scheduler::DailyScheduler;
use crate::core::store::JsonStateStore;
use crate::core::terminal::print_status;
use crate::interfaces::telegram::{TelegramInterface, TelegramRoles, TelegramSink};
use crate::logging;

/// Boots the bot and blocks until Ctrl-C. Configuration problems are
/// returned before anything is started.
pub async fn run_bot(overrides: Overrides) -> Result<()> {
    let settings = Settings::load(&overrides).await?;
    logging::init(settings.log_level);
    let token = match config::bot_token(|key| std::env::var(key).ok()) {
        Ok(token) => token,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };

    print_status("State file", &settings.state_file.display().to_string());
    print_status(
        "Daily time",
        &format!("{} {}", settings.daily_time, settings.timezone.name()),
    );
    info!("Starting incident-days bot...");

    let store = Arc::new(JsonStateStore::new(&settings.state_file));
    let clock = Arc::new(SystemClock::new(settings.timezone));
    let counter = Arc::new(Mutex::new(IncidentCounter::open(store, clock).await));

    let bot = Bot::new(token);
    let mut lifecycle = LifecycleManager::new().await?;

    let daily = Arc::new(DailyScheduler::new(
        lifecycle.scheduler.clone(),
        settings.timezone,
        counter.clone(),
        Arc::new(TelegramSink::new(bot.clone())),
    ));
    if let Some(chat) = settings.announce_chat {
        daily.schedule(chat, settings.daily_time).await?;
    }

    let dispatcher = Arc::new(Dispatcher::new(
        counter,
        Arc::new(TelegramRoles::new(bot.clone())),
        daily.clone(),
        settings.daily_time,
    ));
    lifecycle.attach(Arc::new(Mutex::new(TelegramInterface::new(bot, dispatcher))));

    lifecycle.start().await?;
    info!("🚀 Bot is running ({:?})...", lifecycle.state());

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Stopping with {} daily job(s) active", daily.active_jobs().await);
    lifecycle.shutdown().await
}
