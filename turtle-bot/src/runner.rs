//! run_bot: logging, components, background loops and the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveTime;
use story_workflow::messages;
use teloxide::prelude::*;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use turtle_core::{init_tracing, TracingErrorReporter};
use turtle_telegram::{run_dispatcher, DeliveryWorker, UpdateProcessor};

use crate::components::{build_bot_components, build_engine, build_handler_chain};
use crate::config::BotConfig;
use crate::morning::MorningTrigger;

/// Runs the bot until Ctrl-C. Background loops are stopped once the dispatcher returns.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    init_tracing(config.log_file(), "info")?;
    config.validate()?;

    info!(
        destinations = ?config.story.destinations,
        operators = config.story.allowed_users.len(),
        database_url = %config.database_url(),
        "Initializing bot"
    );

    let components = build_bot_components(&config).await?;

    let bot_username = match components.teloxide_bot.get_me().await {
        Ok(me) => me.user.username.clone().unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "get_me failed, commands addressed to the bot by name are ignored");
            String::new()
        }
    };
    info!(username = %bot_username, "Bot identity resolved");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = Arc::new(build_engine(
        &config,
        &components,
        &bot_username,
        shutdown_rx.clone(),
    ));

    let delivery = DeliveryWorker::new(
        components.posts.clone(),
        components.gateway.clone(),
        Duration::from_secs(config.story.delivery_poll_interval_secs),
    );
    let delivery_task = tokio::spawn(delivery.run(shutdown_rx.clone()));

    let morning_at = NaiveTime::from_hms_opt(config.story.morning_hour, config.story.morning_minute, 0)
        .ok_or_else(|| anyhow::anyhow!("MORNING time out of range"))?;
    let morning = MorningTrigger::new(
        engine.clone(),
        config.story.morning_users.clone(),
        config.utc_offset()?,
        morning_at,
    );
    let morning_task = tokio::spawn(morning.run(shutdown_rx));

    let chain = build_handler_chain(&config, &components, engine);
    let processor = Arc::new(UpdateProcessor::new(
        chain,
        components.gateway.clone(),
        Arc::new(TracingErrorReporter),
        messages::UNHANDLED_ERROR,
    ));

    let result = run_dispatcher(components.teloxide_bot.clone(), processor, shutdown_tx).await;

    for (name, task) in [("delivery", delivery_task), ("morning", morning_task)] {
        if let Err(e) = task.await {
            error!(task = name, error = %e, "Background task panicked");
        }
    }
    info!("Bot stopped");
    result
}
