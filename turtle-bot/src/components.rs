//! Component factory: builds BotComponents from config. Isolates assembly logic from runner.

use std::sync::Arc;

use anyhow::Result;
use handler_chain::HandlerChain;
use image_generation_client::{ImageProvider, OpenAIImageProvider};
use llm_client::{LlmClient, OpenAILlmClient};
use storage::{ScheduledPostRepository, SessionStore, SqlitePoolManager, SqliteSessionStore};
use story_workflow::{ContentProvider, LlmContentProvider, WorkflowEngine, WorkflowHandler};
use teloxide::Bot;
use tokio::sync::watch;
use tracing::{error, info, instrument};
use turtle_core::MessagingGateway;
use turtle_telegram::{build_bot, TelegramGateway};

use crate::config::BotConfig;
use crate::handlers::{AuthHandler, LoggingHandler};

/// Everything run_bot needs, produced by the component factory.
pub struct BotComponents {
    pub teloxide_bot: Bot,
    pub sessions: Arc<dyn SessionStore>,
    pub posts: ScheduledPostRepository,
    pub gateway: Arc<dyn MessagingGateway>,
    pub content: Arc<dyn ContentProvider>,
    pub images: Arc<dyn ImageProvider>,
}

fn build_llm(config: &BotConfig) -> Arc<dyn LlmClient> {
    let story = &config.story;
    let client = match &story.openai_base_url {
        Some(base_url) => {
            OpenAILlmClient::with_base_url(story.openai_api_key.clone(), base_url.clone())
        }
        None => OpenAILlmClient::new(story.openai_api_key.clone()),
    };
    match &story.model {
        Some(model) => Arc::new(client.with_model(model.clone())),
        None => Arc::new(client),
    }
}

fn build_images(config: &BotConfig) -> Arc<dyn ImageProvider> {
    let story = &config.story;
    let provider =
        OpenAIImageProvider::new(story.openai_api_key.clone(), story.openai_base_url.clone());
    match &story.image_model {
        Some(model) => Arc::new(provider.with_model(model.clone())),
        None => Arc::new(provider),
    }
}

/// Opens the database and builds transport and providers.
#[instrument(skip(config))]
pub async fn build_bot_components(config: &BotConfig) -> Result<BotComponents> {
    let pool = SqlitePoolManager::new(config.database_url()).await.map_err(|e| {
        error!(
            error = %e,
            database_url = %config.database_url(),
            "Failed to open database"
        );
        anyhow::anyhow!("Failed to open database: {}", e)
    })?;
    let sessions: Arc<dyn SessionStore> = Arc::new(
        SqliteSessionStore::with_pool(pool.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize session storage: {}", e))?,
    );
    let posts = ScheduledPostRepository::with_pool(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize scheduled post storage: {}", e))?;

    let teloxide_bot = build_bot(config.bot_token(), config.telegram_api_url());
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(
        teloxide_bot.clone(),
        posts.clone(),
        config.utc_offset()?,
    ));

    info!(
        api_key = %openai_client::mask_token(&config.story.openai_api_key),
        base_url = ?config.story.openai_base_url,
        model = ?config.story.model,
        image_model = ?config.story.image_model,
        "Using OpenAI providers"
    );
    let content: Arc<dyn ContentProvider> = Arc::new(LlmContentProvider::new(build_llm(config)));

    Ok(BotComponents {
        teloxide_bot,
        sessions,
        posts,
        gateway,
        content,
        images: build_images(config),
    })
}

/// Builds the workflow engine for this bot.
pub fn build_engine(
    config: &BotConfig,
    components: &BotComponents,
    bot_username: &str,
    shutdown: watch::Receiver<bool>,
) -> WorkflowEngine {
    WorkflowEngine::new(
        components.sessions.clone(),
        components.content.clone(),
        components.images.clone(),
        components.gateway.clone(),
        config.story.workflow_config(),
    )
    .with_bot_username(bot_username)
    .with_shutdown(shutdown)
}

/// Builds the handler chain (logging → auth → story workflow).
pub fn build_handler_chain(
    config: &BotConfig,
    components: &BotComponents,
    engine: Arc<WorkflowEngine>,
) -> HandlerChain {
    let auth = AuthHandler::new(
        config.story.allowed_users.iter().copied(),
        components.gateway.clone(),
    );
    HandlerChain::new()
        .add_handler(Arc::new(LoggingHandler))
        .add_handler(Arc::new(auth))
        .add_handler(Arc::new(WorkflowHandler::new(engine)))
}
