//! Logs every update entering the chain and the response it ended with.

use async_trait::async_trait;
use tracing::info;
use turtle_core::{Handler, HandlerResponse, Result, Update};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl Handler for LoggingHandler {
    async fn before(&self, update: &Update) -> Result<bool> {
        info!(
            user_id = update.user.id,
            chat_id = update.chat.id,
            kind = update.kind_name(),
            text = ?update.text(),
            "step: update received"
        );
        Ok(true)
    }

    async fn after(&self, update: &Update, response: &HandlerResponse) -> Result<()> {
        info!(
            user_id = update.user.id,
            chat_id = update.chat.id,
            response = ?response,
            "step: update done"
        );
        Ok(())
    }
}
