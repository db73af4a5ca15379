//! Operator allow-list enforced in before().

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use story_workflow::messages;
use tracing::{info, instrument, warn};
use turtle_core::{Handler, MessagingGateway, Result, SendOptions, Update};

/// Stops the chain for users outside the allow-list and tells them so.
pub struct AuthHandler {
    allowed: HashSet<i64>,
    gateway: Arc<dyn MessagingGateway>,
}

impl AuthHandler {
    pub fn new(allowed: impl IntoIterator<Item = i64>, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            gateway,
        }
    }

    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed.contains(&user_id)
    }
}

#[async_trait]
impl Handler for AuthHandler {
    #[instrument(skip(self, update))]
    async fn before(&self, update: &Update) -> Result<bool> {
        if self.is_allowed(update.user.id) {
            return Ok(true);
        }

        info!(
            user_id = update.user.id,
            username = ?update.user.username,
            chat_id = update.chat.id,
            "step: AuthHandler rejected unknown user"
        );
        if let Err(e) = self
            .gateway
            .send_message(update.chat.id, messages::ERR_UNKNOWN_USER, SendOptions::default())
            .await
        {
            warn!(error = %e, chat_id = update.chat.id, "Could not answer unknown user");
        }
        Ok(false)
    }
}
