//! Dispatcher runner: converts teloxide messages and button clicks to core updates and passes them
//! to the [`HandlerChain`].
//!
//! Errors escaping the chain are reported and answered with a generic reply. Button clicks are
//! always answered, with the chain's reply text when it gave one.

use std::sync::Arc;

use anyhow::Result;
use handler_chain::HandlerChain;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use turtle_core::{
    ErrorReporter, HandlerResponse, MessagingGateway, SendOptions, ToCoreUpdate,
    Update as CoreUpdate,
};

use crate::adapters::{TelegramCallbackWrapper, TelegramMessageWrapper};

/// Runs one core update through the chain and settles it with the transport.
pub struct UpdateProcessor {
    chain: HandlerChain,
    gateway: Arc<dyn MessagingGateway>,
    reporter: Arc<dyn ErrorReporter>,
    unhandled_reply: String,
}

impl UpdateProcessor {
    pub fn new(
        chain: HandlerChain,
        gateway: Arc<dyn MessagingGateway>,
        reporter: Arc<dyn ErrorReporter>,
        unhandled_reply: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            gateway,
            reporter,
            unhandled_reply: unhandled_reply.into(),
        }
    }

    #[instrument(skip(self, update), fields(chat_id = update.chat.id, kind = update.kind_name()))]
    pub async fn process(&self, update: &CoreUpdate) {
        info!(
            user_id = update.user.id,
            chat_id = update.chat.id,
            "step: processing update (handler chain started)"
        );

        let ack = match self.chain.handle(update).await {
            Ok(HandlerResponse::Reply(text)) => text,
            Ok(_) => String::new(),
            Err(e) => {
                self.reporter.capture(&e, Some(update));
                if let Err(send_err) = self
                    .gateway
                    .send_message(update.chat.id, &self.unhandled_reply, SendOptions::default())
                    .await
                {
                    warn!(error = %send_err, "Could not send unhandled error reply");
                }
                self.unhandled_reply.clone()
            }
        };

        if let Some(callback_id) = update.callback_id() {
            if let Err(e) = self.gateway.answer_callback(callback_id, &ack).await {
                warn!(error = %e, callback_id, "Could not answer callback query");
            }
        }
    }
}

/// Runs the long-polling dispatcher until Ctrl-C, then signals `shutdown`.
///
/// Updates of one chat are processed one at a time, in order.
#[instrument(skip(bot, processor, shutdown))]
pub async fn run_dispatcher(
    bot: Bot,
    processor: Arc<UpdateProcessor>,
    shutdown: watch::Sender<bool>,
) -> Result<()> {
    let for_messages = Arc::clone(&processor);
    let for_callbacks = Arc::clone(&processor);

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(move |msg: Message| {
            let processor = Arc::clone(&for_messages);
            async move {
                let update = TelegramMessageWrapper(&msg).to_core();
                match msg.text() {
                    Some(text) => info!(
                        user_id = update.user.id,
                        chat_id = update.chat.id,
                        message_content = %text,
                        "Received message"
                    ),
                    None => info!(
                        user_id = update.user.id,
                        chat_id = update.chat.id,
                        "Received non-text message"
                    ),
                }
                processor.process(&update).await;
                respond(())
            }
        }))
        .branch(
            Update::filter_callback_query().endpoint(move |q: CallbackQuery| {
                let processor = Arc::clone(&for_callbacks);
                async move {
                    let update = TelegramCallbackWrapper(&q).to_core();
                    info!(
                        user_id = update.user.id,
                        chat_id = update.chat.id,
                        data = ?q.data,
                        "Received button click"
                    );
                    processor.process(&update).await;
                    respond(())
                }
            }),
        );

    info!("Bot is running");

    Dispatcher::builder(bot, handler)
        .default_handler(|upd| async move {
            warn!(update_id = ?upd.id, "Unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped");
    if shutdown.send(true).is_err() {
        error!("No background task is listening for shutdown");
    }
    Ok(())
}
