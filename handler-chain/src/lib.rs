//! # Handler chain
//!
//! Runs a sequence of handlers for each update: every `before` in order (any can stop the chain),
//! then `handle` until one returns Stop or Reply, then every `after` in reverse order.

use std::sync::Arc;
use tracing::{debug, info, instrument};
use turtle_core::{Handler, HandlerResponse, Result, Update};

/// Ordered list of handlers sharing the before/handle/after protocol.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler (runs in order; first Stop/Reply ends handler phase).
    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Runs the chain for one update. Returns the first Stop or Reply, or Continue.
    #[instrument(skip(self, update), fields(chat_id = update.chat.id, kind = update.kind_name()))]
    pub async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        info!(user_id = update.user.id, "step: handler_chain started");

        for handler in &self.handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            if !handler.before(update).await? {
                info!(
                    user_id = update.user.id,
                    handler = %handler_name,
                    "step: handler before returned false, chain stopped"
                );
                return Ok(HandlerResponse::Stop);
            }
        }

        let mut final_response = HandlerResponse::Continue;
        for handler in &self.handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            let response = handler.handle(update).await?;
            debug!(handler = %handler_name, response = ?response, "Handler processed");

            match response {
                HandlerResponse::Stop | HandlerResponse::Reply(_) => {
                    info!(
                        user_id = update.user.id,
                        handler = %handler_name,
                        "step: handler chain stopped by handler"
                    );
                    final_response = response;
                    break;
                }
                HandlerResponse::Continue | HandlerResponse::Ignore => continue,
            }
        }

        for handler in self.handlers.iter().rev() {
            handler.after(update, &final_response).await?;
        }

        info!(user_id = update.user.id, "step: handler_chain finished");
        Ok(final_response)
    }
}
