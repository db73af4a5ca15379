//! Chain handler that hands every update to the [`WorkflowEngine`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};
use turtle_core::{Handler, HandlerResponse, Result, Update};

use crate::engine::{DispatchOutcome, WorkflowEngine};

#[derive(Clone)]
pub struct WorkflowHandler {
    engine: Arc<WorkflowEngine>,
}

impl WorkflowHandler {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Handler for WorkflowHandler {
    /// Callbacks end with `Reply(ack)`, other handled updates with `Stop`; ignored updates
    /// continue down the chain.
    #[instrument(skip(self, update))]
    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        match self.engine.dispatch(update).await? {
            DispatchOutcome::Handled { ack: Some(ack) } => Ok(HandlerResponse::Reply(ack)),
            DispatchOutcome::Handled { ack: None } => Ok(HandlerResponse::Stop),
            DispatchOutcome::Ignored => {
                info!(
                    chat_id = update.chat.id,
                    "step: WorkflowHandler ignored update"
                );
                Ok(HandlerResponse::Continue)
            }
        }
    }
}
