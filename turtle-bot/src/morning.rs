//! Morning trigger: once a day at a fixed local time, start a story run for each operator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};
use story_workflow::WorkflowEngine;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use turtle_core::TurtleError;

/// Starts one run in an operator's chat.
#[async_trait]
pub trait RunStarter: Send + Sync {
    async fn start_run(&self, chat_id: i64) -> Result<(), TurtleError>;
}

#[async_trait]
impl RunStarter for WorkflowEngine {
    async fn start_run(&self, chat_id: i64) -> Result<(), TurtleError> {
        WorkflowEngine::start_run(self, chat_id, None).await
    }
}

/// First `at` (local time in `offset`) strictly after `now`.
pub fn next_run(now: DateTime<Utc>, offset: FixedOffset, at: NaiveTime) -> Option<DateTime<Utc>> {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive().and_time(at).and_local_timezone(offset).single()?;
    let next = if today > local_now {
        today
    } else {
        today.checked_add_signed(ChronoDuration::days(1))?
    };
    Some(next.with_timezone(&Utc))
}

pub struct MorningTrigger {
    runner: Arc<dyn RunStarter>,
    operators: Vec<i64>,
    offset: FixedOffset,
    at: NaiveTime,
}

impl MorningTrigger {
    pub fn new(
        runner: Arc<dyn RunStarter>,
        operators: Vec<i64>,
        offset: FixedOffset,
        at: NaiveTime,
    ) -> Self {
        Self {
            runner,
            operators,
            offset,
            at,
        }
    }

    /// Starts a run for every operator. Returns how many started; one failure does not stop the rest.
    #[instrument(skip(self), fields(operators = self.operators.len()))]
    pub async fn fire(&self) -> usize {
        let mut started = 0;
        for &chat_id in &self.operators {
            match self.runner.start_run(chat_id).await {
                Ok(()) => started += 1,
                Err(e) => warn!(chat_id, error = %e, "Morning run failed"),
            }
        }
        info!(started, "Morning runs started");
        started
    }

    /// Sleeps until each morning and fires, until `true` is sent on `shutdown` or the sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if self.operators.is_empty() {
            info!("No morning operators configured, trigger disabled");
            return;
        }
        loop {
            let Some(next) = next_run(Utc::now(), self.offset, self.at) else {
                error!(at = %self.at, "Cannot compute next morning run, trigger stopped");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            info!(next = %next.with_timezone(&self.offset), "Next morning run scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.fire().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Morning trigger stopped");
    }
}
