//! Delivery loop for queued posts: every tick, send what is due and record the outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use storage::{ScheduledPostRepository, StorageError};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use turtle_core::{MessagingGateway, PhotoOptions};

/// Posts sent per tick at most.
const BATCH_SIZE: i64 = 20;

/// Outcome counts of one delivery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: usize,
    pub failed: usize,
}

pub struct DeliveryWorker {
    posts: ScheduledPostRepository,
    sender: Arc<dyn MessagingGateway>,
    interval: Duration,
}

impl DeliveryWorker {
    pub fn new(
        posts: ScheduledPostRepository,
        sender: Arc<dyn MessagingGateway>,
        interval: Duration,
    ) -> Self {
        Self {
            posts,
            sender,
            interval,
        }
    }

    /// Sends posts due at `now`. A failed send marks that post failed; it is not retried.
    #[instrument(skip(self))]
    pub async fn deliver_due(&self, now: DateTime<Utc>) -> Result<DeliveryStats, StorageError> {
        let mut stats = DeliveryStats::default();
        for post in self.posts.due(now, BATCH_SIZE).await? {
            let options = PhotoOptions {
                caption: Some(post.caption.clone()),
                buttons: None,
            };
            match self
                .sender
                .send_photo(post.chat_id, &post.image, options)
                .await
            {
                Ok(sent) => {
                    self.posts.mark_sent(&post.id).await?;
                    info!(
                        post_id = %post.id,
                        chat_id = post.chat_id,
                        message_id = sent.message_id,
                        "Scheduled post delivered"
                    );
                    stats.sent += 1;
                }
                Err(e) => {
                    self.posts.mark_failed(&post.id, &e.to_string()).await?;
                    warn!(post_id = %post.id, chat_id = post.chat_id, error = %e, "Scheduled post failed");
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Runs until `true` is sent on `shutdown` or the sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Delivery loop started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.deliver_due(Utc::now()).await {
                        Ok(stats) if stats != DeliveryStats::default() => {
                            info!(sent = stats.sent, failed = stats.failed, "Delivery pass done");
                        }
                        Ok(_) => debug!("Nothing due"),
                        Err(e) => error!(error = %e, "Delivery pass failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Delivery loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, FixedOffset};
    use std::sync::Mutex;
    use storage::{PostStatus, ScheduledPost};
    use turtle_core::{Reaction, Result, SendOptions, SentMessage, TurtleError};

    struct RecordingSender {
        sent: Mutex<Vec<(i64, Option<String>)>>,
        failing_chat: i64,
    }

    #[async_trait]
    impl MessagingGateway for RecordingSender {
        async fn send_message(&self, _: i64, _: &str, _: SendOptions) -> Result<SentMessage> {
            unreachable!("delivery only sends photos")
        }

        async fn send_photo(
            &self,
            chat_id: i64,
            _photo: &[u8],
            options: PhotoOptions,
        ) -> Result<SentMessage> {
            if chat_id == self.failing_chat {
                return Err(TurtleError::Transport("bot was kicked".into()));
            }
            self.sent.lock().unwrap().push((chat_id, options.caption));
            Ok(SentMessage {
                message_id: 1,
                photo_file_id: None,
            })
        }

        async fn set_reaction(&self, _: i64, _: i32, _: Reaction) -> Result<()> {
            Ok(())
        }

        async fn answer_callback(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn download_attachment(&self, _: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn last_scheduled_send_date(
            &self,
            _: i64,
        ) -> Result<Option<DateTime<FixedOffset>>> {
            Ok(None)
        }

        async fn schedule_send(
            &self,
            _: i64,
            _: &[u8],
            _: &str,
            _: DateTime<FixedOffset>,
        ) -> Result<()> {
            Ok(())
        }
    }

    /// **Test: Due posts are sent and marked; failures are marked failed; future posts wait.**
    #[tokio::test]
    async fn test_deliver_due() {
        let posts = ScheduledPostRepository::new("sqlite::memory:").await.unwrap();
        let now = Utc::now();
        let due = ScheduledPost::new(1, "story".into(), vec![1, 2], now - ChronoDuration::minutes(1));
        let broken = ScheduledPost::new(2, "story".into(), vec![1, 2], now - ChronoDuration::minutes(1));
        let later = ScheduledPost::new(3, "story".into(), vec![1, 2], now + ChronoDuration::hours(1));
        for post in [&due, &broken, &later] {
            posts.save(post).await.unwrap();
        }
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
            failing_chat: 2,
        });
        let worker = DeliveryWorker::new(posts.clone(), sender.clone(), Duration::from_secs(30));

        let stats = worker.deliver_due(now).await.unwrap();

        assert_eq!(stats, DeliveryStats { sent: 1, failed: 1 });
        assert_eq!(
            *sender.sent.lock().unwrap(),
            vec![(1, Some("story".to_string()))]
        );
        let due = posts.get(&due.id).await.unwrap().unwrap();
        assert_eq!(due.status(), Some(PostStatus::Sent));
        let broken = posts.get(&broken.id).await.unwrap().unwrap();
        assert_eq!(broken.status(), Some(PostStatus::Failed));
        assert!(broken.error.unwrap().contains("bot was kicked"));
        let later = posts.get(&later.id).await.unwrap().unwrap();
        assert_eq!(later.status(), Some(PostStatus::Pending));

        let again = worker.deliver_due(now).await.unwrap();
        assert_eq!(again, DeliveryStats::default());
    }
}
