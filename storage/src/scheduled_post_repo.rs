//! Scheduled post repository: the outbox of story posts waiting for their send time.
//!
//! Uses SqlitePoolManager and [`ScheduledPost`]. The delivery loop reads due posts and marks them
//! sent or failed; the workflow asks for the latest send time per destination to infer the next date.

use chrono::{DateTime, SubsecRound, Utc};
use tracing::info;

use crate::error::StorageError;
use crate::models::{PostStatus, ScheduledPost};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct ScheduledPostRepository {
    pool_manager: SqlitePoolManager,
}

impl ScheduledPostRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::with_pool(pool_manager).await
    }

    pub async fn with_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating scheduled_posts table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_posts (
                id TEXT PRIMARY KEY,
                chat_id INTEGER NOT NULL,
                caption TEXT NOT NULL,
                image BLOB NOT NULL,
                send_at TEXT NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_scheduled_posts_chat_id ON scheduled_posts(chat_id);
            CREATE INDEX IF NOT EXISTS idx_scheduled_posts_status_send_at ON scheduled_posts(status, send_at);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn save(&self, post: &ScheduledPost) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_posts (id, chat_id, caption, image, send_at, status, error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(post.chat_id)
        .bind(&post.caption)
        .bind(&post.image)
        .bind(post.send_at.trunc_subsecs(0))
        .bind(&post.status)
        .bind(&post.error)
        .bind(post.created_at)
        .execute(self.pool_manager.pool())
        .await?;

        info!(
            "Scheduled post: id={}, chat_id={}, send_at={}",
            post.id, post.chat_id, post.send_at
        );
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<ScheduledPost>, StorageError> {
        let post = sqlx::query_as::<_, ScheduledPost>("SELECT * FROM scheduled_posts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(post)
    }

    /// Pending posts whose send time is at or before `now`, oldest first.
    pub async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledPost>, StorageError> {
        let posts = sqlx::query_as::<_, ScheduledPost>(
            "SELECT * FROM scheduled_posts WHERE status = ? AND send_at <= ? ORDER BY send_at ASC LIMIT ?",
        )
        .bind(PostStatus::Pending.as_str())
        .bind(now.trunc_subsecs(0))
        .bind(limit)
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(posts)
    }

    pub async fn mark_sent(&self, id: &str) -> Result<(), StorageError> {
        self.set_status(id, PostStatus::Sent, None).await
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<(), StorageError> {
        self.set_status(id, PostStatus::Failed, Some(error)).await
    }

    async fn set_status(&self, id: &str, status: PostStatus, error: Option<&str>) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE scheduled_posts SET status = ?, error = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(error)
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("scheduled post {}", id)));
        }
        Ok(())
    }

    /// Latest send time among the destination's pending or sent posts.
    pub async fn last_send_at(&self, chat_id: i64) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT send_at FROM scheduled_posts WHERE chat_id = ? AND status != ? ORDER BY send_at DESC LIMIT 1",
        )
        .bind(chat_id)
        .bind(PostStatus::Failed.as_str())
        .fetch_optional(self.pool_manager.pool())
        .await?;
        Ok(row.map(|r| r.0))
    }
}
