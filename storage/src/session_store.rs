//! Session store: per-chat workflow state keyed by chat id.
//!
//! [`SqliteSessionStore`] persists sessions as JSON rows; [`InMemorySessionStore`] backs tests and
//! single-process runs without a database. Merge is read-modify-write inside one transaction, so
//! concurrent merges to different fields of the same chat do not lose each other's updates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{Session, SessionPatch};
use crate::sqlite_pool::SqlitePoolManager;

/// Durable key-value store of sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the chat's session; an empty session when none is stored.
    async fn get(&self, chat_id: i64) -> Result<Session, StorageError>;

    /// Applies `patch` to the stored session (creating it if absent) and returns the result.
    async fn merge(&self, chat_id: i64, patch: SessionPatch) -> Result<Session, StorageError>;

    /// Removes the chat's session. Clearing an absent session is not an error.
    async fn clear(&self, chat_id: i64) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool_manager: SqlitePoolManager,
}

impl SqliteSessionStore {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::with_pool(pool_manager).await
    }

    /// Shares an existing pool (e.g. with the scheduled post repository).
    pub async fn with_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let store = Self { pool_manager };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating sessions table if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                chat_id INTEGER PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, chat_id: i64) -> Result<Session, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM sessions WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;

        match row {
            Some((data,)) => Ok(serde_json::from_str(&data)?),
            None => Ok(Session::default()),
        }
    }

    async fn merge(&self, chat_id: i64, patch: SessionPatch) -> Result<Session, StorageError> {
        let mut tx = self.pool_manager.pool().begin().await?;

        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM sessions WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&mut *tx)
            .await?;

        let mut session = match row {
            Some((data,)) => serde_json::from_str(&data)?,
            None => Session::default(),
        };
        session.apply(patch);

        sqlx::query(
            r#"
            INSERT INTO sessions (chat_id, data, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(chat_id)
        .bind(serde_json::to_string(&session)?)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(chat_id, stage = session.stage.as_str(), "Session merged");
        Ok(session)
    }

    async fn clear(&self, chat_id: i64) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM sessions WHERE chat_id = ?")
            .bind(chat_id)
            .execute(self.pool_manager.pool())
            .await?;
        debug!(chat_id, "Session cleared");
        Ok(())
    }
}

/// Process-local session store.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<i64, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, chat_id: i64) -> Result<Session, StorageError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn merge(&self, chat_id: i64, patch: SessionPatch) -> Result<Session, StorageError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(chat_id).or_default();
        session.apply(patch);
        Ok(session.clone())
    }

    async fn clear(&self, chat_id: i64) -> Result<(), StorageError> {
        self.sessions.write().await.remove(&chat_id);
        Ok(())
    }
}
