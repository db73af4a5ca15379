//! Scheduled post model.
//!
//! Maps to the `scheduled_posts` table used by ScheduledPostRepository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state of a scheduled post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Sent,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Sent => "sent",
            PostStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PostStatus::Pending),
            "sent" => Some(PostStatus::Sent),
            "failed" => Some(PostStatus::Failed),
            _ => None,
        }
    }
}

/// A photo post queued for delivery to a destination chat at `send_at`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduledPost {
    pub id: String,
    pub chat_id: i64,
    pub caption: String,
    pub image: Vec<u8>,
    pub send_at: DateTime<Utc>,
    pub status: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledPost {
    /// Creates a pending post with a generated UUID.
    pub fn new(chat_id: i64, caption: String, image: Vec<u8>, send_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            caption,
            image,
            send_at,
            status: PostStatus::Pending.as_str().to_string(),
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> Option<PostStatus> {
        PostStatus::parse(&self.status)
    }
}
