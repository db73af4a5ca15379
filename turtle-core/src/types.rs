//! Core types: user, chat, inbound update, handler response, and Handler trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identity (id, username, names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Chat (channel or private) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: String,
}

/// What a rendered message looked like when an operator acted on it or replied to it.
///
/// Approvals and overrides read their value from here, never from an earlier generation result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub id: i32,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// File id of the largest photo size, when the message carries a photo.
    pub photo_file_id: Option<String>,
}

impl MessageSnapshot {
    pub fn text(id: i32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn photo(id: i32, file_id: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            id,
            caption,
            photo_file_id: Some(file_id.into()),
            ..Self::default()
        }
    }

    /// Non-empty text of the message, if any.
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Kind of inbound update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// A message from the operator, optionally replying to an earlier message.
    Message {
        message: MessageSnapshot,
        reply_to: Option<MessageSnapshot>,
    },
    /// An inline-button click carrying the button's payload.
    Callback {
        callback_id: String,
        data: String,
        /// The message the button was attached to.
        message: Option<MessageSnapshot>,
    },
}

/// One inbound event: who sent it, in which chat, and what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub user: User,
    pub chat: Chat,
    pub kind: UpdateKind,
    pub received_at: DateTime<Utc>,
}

impl Update {
    /// Text of an inbound message; None for callbacks.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::Message { message, .. } => message.text.as_deref(),
            UpdateKind::Callback { .. } => None,
        }
    }

    /// Callback query id when the update is a button click.
    pub fn callback_id(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::Callback { callback_id, .. } => Some(callback_id),
            UpdateKind::Message { .. } => None,
        }
    }

    /// Short label used in logs.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            UpdateKind::Message { .. } => "message",
            UpdateKind::Callback { .. } => "callback",
        }
    }
}

/// Handler result for the chain. `Reply(text)` carries a short acknowledgement so later handlers and the runner can use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain; no response body.
    Stop,
    /// Skip this handler, try next.
    Ignore,
    /// Stop the chain and attach reply text (used to answer callback queries).
    Reply(String),
}

/// Converts a transport-specific user type to core [`User`].
pub trait ToCoreUser: Send + Sync {
    fn to_core(&self) -> User;
}

/// Converts a transport-specific update type to core [`Update`].
pub trait ToCoreUpdate: Send + Sync {
    fn to_core(&self) -> Update;
}

/// Single handler concept: optional before / handle / after. Chain runs all before → handle until Stop/Reply → all after (reverse).
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs before the handle phase. Return false to stop the chain.
    async fn before(&self, _update: &Update) -> crate::error::Result<bool> {
        Ok(true)
    }
    /// Processes the update. Return Stop or Reply to end the handle phase. Default: Continue.
    async fn handle(&self, _update: &Update) -> crate::error::Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
    /// Runs after the handle phase (reverse order), with the final response.
    async fn after(
        &self,
        _update: &Update,
        _response: &HandlerResponse,
    ) -> crate::error::Result<()> {
        Ok(())
    }
}
