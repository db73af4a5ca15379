//! Messaging abstraction for sending, reacting, downloading and scheduling.
//!
//! [`MessagingGateway`] is transport-agnostic; the Telegram implementation lives in turtle-telegram.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

/// Inline button: visible label plus opaque callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Rows of inline buttons.
pub type Keyboard = Vec<Vec<Button>>;

/// Options for [`MessagingGateway::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub reply_to: Option<i32>,
    pub silent: bool,
    pub buttons: Option<Keyboard>,
    pub show_typing: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            reply_to: None,
            silent: true,
            buttons: None,
            show_typing: false,
        }
    }
}

impl SendOptions {
    pub fn with_buttons(buttons: Keyboard) -> Self {
        Self {
            buttons: Some(buttons),
            ..Self::default()
        }
    }

    pub fn typing() -> Self {
        Self {
            show_typing: true,
            ..Self::default()
        }
    }
}

/// Options for [`MessagingGateway::send_photo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoOptions {
    pub caption: Option<String>,
    pub buttons: Option<Keyboard>,
}

/// Handle of a message the gateway sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: i32,
    /// Transport file id of the uploaded photo (largest size), for photo messages.
    pub photo_file_id: Option<String>,
}

/// Emoji reactions the bot puts on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    ThumbsUp,
    ThumbsDown,
    Like,
    SaluteFace,
}

impl Reaction {
    pub fn emoji(&self) -> &'static str {
        match self {
            Reaction::ThumbsUp => "👍",
            Reaction::ThumbsDown => "👎",
            Reaction::Like => "❤",
            Reaction::SaluteFace => "🫡",
        }
    }
}

/// Abstraction over the chat transport. Implementations map to a concrete API (e.g. Telegram).
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Sends a text message and returns its handle.
    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions)
        -> Result<SentMessage>;

    /// Uploads a photo from bytes and returns its handle.
    async fn send_photo(&self, chat_id: i64, photo: &[u8], options: PhotoOptions)
        -> Result<SentMessage>;

    /// Replaces the bot's reaction on a message.
    async fn set_reaction(&self, chat_id: i64, message_id: i32, reaction: Reaction) -> Result<()>;

    /// Acknowledges an inline-button click.
    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<()>;

    /// Downloads an attachment by transport file id.
    async fn download_attachment(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Send time of the latest post scheduled for `destination`, if any.
    async fn last_scheduled_send_date(&self, destination: i64)
        -> Result<Option<DateTime<FixedOffset>>>;

    /// Schedules a photo post with caption for delivery at `at`.
    async fn schedule_send(
        &self,
        destination: i64,
        photo: &[u8],
        caption: &str,
        at: DateTime<FixedOffset>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_options_default_is_silent() {
        let options = SendOptions::default();
        assert!(options.silent);
        assert!(!options.show_typing);
        assert!(options.buttons.is_none());
        assert!(SendOptions::typing().show_typing);
    }

    #[test]
    fn test_reaction_emoji() {
        assert_eq!(Reaction::Like.emoji(), "❤");
        assert_eq!(Reaction::SaluteFace.emoji(), "🫡");
    }
}
