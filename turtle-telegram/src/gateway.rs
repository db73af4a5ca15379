//! [`MessagingGateway`] over the Telegram Bot API.
//!
//! The Bot API cannot schedule posts, so `schedule_send` queues them in the
//! [`ScheduledPostRepository`] and [`crate::DeliveryWorker`] sends them when due.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use storage::{ScheduledPost, ScheduledPostRepository};
use teloxide::net::Download;
use teloxide::payloads::{SendMessageSetters, SendPhotoSetters, SetMessageReactionSetters};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatAction, ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup,
    InputFile, MessageId, ReactionType, ReplyParameters,
};
use tracing::{debug, info, instrument, warn};
use turtle_core::{
    Keyboard, MessagingGateway, PhotoOptions, Reaction, Result, SendOptions, SentMessage,
    TurtleError,
};

/// Telegram limits callback answers to 200 characters.
pub const MAX_CALLBACK_TEXT: usize = 200;

const PHOTO_FILE_NAME: &str = "story.png";

fn transport(err: impl std::fmt::Display) -> TurtleError {
    TurtleError::Transport(err.to_string())
}

/// Converts core button rows to an inline keyboard.
pub fn inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

/// Cuts `text` to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn photo_file_id(msg: &Message) -> Option<String> {
    msg.photo()
        .and_then(|sizes| sizes.last())
        .map(|largest| largest.file.id.0.clone())
}

#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
    posts: ScheduledPostRepository,
    /// Offset reported back by `last_scheduled_send_date`.
    offset: FixedOffset,
}

impl TelegramGateway {
    pub fn new(bot: Bot, posts: ScheduledPostRepository, offset: FixedOffset) -> Self {
        Self { bot, posts, offset }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    #[instrument(skip(self, text, options))]
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        options: SendOptions,
    ) -> Result<SentMessage> {
        if options.show_typing {
            if let Err(e) = self
                .bot
                .send_chat_action(ChatId(chat_id), ChatAction::Typing)
                .await
            {
                debug!(chat_id, error = %e, "Typing indicator failed");
            }
        }

        let mut req = self
            .bot
            .send_message(ChatId(chat_id), text)
            .disable_notification(options.silent);
        if let Some(reply_to) = options.reply_to {
            req = req.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
        }
        if let Some(buttons) = &options.buttons {
            req = req.reply_markup(inline_keyboard(buttons));
        }

        let sent = req.await.map_err(transport)?;
        Ok(SentMessage {
            message_id: sent.id.0,
            photo_file_id: None,
        })
    }

    #[instrument(skip(self, photo, options), fields(size = photo.len()))]
    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &[u8],
        options: PhotoOptions,
    ) -> Result<SentMessage> {
        let file = InputFile::memory(photo.to_vec()).file_name(PHOTO_FILE_NAME);
        let mut req = self.bot.send_photo(ChatId(chat_id), file);
        if let Some(caption) = options.caption {
            req = req.caption(caption);
        }
        if let Some(buttons) = &options.buttons {
            req = req.reply_markup(inline_keyboard(buttons));
        }

        let sent = req.await.map_err(transport)?;
        Ok(SentMessage {
            message_id: sent.id.0,
            photo_file_id: photo_file_id(&sent),
        })
    }

    async fn set_reaction(&self, chat_id: i64, message_id: i32, reaction: Reaction) -> Result<()> {
        self.bot
            .set_message_reaction(ChatId(chat_id), MessageId(message_id))
            .reaction(vec![ReactionType::Emoji {
                emoji: reaction.emoji().to_string(),
            }])
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<()> {
        let mut req = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if !text.is_empty() {
            req = req.text(truncate_chars(text, MAX_CALLBACK_TEXT));
        }
        req.await.map_err(transport)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn download_attachment(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(transport)?;
        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(transport)?;
        debug!(file_id, size = buf.len(), "Downloaded attachment");
        Ok(buf)
    }

    async fn last_scheduled_send_date(
        &self,
        destination: i64,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        let last = self
            .posts
            .last_send_at(destination)
            .await
            .map_err(|e| TurtleError::Storage(e.to_string()))?;
        Ok(last.map(|at| at.with_timezone(&self.offset)))
    }

    #[instrument(skip(self, photo, caption), fields(size = photo.len()))]
    async fn schedule_send(
        &self,
        destination: i64,
        photo: &[u8],
        caption: &str,
        at: DateTime<FixedOffset>,
    ) -> Result<()> {
        let post = ScheduledPost::new(
            destination,
            caption.to_string(),
            photo.to_vec(),
            at.with_timezone(&Utc),
        );
        self.posts.save(&post).await.map_err(|e| {
            warn!(destination, error = %e, "Failed to queue post");
            TurtleError::Storage(e.to_string())
        })?;
        info!(destination, post_id = %post.id, send_at = %at, "Post queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turtle_core::Button;

    #[test]
    fn test_inline_keyboard_keeps_rows() {
        let keyboard = vec![
            vec![Button::new("1", "turtle:topic:1"), Button::new("2", "turtle:topic:2")],
            vec![Button::new("⏰", "turtle:schedule")],
        ];

        let markup = inline_keyboard(&keyboard);

        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[1][0].text, "⏰");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 200), "short");
        let long = "🐢".repeat(250);
        let cut = truncate_chars(&long, MAX_CALLBACK_TEXT);
        assert_eq!(cut.chars().count(), 200);
    }
}
