//! Adapters from Telegram (teloxide) types to turtle_core types.
//! Depends only on teloxide and turtle_core type definitions.

use chrono::Utc;
use teloxide::types::{CallbackQuery, Message};
use turtle_core::{Chat, MessageSnapshot, ToCoreUpdate, ToCoreUser, Update, UpdateKind, User};

/// Wraps a teloxide User for conversion to core [`User`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> ToCoreUser for TelegramUserWrapper<'a> {
    fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
        }
    }
}

fn unknown_user() -> User {
    User {
        id: 0,
        username: None,
        first_name: None,
        last_name: None,
    }
}

fn chat_of(msg: &Message) -> Chat {
    let chat_type = if msg.chat.is_private() {
        "private"
    } else if msg.chat.is_channel() {
        "channel"
    } else {
        "group"
    };
    Chat {
        id: msg.chat.id.0,
        chat_type: chat_type.to_string(),
    }
}

/// What the message shows: text, caption and the file id of its largest photo size.
pub fn snapshot(msg: &Message) -> MessageSnapshot {
    MessageSnapshot {
        id: msg.id.0,
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        photo_file_id: msg
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|largest| largest.file.id.0.clone()),
    }
}

/// Wraps a teloxide Message for conversion to a core [`Update`].
pub struct TelegramMessageWrapper<'a>(pub &'a Message);

impl<'a> ToCoreUpdate for TelegramMessageWrapper<'a> {
    fn to_core(&self) -> Update {
        Update {
            user: self
                .0
                .from
                .as_ref()
                .map(|u| TelegramUserWrapper(u).to_core())
                .unwrap_or_else(unknown_user),
            chat: chat_of(self.0),
            kind: UpdateKind::Message {
                message: snapshot(self.0),
                reply_to: self.0.reply_to_message().map(snapshot),
            },
            received_at: Utc::now(),
        }
    }
}

/// Wraps a teloxide CallbackQuery for conversion to a core [`Update`].
///
/// Clicks on messages that are no longer accessible carry no message snapshot; the chat then
/// falls back to the clicking user's private chat.
pub struct TelegramCallbackWrapper<'a>(pub &'a CallbackQuery);

impl<'a> ToCoreUpdate for TelegramCallbackWrapper<'a> {
    fn to_core(&self) -> Update {
        let query = self.0;
        let user = TelegramUserWrapper(&query.from).to_core();
        let message = query.regular_message();
        let chat = message.map(chat_of).unwrap_or_else(|| Chat {
            id: user.id,
            chat_type: "private".to_string(),
        });
        Update {
            user,
            chat,
            kind: UpdateKind::Callback {
                callback_id: query.id.0.clone(),
                data: query.data.clone().unwrap_or_default(),
                message: message.map(snapshot),
            },
            received_at: Utc::now(),
        }
    }
}
