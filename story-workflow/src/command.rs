//! Inbound triggers: operator commands, button actions and plain text, decoded once from an
//! [`Update`] and then matched exhaustively by the engine.

use teloxide::utils::command::BotCommands;
use turtle_core::{MessageSnapshot, Update, UpdateKind};

use crate::action::{Action, ActionDecodeError};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "These commands are supported:")]
pub enum OperatorCommand {
    #[command(description = "say hello")]
    Start,
    #[command(description = "check that I'm alive")]
    Ping,
    #[command(description = "show this text")]
    Help,
    #[command(description = "start a story run: /story [dd.mm.yyyy]")]
    Story(String),
    #[command(description = "suggest topics for the current date again")]
    Topics,
    #[command(description = "draft the story")]
    DraftStory,
    #[command(description = "draft the image prompt")]
    DraftImagePrompt,
    #[command(description = "draw the image")]
    DraftImage,
    #[command(description = "preview the story post")]
    Preview,
    #[command(description = "reply to a photo with caption: /schedule dd.mm.yyyy")]
    Schedule(String),
    #[command(description = "show the current story state")]
    State,
    #[command(description = "forget the current story")]
    Cancel,
    #[command(description = "set a generation comment: /comment <text> or reply to a message")]
    Comment(String),
    #[command(description = "forget the generation comment")]
    ClearComment,
    #[command(description = "reply to a message with a date to use it")]
    SetDate,
    #[command(description = "reply to a message with a story to use it")]
    SetStory,
    #[command(description = "reply to a message with an image prompt to use it")]
    SetImagePrompt,
    #[command(description = "reply to a photo to use it")]
    SetImage,
    #[command(description = "reply to a message with a topic to add it")]
    SetTopic,
}

impl OperatorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OperatorCommand::Start => "start",
            OperatorCommand::Ping => "ping",
            OperatorCommand::Help => "help",
            OperatorCommand::Story(_) => "story",
            OperatorCommand::Topics => "topics",
            OperatorCommand::DraftStory => "draft_story",
            OperatorCommand::DraftImagePrompt => "draft_image_prompt",
            OperatorCommand::DraftImage => "draft_image",
            OperatorCommand::Preview => "preview",
            OperatorCommand::Schedule(_) => "schedule",
            OperatorCommand::State => "state",
            OperatorCommand::Cancel => "cancel",
            OperatorCommand::Comment(_) => "comment",
            OperatorCommand::ClearComment => "clear_comment",
            OperatorCommand::SetDate => "set_date",
            OperatorCommand::SetStory => "set_story",
            OperatorCommand::SetImagePrompt => "set_image_prompt",
            OperatorCommand::SetImage => "set_image",
            OperatorCommand::SetTopic => "set_topic",
        }
    }

    /// `/help` text.
    pub fn help() -> String {
        OperatorCommand::descriptions().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Command {
        command: OperatorCommand,
        message: MessageSnapshot,
        reply_to: Option<MessageSnapshot>,
    },
    Action {
        action: Action,
        /// The message the clicked button is attached to.
        message: Option<MessageSnapshot>,
    },
    Text {
        message: MessageSnapshot,
        reply_to: Option<MessageSnapshot>,
    },
    /// Unknown commands and messages without text.
    Ignored,
}

impl Trigger {
    /// Decodes an update. Only button payloads can fail; unknown commands are [`Trigger::Ignored`].
    pub fn decode(update: &Update, bot_username: &str) -> Result<Trigger, ActionDecodeError> {
        match &update.kind {
            UpdateKind::Callback { data, message, .. } => Ok(Trigger::Action {
                action: Action::decode(data)?,
                message: message.clone(),
            }),
            UpdateKind::Message { message, reply_to } => {
                let Some(text) = message.non_empty_text() else {
                    return Ok(Trigger::Ignored);
                };
                if text.trim_start().starts_with('/') {
                    return Ok(match OperatorCommand::parse(text.trim(), bot_username) {
                        Ok(command) => Trigger::Command {
                            command,
                            message: message.clone(),
                            reply_to: reply_to.clone(),
                        },
                        Err(_) => Trigger::Ignored,
                    });
                }
                Ok(Trigger::Text {
                    message: message.clone(),
                    reply_to: reply_to.clone(),
                })
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            Trigger::Command { command, .. } => format!("command:{}", command.name()),
            Trigger::Action { action, .. } => format!("action:{}", action.kind()),
            Trigger::Text { .. } => "text".to_string(),
            Trigger::Ignored => "ignored".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use turtle_core::{Chat, User};

    fn update(kind: UpdateKind) -> Update {
        Update {
            user: User {
                id: 1,
                username: None,
                first_name: None,
                last_name: None,
            },
            chat: Chat {
                id: 10,
                chat_type: "private".into(),
            },
            kind,
            received_at: Utc::now(),
        }
    }

    fn text(text: &str) -> Update {
        update(UpdateKind::Message {
            message: MessageSnapshot::text(5, text),
            reply_to: None,
        })
    }

    fn command(update: &Update) -> Option<OperatorCommand> {
        match Trigger::decode(update, "turtle_bot").unwrap() {
            Trigger::Command { command, .. } => Some(command),
            _ => None,
        }
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            command(&text("/story 01.05.2026")),
            Some(OperatorCommand::Story("01.05.2026".into()))
        );
        assert_eq!(command(&text("/story")), Some(OperatorCommand::Story(String::new())));
        assert_eq!(
            command(&text("/comment about ships")),
            Some(OperatorCommand::Comment("about ships".into()))
        );
    }

    #[test]
    fn test_snake_case_commands() {
        assert_eq!(command(&text("/set_story")), Some(OperatorCommand::SetStory));
        assert_eq!(command(&text("/clear_comment")), Some(OperatorCommand::ClearComment));
        assert_eq!(command(&text("/set_story@turtle_bot")), Some(OperatorCommand::SetStory));
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        assert_eq!(Trigger::decode(&text("/fly"), "turtle_bot"), Ok(Trigger::Ignored));
    }

    #[test]
    fn test_plain_text_and_callbacks() {
        assert!(matches!(
            Trigger::decode(&text("01.05.2026"), "turtle_bot"),
            Ok(Trigger::Text { .. })
        ));
        let click = update(UpdateKind::Callback {
            callback_id: "q".into(),
            data: Action::ApproveStory.encode(),
            message: Some(MessageSnapshot::text(7, "story")),
        });
        assert!(matches!(
            Trigger::decode(&click, "turtle_bot"),
            Ok(Trigger::Action {
                action: Action::ApproveStory,
                ..
            })
        ));
        let bad = update(UpdateKind::Callback {
            callback_id: "q".into(),
            data: "nope".into(),
            message: None,
        });
        assert!(Trigger::decode(&bad, "turtle_bot").is_err());
    }

    #[test]
    fn test_help_lists_commands() {
        let help = OperatorCommand::help();
        assert!(help.contains("/set_image_prompt"));
        assert!(help.contains("/story"));
    }
}
