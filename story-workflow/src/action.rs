//! Inline-button actions.
//!
//! Every button payload decodes to exactly one [`Action`]. Payloads are `turtle:<kind>` or
//! `turtle:<kind>:<arg>` and stay well under Telegram's 64-byte callback data limit.

use std::fmt;
use thiserror::Error;

const PREFIX: &str = "turtle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// 1-based index into the topic menu the button is attached to.
    SelectTopic(usize),
    RegenerateStory,
    ApproveStory,
    RegenerateImagePrompt,
    ApproveImagePrompt,
    RegenerateImage,
    ApproveImage,
    Schedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionDecodeError {
    #[error("payload does not belong to this bot: {0:?}")]
    ForeignPayload(String),
    #[error("unknown action kind: {0:?}")]
    UnknownKind(String),
    #[error("invalid argument for {kind}: {arg:?}")]
    InvalidArgument { kind: &'static str, arg: String },
    #[error("unexpected argument for {kind}")]
    UnexpectedArgument { kind: &'static str },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SelectTopic(_) => "select_topic",
            Action::RegenerateStory => "regenerate_story",
            Action::ApproveStory => "approve_story",
            Action::RegenerateImagePrompt => "regenerate_image_prompt",
            Action::ApproveImagePrompt => "approve_image_prompt",
            Action::RegenerateImage => "regenerate_image",
            Action::ApproveImage => "approve_image",
            Action::Schedule => "schedule",
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Action::SelectTopic(index) => format!("{PREFIX}:{}:{index}", self.kind()),
            _ => format!("{PREFIX}:{}", self.kind()),
        }
    }

    pub fn decode(payload: &str) -> Result<Self, ActionDecodeError> {
        let mut parts = payload.splitn(3, ':');
        if parts.next() != Some(PREFIX) {
            return Err(ActionDecodeError::ForeignPayload(payload.to_string()));
        }
        let kind = parts.next().unwrap_or_default();
        let arg = parts.next();

        let simple = match kind {
            "select_topic" => {
                let raw = arg.unwrap_or_default();
                return match raw.parse::<usize>() {
                    Ok(index) if index >= 1 => Ok(Action::SelectTopic(index)),
                    _ => Err(ActionDecodeError::InvalidArgument {
                        kind: "select_topic",
                        arg: raw.to_string(),
                    }),
                };
            }
            "regenerate_story" => Action::RegenerateStory,
            "approve_story" => Action::ApproveStory,
            "regenerate_image_prompt" => Action::RegenerateImagePrompt,
            "approve_image_prompt" => Action::ApproveImagePrompt,
            "regenerate_image" => Action::RegenerateImage,
            "approve_image" => Action::ApproveImage,
            "schedule" => Action::Schedule,
            other => return Err(ActionDecodeError::UnknownKind(other.to_string())),
        };
        if arg.is_some() {
            return Err(ActionDecodeError::UnexpectedArgument {
                kind: simple.kind(),
            });
        }
        Ok(simple)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_decodes_back() {
        let all = [
            Action::SelectTopic(1),
            Action::SelectTopic(5),
            Action::RegenerateStory,
            Action::ApproveStory,
            Action::RegenerateImagePrompt,
            Action::ApproveImagePrompt,
            Action::RegenerateImage,
            Action::ApproveImage,
            Action::Schedule,
        ];
        for action in all {
            assert_eq!(Action::decode(&action.encode()), Ok(action));
            assert!(action.encode().len() <= 64);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Action::decode("turtle_forward:x"),
            Err(ActionDecodeError::ForeignPayload(_))
        ));
        assert!(matches!(
            Action::decode("turtle:fly"),
            Err(ActionDecodeError::UnknownKind(_))
        ));
        assert!(matches!(
            Action::decode("turtle:select_topic:zero"),
            Err(ActionDecodeError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Action::decode("turtle:select_topic:0"),
            Err(ActionDecodeError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Action::decode("turtle:schedule:now"),
            Err(ActionDecodeError::UnexpectedArgument { .. })
        ));
    }
}
