//! Workflow error taxonomy. Every variant maps to one operator-facing text.

use storage::StorageError;
use thiserror::Error;
use turtle_core::TurtleError;

use crate::action::ActionDecodeError;
use crate::date::DateError;
use crate::messages;

/// Bad, missing or past input. Recovered locally: the operator gets a specific message and the
/// session is not touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no replied-to message with a date")]
    NoReplyDate,
    #[error("no replied-to message with a story")]
    NoReplyStory,
    #[error("no replied-to image message")]
    NoReplyImage,
    #[error("no replied-to message with a topic")]
    NoReplyTopic,
    #[error("no replied-to text message")]
    NoReplyMessage,
    #[error("invalid date")]
    InvalidDate,
    #[error("date in the past")]
    DateInPast,
    #[error("no story")]
    MissingStory,
    #[error("no image prompt")]
    MissingImagePrompt,
    #[error("no topic and no comment")]
    MissingTopics,
    #[error("no story photo")]
    NoStoryPhoto,
    #[error("unreadable story photo")]
    InvalidPhoto,
    #[error("nothing to preview")]
    NoPreviewData,
    #[error("no broadcast destinations")]
    NoDestinations,
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::NoReplyDate => messages::ERR_NO_REPLY_DATE,
            ValidationError::NoReplyStory => messages::ERR_NO_REPLY_STORY,
            ValidationError::NoReplyImage => messages::ERR_NO_REPLY_IMAGE,
            ValidationError::NoReplyTopic => messages::ERR_NO_REPLY_STORY_TOPIC,
            ValidationError::NoReplyMessage => messages::ERR_NO_REPLY_MSG,
            ValidationError::InvalidDate => messages::ERR_INVALID_INPUT_DATE,
            ValidationError::DateInPast => messages::ERR_DATE_IN_THE_PAST,
            ValidationError::MissingStory => messages::ERR_INVALID_STORY,
            ValidationError::MissingImagePrompt => messages::ERR_NO_IMAGE_PROMPT,
            ValidationError::MissingTopics => messages::ERR_NO_TOPICS,
            ValidationError::NoStoryPhoto => messages::ERR_NO_STORY_PHOTO,
            ValidationError::InvalidPhoto => messages::ERR_INVALID_PHOTO,
            ValidationError::NoPreviewData => messages::ERR_NO_PREVIEW_DATA,
            ValidationError::NoDestinations => messages::ERR_NO_DESTINATIONS,
        }
    }
}

impl From<DateError> for ValidationError {
    fn from(_: DateError) -> Self {
        ValidationError::InvalidDate
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Text generation failed.
    #[error("content provider error: {0}")]
    Provider(String),

    /// Image generation failed, timed out, or its artifact could not be fetched.
    #[error("image generation failed: {}", .0.as_deref().unwrap_or("no details"))]
    ImageGeneration(Option<String>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("staging error: {0}")]
    Staging(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// Storage failures are not recovered inside the workflow; they reach the dispatch boundary.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WorkflowError::Storage(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Validation(v) => v.user_message().to_string(),
            WorkflowError::Provider(_) => messages::ERR_GENERATION.to_string(),
            WorkflowError::ImageGeneration(Some(reason)) => {
                format!("{}\n\n{}", messages::ERR_IMAGE_GENERATION, reason)
            }
            WorkflowError::ImageGeneration(None) => messages::ERR_IMAGE_GENERATION.to_string(),
            WorkflowError::Transport(_) => messages::ERR_DELIVERY.to_string(),
            WorkflowError::Staging(_) => messages::ERR_STAGING.to_string(),
            WorkflowError::InvalidAction(_) => messages::ERR_INVALID_ACTION.to_string(),
            WorkflowError::Storage(e) => messages::unhandled_error(e),
        }
    }

    pub fn transport(err: TurtleError) -> Self {
        WorkflowError::Transport(err.to_string())
    }
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        WorkflowError::Storage(err.to_string())
    }
}

impl From<ActionDecodeError> for WorkflowError {
    fn from(err: ActionDecodeError) -> Self {
        WorkflowError::InvalidAction(err.to_string())
    }
}

impl From<WorkflowError> for TurtleError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Storage(e) => TurtleError::Storage(e),
            WorkflowError::Transport(e) => TurtleError::Transport(e),
            WorkflowError::Provider(e) => TurtleError::Provider(e),
            other => TurtleError::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_not_recoverable() {
        assert!(!WorkflowError::Storage("disk full".into()).is_recoverable());
        assert!(WorkflowError::Provider("quota".into()).is_recoverable());
        assert!(WorkflowError::Validation(ValidationError::InvalidDate).is_recoverable());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            WorkflowError::from(ValidationError::DateInPast).user_message(),
            messages::ERR_DATE_IN_THE_PAST
        );
        let image = WorkflowError::ImageGeneration(Some("nsfw".into())).user_message();
        assert!(image.starts_with(messages::ERR_IMAGE_GENERATION));
        assert!(image.ends_with("nsfw"));
    }
}
