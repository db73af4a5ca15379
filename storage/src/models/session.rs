//! Per-chat workflow session.
//!
//! Stored as JSON by the session stores; created lazily on first merge and removed on clear.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the chat's story pipeline currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    AwaitingDate,
    TopicsSuggested,
    StoryDrafted,
    ImagePromptDrafted,
    ImageDrafted,
    AwaitingSchedule,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::AwaitingDate => "awaiting_date",
            Stage::TopicsSuggested => "topics_suggested",
            Stage::StoryDrafted => "story_drafted",
            Stage::ImagePromptDrafted => "image_prompt_drafted",
            Stage::ImageDrafted => "image_drafted",
            Stage::AwaitingSchedule => "awaiting_schedule",
        }
    }
}

/// A staged image: local file plus the transport file id it was last seen under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedImage {
    pub path: PathBuf,
    pub file_id: Option<String>,
}

/// In-flight workflow state of one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub stage: Stage,
    /// Target date, `dd.mm.yyyy`. Validated before use, not on write.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub target_topics: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub image: Option<StagedImage>,
}

impl Session {
    /// True when nothing is stored for the chat.
    pub fn is_empty(&self) -> bool {
        *self == Session::default()
    }

    /// Applies a partial update; fields absent from the patch are left untouched.
    pub fn apply(&mut self, patch: SessionPatch) {
        if patch.reset_drafts {
            self.target_topics.clear();
            self.story = None;
            self.image_prompt = None;
            self.image = None;
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
        if let Some(date) = patch.date {
            self.date = Some(date);
        }
        if let Some(topics) = patch.target_topics {
            self.target_topics = topics;
        }
        if let Some(comment) = patch.comment {
            self.comment = comment;
        }
        if let Some(story) = patch.story {
            self.story = Some(story);
        }
        if let Some(image_prompt) = patch.image_prompt {
            self.image_prompt = Some(image_prompt);
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
    }
}

/// Partial session update. Each `Some` field overwrites the stored value (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub stage: Option<Stage>,
    pub date: Option<String>,
    pub target_topics: Option<Vec<String>>,
    /// `Some(None)` clears the comment.
    pub comment: Option<Option<String>>,
    pub story: Option<String>,
    pub image_prompt: Option<String>,
    pub image: Option<StagedImage>,
    /// Drops topics, story, image prompt and image before the fields above are applied.
    pub reset_drafts: bool,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn target_topics(mut self, topics: Vec<String>) -> Self {
        self.target_topics = Some(topics);
        self
    }

    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn story(mut self, story: impl Into<String>) -> Self {
        self.story = Some(story.into());
        self
    }

    pub fn image_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    pub fn image(mut self, image: StagedImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Starts the patched session over from a blank draft. The comment survives.
    pub fn reset_drafts(mut self) -> Self {
        self.reset_drafts = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == SessionPatch::default()
    }
}
