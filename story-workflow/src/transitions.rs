//! Pipeline transitions as pure functions.
//!
//! Each function takes the current [`Session`], the triggering input and any collaborator
//! results the engine already obtained, and returns a [`Transition`]: what to do with the
//! session plus the messages to send. Nothing here performs I/O. Approvals take the message
//! being acted upon, so the committed value is what the operator saw.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use image_generation_client::ImageRequest;
use storage::{Session, SessionPatch, Stage, StagedImage};
use turtle_core::{MessageSnapshot, PhotoOptions, Reaction, SendOptions};

use crate::action::Action;
use crate::config::ScheduleTime;
use crate::content::StoryDirective;
use crate::date::{format_date, is_past, parse_date, schedule_timestamp};
use crate::error::{ValidationError, WorkflowError};
use crate::keyboard::{review_keyboard, schedule_keyboard, topic_keyboard};
use crate::messages;
use crate::topics::{parse_topic, render_topics, topic_count};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text { text: String, options: SendOptions },
    Photo { bytes: Vec<u8>, options: PhotoOptions },
    /// Failure to react is logged, not surfaced.
    React { message_id: i32, reaction: Reaction },
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Outbound::Text {
            text: text.into(),
            options: SendOptions::default(),
        }
    }

    /// "Working on it" notice with a typing indicator.
    pub fn notice(text: impl Into<String>) -> Self {
        Outbound::Text {
            text: text.into(),
            options: SendOptions::typing(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Keep,
    Merge(SessionPatch),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub change: SessionChange,
    pub outbound: Vec<Outbound>,
}

impl Transition {
    pub fn keep(outbound: Vec<Outbound>) -> Self {
        Self {
            change: SessionChange::Keep,
            outbound,
        }
    }

    pub fn merge(patch: SessionPatch, outbound: Vec<Outbound>) -> Self {
        Self {
            change: SessionChange::Merge(patch),
            outbound,
        }
    }

    pub fn clear(outbound: Vec<Outbound>) -> Self {
        Self {
            change: SessionChange::Clear,
            outbound,
        }
    }

    /// Appends a reaction on `message_id`, if there is one.
    pub fn react(mut self, message_id: Option<i32>, reaction: Reaction) -> Self {
        if let Some(message_id) = message_id {
            self.outbound.push(Outbound::React {
                message_id,
                reaction,
            });
        }
        self
    }
}

/// Plain reply, no session change.
pub fn reply(text: impl Into<String>) -> Transition {
    Transition::keep(vec![Outbound::text(text)])
}

// ---- run start and topics ----

/// Operator-supplied run date: must parse and must not be before `today`.
pub fn run_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let date = parse_date(input).ok_or(ValidationError::InvalidDate)?;
    if is_past(date, today) {
        return Err(ValidationError::DateInPast);
    }
    Ok(date)
}

/// No date given and none inferable: ask, and treat the next plain text as the answer.
pub fn ask_date() -> Transition {
    Transition::merge(
        SessionPatch::new().stage(Stage::AwaitingDate),
        vec![Outbound::text(messages::ASK_DATE)],
    )
}

fn topics_menu(topics: &[String]) -> Outbound {
    let text = render_topics(topics);
    let count = topic_count(&text);
    Outbound::Text {
        text,
        options: SendOptions::with_buttons(topic_keyboard(count)),
    }
}

/// Topics arrived for a new run: drop the previous run's drafts, remember the date, show the
/// menu. Topics themselves are only committed on selection; the comment is kept.
pub fn topics_suggested(date: NaiveDate, topics: &[String]) -> Transition {
    Transition::merge(
        SessionPatch::new()
            .reset_drafts()
            .date(format_date(date))
            .stage(Stage::TopicsSuggested),
        vec![topics_menu(topics)],
    )
}

/// Menu for the session's existing date.
pub fn topics_listed(topics: &[String]) -> Transition {
    Transition::keep(vec![topics_menu(topics)])
}

/// The session date, parsed.
pub fn session_date(session: &Session) -> Result<NaiveDate, ValidationError> {
    session
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or(ValidationError::InvalidDate)
}

/// Appends the `index`-th topic of the clicked menu to the session topics.
///
/// The UI only offers valid indices, so a miss here is an invalid action, not a validation error.
/// Also returns the selected topic, which the story drafted right after is about.
pub fn select_topic(
    session: &Session,
    menu: Option<&MessageSnapshot>,
    index: usize,
) -> Result<(Transition, String), WorkflowError> {
    let rendered = menu
        .and_then(MessageSnapshot::non_empty_text)
        .ok_or_else(|| WorkflowError::InvalidAction("topic menu has no text".to_string()))?;
    let topic = parse_topic(rendered, index).ok_or_else(|| {
        WorkflowError::InvalidAction(format!(
            "topic #{} not in a menu of {}",
            index,
            topic_count(rendered)
        ))
    })?;

    let mut topics = session.target_topics.clone();
    topics.push(topic.clone());
    Ok((
        Transition::merge(SessionPatch::new().target_topics(topics), Vec::new()),
        topic,
    ))
}

// ---- story ----

/// Date and directive for story generation. A non-empty comment wins over topics; otherwise
/// `selected` (a topic just picked from the menu) wins over the first session topic.
pub fn story_directive(
    session: &Session,
    selected: Option<&str>,
) -> Result<(NaiveDate, StoryDirective), ValidationError> {
    let date = session_date(session)?;
    if let Some(comment) = session
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        return Ok((date, StoryDirective::Comment(comment.to_string())));
    }
    match selected.or(session.target_topics.first().map(String::as_str)) {
        Some(topic) => Ok((date, StoryDirective::Topic(topic.to_string()))),
        None => Err(ValidationError::MissingTopics),
    }
}

pub fn story_drafted(story: String) -> Transition {
    Transition::merge(
        SessionPatch::new()
            .story(story.clone())
            .stage(Stage::StoryDrafted),
        vec![Outbound::Text {
            text: story,
            options: SendOptions::with_buttons(review_keyboard(
                Action::RegenerateStory,
                Action::ApproveStory,
            )),
        }],
    )
}

pub fn approve_story(message: Option<&MessageSnapshot>) -> Result<Transition, ValidationError> {
    let message = message.ok_or(ValidationError::MissingStory)?;
    let story = message
        .non_empty_text()
        .ok_or(ValidationError::MissingStory)?;
    Ok(Transition::merge(SessionPatch::new().story(story), Vec::new())
        .react(Some(message.id), Reaction::Like))
}

// ---- image prompt ----

pub fn image_prompt_source(session: &Session) -> Result<&str, ValidationError> {
    session
        .story
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ValidationError::MissingStory)
}

pub fn image_prompt_drafted(prompt: String) -> Transition {
    Transition::merge(
        SessionPatch::new()
            .image_prompt(prompt.clone())
            .stage(Stage::ImagePromptDrafted),
        vec![Outbound::Text {
            text: prompt,
            options: SendOptions::with_buttons(review_keyboard(
                Action::RegenerateImagePrompt,
                Action::ApproveImagePrompt,
            )),
        }],
    )
}

pub fn approve_image_prompt(
    message: Option<&MessageSnapshot>,
) -> Result<Transition, ValidationError> {
    let message = message.ok_or(ValidationError::MissingImagePrompt)?;
    let prompt = message
        .non_empty_text()
        .ok_or(ValidationError::MissingImagePrompt)?;
    Ok(
        Transition::merge(SessionPatch::new().image_prompt(prompt), Vec::new())
            .react(Some(message.id), Reaction::Like),
    )
}

// ---- image ----

/// Draws from the image prompt when there is one, otherwise straight from the story.
pub fn image_request(session: &Session) -> Result<ImageRequest, ValidationError> {
    let story = session
        .story
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let prompt = session
        .image_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .or(story)
        .ok_or(ValidationError::MissingStory)?;
    Ok(ImageRequest {
        prompt: prompt.to_string(),
        story: story.map(str::to_string),
    })
}

pub fn image_drafted(path: PathBuf, bytes: Vec<u8>) -> Transition {
    Transition::merge(
        SessionPatch::new()
            .image(StagedImage {
                path,
                file_id: None,
            })
            .stage(Stage::ImageDrafted),
        vec![Outbound::Photo {
            bytes,
            options: PhotoOptions {
                caption: None,
                buttons: Some(review_keyboard(
                    Action::RegenerateImage,
                    Action::ApproveImage,
                )),
            },
        }],
    )
}

/// Id and photo file id of the message whose image is being approved.
pub fn approved_photo(message: Option<&MessageSnapshot>) -> Result<(i32, String), ValidationError> {
    message
        .and_then(|m| m.photo_file_id.clone().map(|file_id| (m.id, file_id)))
        .ok_or(ValidationError::InvalidPhoto)
}

pub fn approve_image(message_id: i32, image: StagedImage) -> Transition {
    Transition::merge(
        SessionPatch::new()
            .image(image)
            .stage(Stage::AwaitingSchedule),
        Vec::new(),
    )
    .react(Some(message_id), Reaction::Like)
}

// ---- preview and schedule ----

struct Post {
    date: String,
    story: String,
    photo: Vec<u8>,
}

/// The photo and text a post is built from, when they come from a previewed message rather
/// than the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostSource {
    /// Content of the photo. None when there is no photo or it could not be read.
    pub photo: Option<Vec<u8>>,
    /// Caption of the previewed message; the session story is used when absent.
    pub caption: Option<String>,
    /// True when the photo came from a message rather than the session image.
    pub from_message: bool,
}

impl PostSource {
    /// Session image content, None when it could not be read.
    pub fn staged(photo: Option<Vec<u8>>) -> Self {
        Self {
            photo,
            caption: None,
            from_message: false,
        }
    }

    /// The photo and caption of a previewed message.
    pub fn previewed(photo: Vec<u8>, caption: Option<&str>) -> Self {
        Self {
            photo: Some(photo),
            caption: caption
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            from_message: true,
        }
    }
}

/// Checks, in order: anything stored, valid date, date not past, image set, image readable,
/// story present.
fn validate_post(
    session: &Session,
    source: PostSource,
    today: NaiveDate,
) -> Result<Post, ValidationError> {
    if session.is_empty() {
        return Err(ValidationError::NoPreviewData);
    }
    let (date, parsed) = session
        .date
        .as_deref()
        .and_then(|d| parse_date(d).map(|parsed| (d, parsed)))
        .ok_or(ValidationError::InvalidDate)?;
    if is_past(parsed, today) {
        return Err(ValidationError::DateInPast);
    }
    if session.image.is_none() && !source.from_message {
        return Err(ValidationError::NoStoryPhoto);
    }
    let photo = source.photo.ok_or(ValidationError::InvalidPhoto)?;
    let story = source
        .caption
        .or_else(|| {
            session
                .story
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        })
        .ok_or(ValidationError::MissingStory)?;
    Ok(Post {
        date: date.to_string(),
        story,
        photo,
    })
}

/// Read-only: the staged photo with the story as caption and a schedule button.
pub fn preview(
    session: &Session,
    photo: Option<Vec<u8>>,
    today: NaiveDate,
) -> Result<Transition, ValidationError> {
    let post = validate_post(session, PostSource::staged(photo), today)?;
    Ok(Transition::keep(vec![Outbound::Photo {
        bytes: post.photo,
        options: PhotoOptions {
            caption: Some(post.story),
            buttons: Some(schedule_keyboard()),
        },
    }]))
}

/// A finished post ready to fan out to every destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePlan {
    pub at: DateTime<FixedOffset>,
    pub caption: String,
    pub photo: Vec<u8>,
}

/// The post scheduled for the session date. `source` is what the operator previewed.
pub fn schedule_plan(
    session: &Session,
    source: PostSource,
    today: NaiveDate,
    schedule: &ScheduleTime,
    destinations: &[i64],
) -> Result<SchedulePlan, ValidationError> {
    let post = validate_post(session, source, today)?;
    if destinations.is_empty() {
        return Err(ValidationError::NoDestinations);
    }
    Ok(SchedulePlan {
        at: schedule_timestamp(&post.date, schedule)?,
        caption: post.story,
        photo: post.photo,
    })
}

/// `/schedule <date>` replying to a captioned photo: file id, caption and send time.
pub fn manual_schedule(
    reply_to: Option<&MessageSnapshot>,
    date_arg: &str,
    today: NaiveDate,
    schedule: &ScheduleTime,
    destinations: &[i64],
) -> Result<(String, String, DateTime<FixedOffset>), ValidationError> {
    let reply_to = reply_to.ok_or(ValidationError::NoReplyImage)?;
    let file_id = reply_to
        .photo_file_id
        .clone()
        .ok_or(ValidationError::NoReplyImage)?;
    let caption = reply_to
        .caption
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or(ValidationError::MissingStory)?;
    let date = run_date(date_arg, today)?;
    if destinations.is_empty() {
        return Err(ValidationError::NoDestinations);
    }
    let at = schedule_timestamp(&format_date(date), schedule)?;
    Ok((file_id, caption.to_string(), at))
}

/// Outcome of a best-effort fan-out. No atomicity across destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

fn broadcast_summary(report: &BroadcastReport) -> String {
    if report.failed.is_empty() {
        return messages::SEND_SCHEDULE_STORY.to_string();
    }
    let failed = report
        .failed
        .iter()
        .map(|(chat_id, err)| format!("{}: {}", chat_id, err))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\n\nNot scheduled for:\n{}",
        messages::SEND_SCHEDULE_STORY,
        failed
    )
}

/// The run is over whatever happened per destination.
pub fn scheduled(report: &BroadcastReport) -> Transition {
    Transition::clear(vec![Outbound::text(broadcast_summary(report))])
}

/// Manual scheduling leaves the session alone.
pub fn manually_scheduled(report: &BroadcastReport) -> Transition {
    Transition::keep(vec![Outbound::text(broadcast_summary(report))])
}

// ---- session commands ----

pub fn cancel() -> Transition {
    Transition::clear(vec![Outbound::text(messages::RESET_STORY)])
}

/// Comment from the command argument, or from the replied-to message.
pub fn set_comment(
    arg: &str,
    reply_to: Option<&MessageSnapshot>,
) -> Result<Transition, ValidationError> {
    let comment = Some(arg.trim())
        .filter(|a| !a.is_empty())
        .or_else(|| reply_to.and_then(MessageSnapshot::non_empty_text))
        .ok_or(ValidationError::NoReplyMessage)?;
    Ok(Transition::merge(
        SessionPatch::new().comment(Some(comment.trim().to_string())),
        vec![Outbound::text(messages::SET_COMMENT)],
    ))
}

pub fn clear_comment() -> Transition {
    Transition::merge(
        SessionPatch::new().comment(None),
        vec![Outbound::text(messages::CLEAR_COMMENT)],
    )
}

fn reply_text(reply_to: Option<&MessageSnapshot>) -> Option<&str> {
    reply_to.and_then(|m| {
        m.non_empty_text()
            .or_else(|| m.caption.as_deref().filter(|c| !c.trim().is_empty()))
    })
}

pub fn set_date(
    command: &MessageSnapshot,
    reply_to: Option<&MessageSnapshot>,
) -> Result<Transition, ValidationError> {
    let text = reply_to
        .and_then(MessageSnapshot::non_empty_text)
        .ok_or(ValidationError::NoReplyDate)?;
    let date = parse_date(text).ok_or(ValidationError::InvalidDate)?;
    Ok(Transition::merge(
        SessionPatch::new().date(format_date(date)),
        vec![Outbound::text(messages::REMEMBER_INPUT_DATE)],
    )
    .react(Some(command.id), Reaction::Like))
}

pub fn set_story(
    command: &MessageSnapshot,
    reply_to: Option<&MessageSnapshot>,
) -> Result<Transition, ValidationError> {
    let story = reply_text(reply_to).ok_or(ValidationError::NoReplyStory)?;
    Ok(Transition::merge(
        SessionPatch::new().story(story),
        vec![Outbound::text(messages::REMEMBER_INPUT_STORY)],
    )
    .react(Some(command.id), Reaction::Like))
}

pub fn set_image_prompt(
    command: &MessageSnapshot,
    reply_to: Option<&MessageSnapshot>,
) -> Result<Transition, ValidationError> {
    let prompt = reply_to
        .and_then(MessageSnapshot::non_empty_text)
        .ok_or(ValidationError::NoReplyMessage)?;
    Ok(Transition::merge(
        SessionPatch::new().image_prompt(prompt),
        vec![Outbound::text(messages::REMEMBER_INPUT_IMAGE_PROMPT)],
    )
    .react(Some(command.id), Reaction::Like))
}

/// Photo file id of the replied-to message.
pub fn reply_photo(reply_to: Option<&MessageSnapshot>) -> Result<String, ValidationError> {
    reply_to
        .and_then(|m| m.photo_file_id.clone())
        .ok_or(ValidationError::NoReplyImage)
}

pub fn set_image(command: &MessageSnapshot, image: StagedImage) -> Transition {
    Transition::merge(
        SessionPatch::new().image(image),
        vec![Outbound::text(messages::REMEMBER_INPUT_IMAGE)],
    )
    .react(Some(command.id), Reaction::Like)
}

pub fn set_topic(
    session: &Session,
    command: &MessageSnapshot,
    reply_to: Option<&MessageSnapshot>,
) -> Result<Transition, ValidationError> {
    let topic = reply_to
        .and_then(MessageSnapshot::non_empty_text)
        .ok_or(ValidationError::NoReplyTopic)?;
    let mut topics = session.target_topics.clone();
    topics.push(topic.trim().to_string());
    Ok(Transition::merge(
        SessionPatch::new().target_topics(topics),
        vec![Outbound::text(messages::REMEMBER_TARGET_TOPIC)],
    )
    .react(Some(command.id), Reaction::Like))
}

/// Human-readable dump of the session for `/state`.
pub fn render_state(session: &Session) -> String {
    let mut out = format!("Stage: {}", session.stage.as_str());
    if let Some(date) = &session.date {
        out.push_str(&format!("\nDate: {}", date));
    }
    if !session.target_topics.is_empty() {
        out.push_str("\nTopics:");
        for topic in &session.target_topics {
            out.push_str(&format!("\n- {}", topic));
        }
    }
    if let Some(comment) = &session.comment {
        out.push_str(&format!("\nComment: {}", comment));
    }
    if let Some(story) = &session.story {
        out.push_str(&format!("\n\nStory:\n{}", story));
    }
    if let Some(prompt) = &session.image_prompt {
        out.push_str(&format!("\n\nImage prompt:\n{}", prompt));
    }
    if let Some(image) = &session.image {
        out.push_str(&format!("\n\nImage: {}", image.path.display()));
    }
    out
}

pub fn show_state(session: &Session) -> Transition {
    if session.is_empty() {
        return reply(messages::NO_STATE);
    }
    reply(render_state(session))
}
