//! # Prompt
//!
//! Chat message types (one-to-one with the OpenAI Chat Completions `messages` array) and the
//! prompt builders used by the story pipeline:
//!
//! - [`topics_prompt`]: historical events that happened on a date
//! - [`story_prompt`]: the morning story for a date, about a chosen topic or an operator comment
//! - [`image_prompt_prompt`]: an illustration prompt derived from a story

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Default system instruction: plain text suitable for Telegram.
pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "Do not use Markdown or any formatting symbols (such as *, _, `, #). Output plain text only, ready to be sent as a Telegram message.";

const STORYTELLER_PERSONA: &str = "\
You are a polite little turtle who tells a story to your turtle friends every morning. \
You know history well and always double-check facts and dates: a story with a wrong date or an invented event disappoints everyone. \
Stories are unique, warm and imaginative, sometimes with a light joke. \
Focus on positive, everyday events rather than tragedies. \
Start with a greeting that ends with a turtle emoji, tell about the event woven into a motivating storyline, and finish with wishes for a good day.";

const ILLUSTRATION_TEMPLATE: &str = "Illustration, children's picture book, cute little turtle in the hat (green color), <turtle story action> <background scene>. Pixar style, whole body, cute, smiling, detailed, ultra high definition, 8k";

/// Events that happened on `date` (`dd.mm.yyyy (Weekday)`), as a JSON object `{"events": [...]}`.
pub fn topics_prompt(date: &str, language: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a careful historian. Answer with a JSON object of the form {\"events\": [\"...\"]} and nothing else.",
        ),
        ChatMessage::user(format!(
            "List up to 5 notable, positive historical events that happened on the same day and month as {date} in past years. \
Each event is one short paragraph that starts with the year. Write the events in {language}."
        )),
    ]
}

/// The subject of a story: a suggested topic, or free-form operator guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorySubject<'a> {
    Topic(&'a str),
    Comment(&'a str),
}

/// Morning story for `date` about `subject`.
pub fn story_prompt(date: &str, subject: StorySubject<'_>, language: &str) -> Vec<ChatMessage> {
    let mut request = format!("Write the story for {date}. Write it in {language}.\n\n");
    match subject {
        StorySubject::Topic(topic) => {
            request.push_str("The only allowed topic for the story is:\n");
            request.push_str(topic);
        }
        StorySubject::Comment(comment) => {
            request.push_str("Today is a special day. The reason or plot of the story: ");
            request.push_str(comment);
        }
    }
    vec![
        ChatMessage::system(format!("{STORYTELLER_PERSONA}\n\n{DEFAULT_SYSTEM_MESSAGE}")),
        ChatMessage::user(request),
    ]
}

/// Illustration prompt for an image generator, filled in from `story`.
pub fn image_prompt_prompt(story: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You write prompts for an image generation tool. Start from this template:\n{ILLUSTRATION_TEMPLATE}\n\n\
Replace <turtle story action> with what the turtle does in the story and <background scene> with a detailed scene description. \
Keep the parts in the same order and add no new parts. Never turn the turtle into another character or object, \
and never shift attention to other characters. Avoid comparisons like \"moves like a train\"; let the turtle use or play with the thing instead. \
Answer with the resulting prompt only."
        )),
        ChatMessage::user(format!("Input story:\n{story}")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_prompt_uses_topic() {
        let messages = story_prompt(
            "01.05.2099 (Friday)",
            StorySubject::Topic("1969 - Moon landing"),
            "English",
        );
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[1].content.contains("01.05.2099 (Friday)"));
        assert!(messages[1].content.contains("1969 - Moon landing"));
        assert!(messages[1].content.contains("English"));
    }

    #[test]
    fn test_story_prompt_uses_comment() {
        let messages = story_prompt("01.05.2099", StorySubject::Comment("birthday"), "Russian");
        assert!(messages[1].content.contains("reason or plot of the story: birthday"));
    }

    #[test]
    fn test_topics_prompt_asks_for_json() {
        let messages = topics_prompt("01.05.2099 (Friday)", "Russian");
        assert!(messages[0].content.contains("\"events\""));
        assert!(messages[1].content.contains("Russian"));
    }

    #[test]
    fn test_image_prompt_includes_story() {
        let messages = image_prompt_prompt("The turtle sailed.");
        assert!(messages[0].content.contains("<background scene>"));
        assert!(messages[1].content.ends_with("The turtle sailed."));
    }
}
