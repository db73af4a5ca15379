//! Text generation: topic suggestions, story drafts and image prompts.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use llm_client::LlmClient;
use prompt::StorySubject;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::date::describe_date;
use crate::topics::{normalize_topic, MAX_TOPICS};

/// What a story is about: the first selected topic, or an operator comment that overrides topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryDirective {
    Topic(String),
    Comment(String),
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Up to five event descriptions for `date`.
    async fn suggest_topics(&self, date: NaiveDate, language: &str) -> Result<Vec<String>>;

    async fn draft_story(
        &self,
        date: NaiveDate,
        directive: &StoryDirective,
        language: &str,
    ) -> Result<String>;

    async fn derive_image_prompt(&self, story: &str) -> Result<String>;
}

/// [`ContentProvider`] over any [`LlmClient`].
#[derive(Clone)]
pub struct LlmContentProvider {
    llm: Arc<dyn LlmClient>,
}

impl LlmContentProvider {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[derive(Deserialize)]
struct EventsPayload {
    events: Vec<String>,
}

/// Reads `{"events": [...]}` (optionally inside a code fence); falls back to blank-line
/// separated paragraphs, then to lines. Keeps at most five non-empty entries.
pub fn parse_events(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let events = match serde_json::from_str::<EventsPayload>(unfenced) {
        Ok(payload) => payload.events,
        Err(_) if unfenced.contains("\n\n") => unfenced.split("\n\n").map(str::to_string).collect(),
        Err(_) => unfenced.lines().map(str::to_string).collect(),
    };

    events
        .iter()
        .map(|e| normalize_topic(e))
        .filter(|e| !e.is_empty())
        .take(MAX_TOPICS)
        .collect()
}

#[async_trait]
impl ContentProvider for LlmContentProvider {
    #[instrument(skip(self))]
    async fn suggest_topics(&self, date: NaiveDate, language: &str) -> Result<Vec<String>> {
        let raw = self
            .llm
            .get_llm_response_with_messages(prompt::topics_prompt(&describe_date(date), language))
            .await?;
        let events = parse_events(&raw);
        debug!(count = events.len(), "Parsed topic suggestions");
        if events.is_empty() {
            bail!("model returned no events");
        }
        Ok(events)
    }

    #[instrument(skip(self, directive))]
    async fn draft_story(
        &self,
        date: NaiveDate,
        directive: &StoryDirective,
        language: &str,
    ) -> Result<String> {
        let subject = match directive {
            StoryDirective::Topic(topic) => StorySubject::Topic(topic),
            StoryDirective::Comment(comment) => StorySubject::Comment(comment),
        };
        let story = self
            .llm
            .get_llm_response_with_messages(prompt::story_prompt(
                &describe_date(date),
                subject,
                language,
            ))
            .await?;
        let story = story.trim().to_string();
        if story.is_empty() {
            bail!("model returned an empty story");
        }
        Ok(story)
    }

    #[instrument(skip(self, story))]
    async fn derive_image_prompt(&self, story: &str) -> Result<String> {
        let prompt = self
            .llm
            .get_llm_response_with_messages(prompt::image_prompt_prompt(story))
            .await?;
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            bail!("model returned an empty image prompt");
        }
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt::ChatMessage;
    use std::sync::Mutex;

    struct CannedLlm {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn get_llm_response_with_messages(&self, messages: Vec<ChatMessage>) -> Result<String> {
            self.seen.lock().unwrap().push(messages);
            Ok(self.reply.clone())
        }
    }

    fn provider(reply: &str) -> (LlmContentProvider, Arc<CannedLlm>) {
        let llm = Arc::new(CannedLlm {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        (LlmContentProvider::new(llm.clone()), llm)
    }

    #[test]
    fn test_parse_events_json() {
        let events = parse_events(r#"{"events": ["1969 - Moon", "1903 - Flight"]}"#);
        assert_eq!(events, vec!["1969 - Moon", "1903 - Flight"]);
    }

    #[test]
    fn test_parse_events_fenced_json_capped() {
        let raw = "```json\n{\"events\": [\"a\",\"b\",\"c\",\"d\",\"e\",\"f\"]}\n```";
        assert_eq!(parse_events(raw).len(), 5);
    }

    #[test]
    fn test_parse_events_paragraph_fallback() {
        let events = parse_events("1969 - Moon\nlanding\n\n1903 - Flight");
        assert_eq!(events, vec!["1969 - Moon landing", "1903 - Flight"]);
    }

    #[tokio::test]
    async fn test_suggest_topics_rejects_empty() {
        let (provider, _) = provider("   ");
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert!(provider.suggest_topics(date, "English").await.is_err());
    }

    #[tokio::test]
    async fn test_draft_story_passes_date_and_topic() {
        let (provider, llm) = provider("  Good morning! 🐢  ");
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let story = provider
            .draft_story(date, &StoryDirective::Topic("1969 - Moon".into()), "English")
            .await
            .unwrap();
        assert_eq!(story, "Good morning! 🐢");

        let seen = llm.seen.lock().unwrap();
        let request = &seen[0][1].content;
        assert!(request.contains("01.05.2026 (Friday)"));
        assert!(request.contains("1969 - Moon"));
    }
}
