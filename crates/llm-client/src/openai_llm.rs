//! OpenAI-backed [`LlmClient`]: wraps openai-client and prepends a system message when the
//! caller did not provide one.

use anyhow::Result;
use async_trait::async_trait;
use prompt::{ChatMessage, MessageRole, DEFAULT_SYSTEM_MESSAGE};
use tracing::instrument;

use super::{chat_message_to_openai, LlmClient};

pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Clone)]
pub struct OpenAILlmClient {
    client: openai_client::OpenAIClient,
    model: String,
    system_prompt: Option<String>,
}

impl OpenAILlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::new(api_key),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::with_base_url(api_key, base_url),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn system_content(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE)
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    #[instrument(skip(self, messages), fields(model = %self.model))]
    async fn get_llm_response_with_messages(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let mut openai_messages = Vec::with_capacity(messages.len() + 1);
        let has_system = messages
            .first()
            .map(|m| m.role == MessageRole::System)
            .unwrap_or(false);
        if !has_system {
            openai_messages.push(chat_message_to_openai(&ChatMessage::system(
                self.system_content(),
            ))?);
        }
        for msg in &messages {
            openai_messages.push(chat_message_to_openai(msg)?);
        }
        self.client
            .chat_completion(&self.model, openai_messages)
            .await
    }
}
