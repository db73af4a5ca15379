//! # OpenAI API client
//!
//! Thin wrapper around [async-openai] for chat completion. Provides token masking for safe
//! logging and a simple request/response API.

use async_openai::{types::CreateChatCompletionRequestArgs, Client};
use std::sync::Arc;

pub use async_openai::config::OpenAIConfig;
pub use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};

/// Masks an API key/token for safe logging: shows first 7 chars + "***" + last 4 chars.
/// If length <= 11, returns "***" to avoid leaking any part of the key.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_char_boundary(7) || !token.is_char_boundary(len - 4) {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[len - 4..])
}

/// Builds the async-openai config for a key and optional base URL.
pub fn build_config(api_key: String, base_url: Option<String>) -> OpenAIConfig {
    let config = OpenAIConfig::new().with_api_key(api_key);
    match base_url {
        Some(base) => config.with_api_base(base),
        None => config,
    }
}

/// OpenAI chat client. Wraps async-openai client; optionally holds API key for masked logging.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Arc<Client<OpenAIConfig>>,
    /// API key stored only for logging (masked).
    api_key_for_logging: Option<String>,
}

impl OpenAIClient {
    /// Builds a client using the given API key and default API base URL.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Arc::new(Client::with_config(build_config(api_key.clone(), None))),
            api_key_for_logging: Some(api_key),
        }
    }

    /// Builds a client with a custom base URL (e.g. for proxies or compatible endpoints).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Arc::new(Client::with_config(build_config(
                api_key.clone(),
                Some(base_url),
            ))),
            api_key_for_logging: Some(api_key),
        }
    }

    fn masked_key(&self) -> String {
        self.api_key_for_logging
            .as_deref()
            .map(mask_token)
            .unwrap_or_else(|| "***".to_string())
    }

    /// Sends a chat completion request and returns the full assistant reply as a string.
    ///
    /// Logs masked API key, request JSON (debug) and token usage. Errors if the response has no choices.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> anyhow::Result<String> {
        tracing::info!(
            model = %model,
            message_count = messages.len(),
            api_key = %self.masked_key(),
            "OpenAI chat_completion request"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()?;

        if let Ok(json) = serde_json::to_string_pretty(&request) {
            tracing::debug!(request_json = %json, "OpenAI chat_completion request JSON");
        }

        let response = self.client.chat().create(request).await?;

        if let Some(ref u) = response.usage {
            tracing::info!(
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                total_tokens = u.total_tokens,
                "OpenAI chat_completion usage"
            );
        }

        match response.choices.first() {
            Some(choice) => Ok(choice.message.content.clone().unwrap_or_default()),
            None => anyhow::bail!("No response from OpenAI"),
        }
    }
}
