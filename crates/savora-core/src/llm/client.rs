//! OpenRouter LLM client
//!
//! Small async client for chat completions, used by the recommendation
//! layer for dish descriptions and dynamic dish ideas. Not consumed by
//! the image component.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::error::{Error, Result};

use super::TextCompletion;
use super::types::{ChatRequest, ChatResponse, Completion, Message};

/// OpenRouter API base URL
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default chat model
pub const DEFAULT_LLM_MODEL: &str = "anthropic/claude-3.5-haiku";

/// Default sampling temperature
const DEFAULT_TEMPERATURE: f32 = 0.9;

/// Default completion budget
const DEFAULT_MAX_TOKENS: usize = 256;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Chat completion client
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Builder for creating an LlmClient
pub struct LlmClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    timeout_secs: Option<u64>,
}

impl Default for LlmClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: None,
        }
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL (defaults to OpenRouter)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the chat model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the LlmClient
    pub fn build(self) -> Result<LlmClient> {
        let api_key = self
            .api_key
            .ok_or_else(|| Error::Llm("API key is required".to_string()))?;

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Transport)?;

        Ok(LlmClient {
            http_client,
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }
}

impl LlmClient {
    /// Create a new builder
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    /// The configured chat model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Make a chat completion request
    pub async fn complete(&self, messages: Vec<Message>) -> Result<Completion> {
        let request = ChatRequest::new(&self.model, messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, messages = request.messages.len(), "sending chat completion");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status.as_u16(), &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse response: {e}")))?;

        Completion::from_chat_response(chat_response)
            .ok_or_else(|| Error::Llm("empty response from API".to_string()))
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete_text(&self, prompt: &str, session_id: &str) -> Result<String> {
        debug!(session = %session_id, "completing text");
        let completion = self.complete(vec![Message::user(prompt)]).await?;
        Ok(completion.content)
    }
}

fn map_error_status(status: u16, body: &str) -> Error {
    match status {
        401 => Error::Llm("unauthorized: invalid API key".to_string()),
        402 => Error::Llm("payment required: insufficient credits".to_string()),
        429 => Error::Llm(format!("rate limited: {body}")),
        _ => Error::Llm(format!("HTTP {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_builder_requires_api_key() {
        let result = LlmClient::builder().build();
        assert!(matches!(result, Err(Error::Llm(_))));
    }

    #[test]
    fn test_builder_defaults() {
        let client = LlmClient::builder().api_key("test-key").build().unwrap();
        assert_eq!(client.model(), DEFAULT_LLM_MODEL);
        assert_eq!(client.base_url, OPENROUTER_BASE_URL);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = LlmClient::builder()
            .api_key("sk-or-secret-value")
            .build()
            .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-or-secret-value"));
    }

    #[tokio::test]
    async fn test_complete_extracts_first_choice() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                r#"{
                    "model": "test/model",
                    "choices": [{"message": {"role": "assistant", "content": "spicy hotpot"}, "finish_reason": "stop"}],
                    "usage": {"prompt_tokens": 8, "completion_tokens": 3, "total_tokens": 11}
                }"#,
            )
            .create_async()
            .await;

        let client = LlmClient::builder()
            .api_key("test-key")
            .base_url(server.url())
            .build()
            .unwrap();

        let completion = client.complete(vec![Message::user("dinner idea")]).await.unwrap();
        assert_eq!(completion.content, "spicy hotpot");
        assert_eq!(completion.tokens_used, 11);
    }

    #[tokio::test]
    async fn test_complete_maps_unauthorized() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": "bad key"}"#)
            .create_async()
            .await;

        let client = LlmClient::builder()
            .api_key("wrong-key")
            .base_url(server.url())
            .build()
            .unwrap();

        let result = client.complete(vec![Message::user("hi")]).await;
        match result {
            Err(Error::Llm(msg)) => assert!(msg.contains("unauthorized"), "message was: {msg}"),
            other => panic!("expected llm error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_text_returns_content() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"model": "m", "choices": [{"message": {"role": "assistant", "content": "noodles"}, "finish_reason": "stop"}]}"#,
            )
            .create_async()
            .await;

        let client = LlmClient::builder()
            .api_key("test-key")
            .base_url(server.url())
            .build()
            .unwrap();

        let text = client.complete_text("lunch", "food_1234").await.unwrap();
        assert_eq!(text, "noodles");
    }
}
