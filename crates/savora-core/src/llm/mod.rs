//! LLM integration - OpenRouter API
//!
//! This module provides:
//! - OpenRouter HTTP client for chat completions
//! - Request/response types matching the OpenAI-compatible API
//! - The `TextCompletion` capability consumed by the recommendation layer

use async_trait::async_trait;
use rand::Rng;

use crate::error::Result;

mod client;
mod types;

pub use client::{DEFAULT_LLM_MODEL, LlmClient, LlmClientBuilder};
pub use types::{ChatRequest, ChatResponse, Choice, Completion, Message, MessageRole, Usage};

/// Text completion capability
///
/// Callers that can complete text hand an implementation to the
/// recommendation engine at construction time. Components that received
/// none simply skip LLM-backed behavior, so availability is decided
/// once, up front, instead of probed per call.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Complete a prompt, returning the generated text
    async fn complete_text(&self, prompt: &str, session_id: &str) -> Result<String>;
}

/// Build a short session identifier like `food_4821`
///
/// Distinguishes unrelated completion calls in provider-side logs.
pub fn completion_session_id(prefix: &str) -> String {
    let n: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("{prefix}_{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_session_id_format() {
        let id = completion_session_id("food");
        let (prefix, digits) = id.split_once('_').unwrap();
        assert_eq!(prefix, "food");
        let n: u32 = digits.parse().unwrap();
        assert!((1000..10000).contains(&n));
    }
}
