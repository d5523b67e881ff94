//! OpenAI chat completion provider.
//!
//! Works against any OpenAI-compatible `/v1/chat/completions` endpoint.

use super::{ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// OpenAI API provider.
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    /// Create a new OpenAI provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_options(api_key, Self::DEFAULT_BASE_URL, Duration::from_secs(300))
    }

    /// Create with custom base URL (for Azure OpenAI or compatible APIs) and timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let api_key = api_key.into();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn error(model: &str, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError {
            provider: "openai".into(),
            model: model.to_string(),
            message,
            status_code,
        }
    }
}

/// Convert a unified request into the OpenAI wire format.
fn to_openai_request(request: &ChatRequest) -> OpenAIRequest {
    let mut messages: Vec<OpenAIMessage> = Vec::with_capacity(request.messages.len() + 1);

    if let Some(system) = &request.system {
        messages.push(OpenAIMessage {
            role: "system".into(),
            content: system.clone(),
        });
    }

    messages.extend(request.messages.iter().map(|m| OpenAIMessage {
        role: m.role.clone(),
        content: m.content.clone(),
    }));

    OpenAIRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let url = format!("{}/v1/chat/completions", self.base_url);
        let openai_request = to_openai_request(&request);

        let response = self
            .client
            .post(&url)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| Self::error(&request.model, format!("Request failed: {}", e), None))?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::error(
                &request.model,
                format!("API error: {}", body),
                Some(status.as_u16()),
            ));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            Self::error(&request.model, format!("Failed to parse response: {}", e), None)
        })?;

        let choice = openai_response.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
        let content = choice
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = openai_response.usage.unwrap_or_default();

        tracing::debug!(model = %openai_response.model, latency_ms, total_tokens = usage.total_tokens, "Chat completion received");

        Ok(ChatResponse {
            provider: "openai".into(),
            model: openai_response.model,
            content,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            finish_reason,
            latency_ms,
        })
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: i64,
    completion_tokens: i64,
    total_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    #[test]
    fn test_system_prompt_goes_first() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![
                Message::user("Do you ship abroad?"),
                Message::assistant("Yes, to most countries."),
                Message::user("How long does it take?"),
            ],
            max_tokens: None,
            temperature: Some(0.7),
            system: Some("Be helpful".into()),
        };

        let wire = to_openai_request(&request);
        assert_eq!(wire.messages.len(), 4);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[0].content, "Be helpful");
        assert_eq!(wire.messages[3].content, "How long does it take?");

        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"temperature\":0.7"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn test_response_without_usage_parses() {
        let json = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "Hi"}, "finish_reason": "stop"}]
        }"#;
        let parsed: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider =
            OpenAIProvider::with_options("key", "http://localhost:8000/", Duration::from_secs(5));
        assert_eq!(provider.base_url, "http://localhost:8000");
        assert_eq!(provider.name(), "openai");
    }
}
