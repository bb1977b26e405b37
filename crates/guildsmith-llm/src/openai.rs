//! OpenAI-compatible chat completions provider.
//!
//! Works with the `OpenAI` API and any compatible endpoint (LM Studio,
//! vLLM, Ollama).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::provider::{LlmProvider, ProviderConfig};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible LLM provider. Makes exactly one request per call.
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
    url: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("config", &self.config)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpError`] if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
        Ok(Self {
            client,
            config,
            url,
        })
    }

    /// The endpoint requests go to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Build the chat completions request body.
#[must_use]
pub fn build_request_body(config: &ProviderConfig, system: &str, prompt: &str) -> Value {
    let mut messages = Vec::with_capacity(2);
    if !system.is_empty() {
        messages.push(serde_json::json!({
            "role": "system",
            "content": system
        }));
    }
    messages.push(serde_json::json!({
        "role": "user",
        "content": prompt
    }));

    serde_json::json!({
        "model": config.model,
        "messages": messages,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    })
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

/// Pull the first choice's text out of a chat completions response.
///
/// # Errors
///
/// Returns [`LlmError::InvalidResponse`] if the body is not a completion and
/// [`LlmError::EmptyResponse`] if it carries no text.
pub fn extract_content(body: &str) -> LlmResult<String> {
    let response: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;
    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(LlmError::EmptyResponse),
    }
}

/// Check whether a URL points to a local endpoint where an API key is
/// typically not required.
fn is_local_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("localhost") || lower.contains("127.0.0.1") || lower.contains("[::1]")
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> LlmResult<String> {
        if self.config.api_key.is_empty() && !is_local_url(&self.url) {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: "openai".to_string(),
            });
        }

        let body = build_request_body(&self.config, system, prompt);
        debug!(model = %self.config.model, url = %self.url, "Making chat completion request");

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");

        if !self.config.api_key.is_empty() {
            let mut auth_value = reqwest::header::HeaderValue::try_from(format!(
                "Bearer {}",
                self.config.api_key
            ))
            .map_err(|e| LlmError::ConfigError(format!("Invalid API key characters: {e}")))?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(1);
            return Err(LlmError::RateLimitExceeded { retry_after_secs });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::InvalidResponse(format!(
                "HTTP {}: {text}",
                status.as_u16()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequestFailed(e.to_string()))?;
        extract_content(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let config = ProviderConfig::new("sk-test", "gpt-4o-mini");
        let body = build_request_body(&config, "be careful", "analyse this");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "analyse this");
    }

    #[test]
    fn test_request_body_without_system() {
        let body = build_request_body(&ProviderConfig::default(), "", "hi");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"issues\":[]}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"{"issues":[]}"#);
    }

    #[test]
    fn test_extract_empty_and_invalid() {
        let empty = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert!(matches!(extract_content(empty), Err(LlmError::EmptyResponse)));
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_content("<html>"),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_default_url() {
        let provider = OpenAiProvider::new(ProviderConfig::new("k", "m")).unwrap();
        assert!(provider.url().contains("api.openai.com"));
        let provider = OpenAiProvider::new(
            ProviderConfig::new("", "local").base_url("http://localhost:1234/v1/chat/completions"),
        )
        .unwrap();
        assert!(is_local_url(provider.url()));
    }

    #[tokio::test]
    async fn test_missing_key_for_remote() {
        let provider = OpenAiProvider::new(ProviderConfig::new("", "gpt-4o-mini")).unwrap();
        let err = provider.complete("sys", "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyNotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_invalid_api_key_characters() {
        let provider =
            OpenAiProvider::new(ProviderConfig::new("invalid\nkey", "gpt-4o-mini")).unwrap();
        let err = provider.complete("sys", "hi").await.unwrap_err();
        assert!(matches!(
            err,
            LlmError::ConfigError(ref msg) if msg.contains("Invalid API key characters")
        ));
    }
}
