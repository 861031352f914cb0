//! Anthropic Claude client.

use super::{LlmError, LlmHttpConfig, LlmProvider, LlmTask, build_http_client, send_json};
use crate::config::TaskModels;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Anthropic Claude LLM client.
pub struct AnthropicClient {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Default model.
    model: String,
    /// Per-task model overrides.
    task_models: TaskModels,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.anthropic.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "claude-3-haiku-20240307";

    /// API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Creates a new Anthropic client without credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            task_models: TaskModels::default(),
            client: build_http_client(LlmHttpConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets per-task model overrides.
    #[must_use]
    pub fn with_task_models(mut self, task_models: TaskModels) -> Self {
        self.task_models = task_models;
        self
    }

    /// Sets HTTP client timeouts for LLM requests.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    fn model_for(&self, task: Option<LlmTask>) -> &str {
        task.and_then(|t| self.task_models.get(t))
            .unwrap_or(self.model.as_str())
    }

    /// Checks the key shape before spending a network round trip.
    ///
    /// Valid keys start with `sk-ant-`, are at least 40 characters and
    /// contain only alphanumerics, hyphens and underscores.
    fn is_valid_api_key_format(key: &str) -> bool {
        const MIN_KEY_LENGTH: usize = 40;
        const PREFIX: &str = "sk-ant-";

        key.starts_with(PREFIX)
            && key.len() >= MIN_KEY_LENGTH
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Makes a request to the Anthropic messages API.
    fn request(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LlmError::NotConfigured("LLM_API_KEY not set for anthropic".to_string())
        })?;
        if !Self::is_valid_api_key_format(api_key.expose_secret()) {
            return Err(LlmError::NotConfigured(
                "invalid API key format: expected 'sk-ant-' prefix".to_string(),
            ));
        }

        tracing::debug!(provider = "anthropic", model = %model, "Making LLM request");

        let request = MessagesRequest {
            model,
            max_tokens: 1024,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .json(&request);
        let response: MessagesResponse = send_json(self.name(), model, request)?;

        response
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text)
            .ok_or_else(|| LlmError::InvalidResponse("no text content in response".to_string()))
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for AnthropicClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.request(prompt, self.model_for(None))
    }

    fn complete_for_task(&self, prompt: &str, task: LlmTask) -> Result<String, LlmError> {
        self.request(prompt, self.model_for(Some(task)))
    }
}

/// Request to the Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

/// A message in the conversation.
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// A content block in the response.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_configuration() {
        let client = AnthropicClient::new()
            .with_model("claude-3-5-sonnet-latest")
            .with_task_models(TaskModels {
                rule_extraction: Some("claude-3-opus-latest".to_string()),
                ..TaskModels::default()
            });
        assert_eq!(client.name(), "anthropic");
        assert_eq!(client.model_for(None), "claude-3-5-sonnet-latest");
        assert_eq!(
            client.model_for(Some(LlmTask::RuleExtraction)),
            "claude-3-opus-latest"
        );
    }

    #[test]
    fn test_api_key_format() {
        let valid = format!("sk-ant-api03-{}", "a".repeat(40));
        assert!(AnthropicClient::is_valid_api_key_format(&valid));
        assert!(!AnthropicClient::is_valid_api_key_format("sk-ant-short"));
        assert!(!AnthropicClient::is_valid_api_key_format(&"x".repeat(50)));
        let with_space = format!("sk-ant-api03-{} x", "a".repeat(40));
        assert!(!AnthropicClient::is_valid_api_key_format(&with_space));
    }

    #[test]
    fn test_missing_or_malformed_key_is_not_configured() {
        let missing = AnthropicClient::new().complete("hi").err();
        assert!(matches!(missing, Some(LlmError::NotConfigured(_))));

        let malformed = AnthropicClient::new()
            .with_api_key(SecretString::from("not-a-key"))
            .complete("hi")
            .err();
        assert!(matches!(malformed, Some(LlmError::NotConfigured(_))));
    }
}
