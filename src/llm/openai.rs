//! `OpenAI` client.

use super::{LlmError, LlmHttpConfig, LlmProvider, LlmTask, build_http_client, send_json};
use crate::config::TaskModels;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// `OpenAI` LLM client, also usable against compatible endpoints.
pub struct OpenAiClient {
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

impl OpenAiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Creates a new `OpenAI` client without credentials.
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

    /// GPT-5 and o-series models take `max_completion_tokens` and no temperature.
    fn is_reasoning_model(model: &str) -> bool {
        model.starts_with("gpt-5") || model.starts_with("o1") || model.starts_with("o3")
    }

    /// Makes a request to the `OpenAI` chat completions API.
    fn request(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::NotConfigured("LLM_API_KEY not set for openai".to_string()))?;

        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];
        let request = if Self::is_reasoning_model(model) {
            ChatCompletionRequest {
                model,
                messages,
                max_tokens: None,
                max_completion_tokens: Some(1024),
                temperature: None,
            }
        } else {
            ChatCompletionRequest {
                model,
                messages,
                max_tokens: Some(1024),
                max_completion_tokens: None,
                temperature: Some(0.2),
            }
        };

        let request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(api_key.expose_secret())
            .json(&request);
        let response: ChatCompletionResponse = send_json(self.name(), model, request)?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.request(prompt, self.model_for(None))
    }

    fn complete_for_task(&self, prompt: &str, task: LlmTask) -> Result<String, LlmError> {
        self.request(prompt, self.model_for(Some(task)))
    }
}

/// Request to the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    /// Token limit for GPT-4 and earlier models.
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Token limit for GPT-5/o1/o3 models.
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// A message in the chat.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the Chat Completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// A choice in the response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
