//! Ollama (local) client.

use super::{LlmError, LlmHttpConfig, LlmProvider, LlmTask, build_http_client, send_json};
use crate::config::TaskModels;
use serde::{Deserialize, Serialize};

/// Ollama local LLM client.
pub struct OllamaClient {
    /// API endpoint.
    endpoint: String,
    /// Default model.
    model: String,
    /// Per-task model overrides.
    task_models: TaskModels,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "qwen3:8b";

    /// Creates a new Ollama client with default endpoint and model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            task_models: TaskModels::default(),
            client: build_http_client(LlmHttpConfig::default()),
        }
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

    /// Makes a request to the Ollama generate API.
    fn request(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let request = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request);
        let response: GenerateResponse = send_json(self.name(), model, request)?;

        Ok(response.response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.request(prompt, self.model_for(None))
    }

    fn complete_for_task(&self, prompt: &str, task: LlmTask) -> Result<String, LlmError> {
        self.request(prompt, self.model_for(Some(task)))
    }
}

/// Request to the Generate API.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response from the Generate API.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.name(), "ollama");
        assert_eq!(client.endpoint, "http://localhost:11434");
        assert_eq!(client.model, OllamaClient::DEFAULT_MODEL);
    }

    #[test]
    fn test_client_configuration() {
        let client = OllamaClient::new()
            .with_endpoint("http://gpu-box:11434/")
            .with_model("qwen2.5-coder:14b")
            .with_task_models(TaskModels {
                tagging: Some("llama3.2".to_string()),
                ..TaskModels::default()
            });

        assert_eq!(client.endpoint, "http://gpu-box:11434");
        assert_eq!(client.model_for(None), "qwen2.5-coder:14b");
        assert_eq!(client.model_for(Some(LlmTask::Tagging)), "llama3.2");
        assert_eq!(
            client.model_for(Some(LlmTask::Deduplication)),
            "qwen2.5-coder:14b"
        );
    }

    #[test]
    fn test_unreachable_endpoint_is_connection_error() {
        let client = OllamaClient::new()
            .with_endpoint("http://127.0.0.1:9")
            .with_http_config(LlmHttpConfig {
                timeout_ms: 2_000,
                connect_timeout_ms: 500,
            });
        let err = client.complete("hello").err();
        assert!(matches!(
            err,
            Some(LlmError::Connection(_) | LlmError::Timeout(_))
        ));
    }
}
