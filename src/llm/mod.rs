//! LLM client abstraction.
//!
//! The consolidation pipeline treats the language model as one capability:
//! given a prompt and a task label, return text or fail with a typed
//! [`LlmError`]. Callers decide whether a failure means falling back to a
//! deterministic algorithm or propagating.

mod anthropic;
mod ollama;
mod openai;
pub mod prompts;
mod resilience;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use resilience::{LlmResilienceConfig, ResilientLlmProvider};

use crate::config::{LlmConfig, LlmProviderKind};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error as ThisError;

/// What a prompt is for; selects the per-task model override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmTask {
    /// Pairwise similarity scoring.
    Deduplication,
    /// Tag generation.
    Tagging,
    /// Process rule extraction.
    RuleExtraction,
}

impl LlmTask {
    /// Returns the task label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deduplication => "deduplication",
            Self::Tagging => "tagging",
            Self::RuleExtraction => "rule_extraction",
        }
    }
}

impl fmt::Display for LlmTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure of a language-model call.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum LlmError {
    /// No provider is configured, or it lacks credentials.
    #[error("language model not configured: {0}")]
    NotConfigured(String),

    /// The provider could not be reached.
    #[error("language model connection failed: {0}")]
    Connection(String),

    /// The request did not finish in time.
    #[error("language model request timed out: {0}")]
    Timeout(String),

    /// The provider answered with a non-success status.
    #[error("language model rejected request with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response could not be read or did not have the expected shape.
    #[error("invalid language model response: {0}")]
    InvalidResponse(String),

    /// The circuit breaker is refusing calls.
    #[error("circuit breaker open for provider {0}")]
    CircuitOpen(&'static str),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }

    /// Maps a transport error onto the taxonomy.
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::Connection(err.to_string())
        } else {
            Self::InvalidResponse(err.to_string())
        }
    }
}

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion with the provider's default model.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Generates a completion for a specific task.
    ///
    /// Providers with per-task model overrides use them here; the default
    /// ignores the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete_for_task(&self, prompt: &str, task: LlmTask) -> Result<String, LlmError> {
        let _ = task;
        self.complete(prompt)
    }
}

impl<P: LlmProvider + ?Sized> LlmProvider for Arc<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt)
    }

    fn complete_for_task(&self, prompt: &str, task: LlmTask) -> Result<String, LlmError> {
        (**self).complete_for_task(prompt, task)
    }
}

/// Timeouts applied to every provider request.
#[derive(Debug, Clone, Copy)]
pub struct LlmHttpConfig {
    /// Whole-request timeout in milliseconds; 0 disables it.
    pub timeout_ms: u64,
    /// Connection timeout in milliseconds; 0 disables it.
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Timeouts from the `[llm]` section, defaults for anything unset.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: config.timeout_ms.unwrap_or(defaults.timeout_ms),
            connect_timeout_ms: config
                .connect_timeout_ms
                .unwrap_or(defaults.connect_timeout_ms),
        }
    }
}

/// Blocking HTTP client with the given timeouts; zero leaves one unset.
///
/// Falls back to a client without timeouts if the builder fails.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let millis = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = millis(config.timeout_ms) {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = millis(config.connect_timeout_ms) {
        builder = builder.connect_timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not build LLM HTTP client, using defaults");
        reqwest::blocking::Client::new()
    })
}

/// Builds the configured provider wrapped in retry and circuit breaking.
///
/// Returns `None` when the provider is disabled.
#[must_use]
pub fn provider_from_config(config: &LlmConfig) -> Option<Arc<dyn LlmProvider>> {
    let http = LlmHttpConfig::from_config(config);
    let resilience = LlmResilienceConfig::from_config(config);
    let model = config.default_model().to_string();

    let provider: Arc<dyn LlmProvider> = match config.provider {
        LlmProviderKind::Disabled => return None,
        LlmProviderKind::Ollama => {
            let mut client = OllamaClient::new()
                .with_model(model)
                .with_task_models(config.task_models.clone())
                .with_http_config(http);
            if let Some(url) = &config.base_url {
                client = client.with_endpoint(url.clone());
            }
            Arc::new(ResilientLlmProvider::new(client, resilience))
        },
        LlmProviderKind::OpenAi => {
            let mut client = OpenAiClient::new()
                .with_model(model)
                .with_task_models(config.task_models.clone())
                .with_http_config(http);
            if let Some(key) = &config.api_key {
                client = client.with_api_key(key.clone());
            }
            if let Some(url) = &config.base_url {
                client = client.with_endpoint(url.clone());
            }
            Arc::new(ResilientLlmProvider::new(client, resilience))
        },
        LlmProviderKind::Anthropic => {
            let mut client = AnthropicClient::new()
                .with_model(model)
                .with_task_models(config.task_models.clone())
                .with_http_config(http);
            if let Some(key) = &config.api_key {
                client = client.with_api_key(key.clone());
            }
            if let Some(url) = &config.base_url {
                client = client.with_endpoint(url.clone());
            }
            Arc::new(ResilientLlmProvider::new(client, resilience))
        },
    };

    tracing::info!(provider = provider.name(), "Language model provider configured");
    Some(provider)
}

/// Sends a JSON request and decodes the JSON answer.
///
/// Transport failures, non-success statuses and undecodable bodies map onto
/// the matching [`LlmError`] variant and are logged with provider and model.
pub(crate) fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    model: &str,
    request: reqwest::blocking::RequestBuilder,
) -> Result<T, LlmError> {
    let response = request.send().map_err(|e| {
        tracing::error!(
            provider,
            model,
            error = %e,
            is_timeout = e.is_timeout(),
            is_connect = e.is_connect(),
            "LLM request failed"
        );
        LlmError::from_transport(&e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::error!(provider, model, status = status.as_u16(), body = %body, "LLM request rejected");
        return Err(LlmError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    response.json().map_err(|e| {
        tracing::error!(provider, model, error = %e, "LLM response could not be decoded");
        LlmError::InvalidResponse(e.to_string())
    })
}

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\n?(.*?)```").unwrap_or_else(|_| unreachable!())
});

/// The JSON payload of a model response.
///
/// Takes the body of the first fenced block when there is one, then narrows
/// to the span between the first `{` and the last `}`. Text without braces
/// comes back trimmed.
pub fn extract_json(response: &str) -> &str {
    let text = FENCED_BLOCK
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map_or(response, |body| body.as_str())
        .trim();
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}
