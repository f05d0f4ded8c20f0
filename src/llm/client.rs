//! Chat-completions client for the Perplexity API.
//!
//! OpenAI-compatible endpoint; the client is process-wide and stateless.
//! Transient transport failures are retried with a short backoff, API and
//! credential errors are not.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// OpenAI-compatible chat-completions endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
/// Model used for every pipeline stage.
pub const DEFAULT_MODEL: &str = "sonar-pro";

/// Configuration for the LLM client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    /// Retries for transient transport failures.
    pub max_retries: u32,
}

impl LlmConfig {
    /// Build from `PERPLEXITY_API_KEY`.
    pub fn from_env(max_retries: u32) -> Result<Self, LlmError> {
        let api_key = std::env::var("PERPLEXITY_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingCredentials)?;
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            max_retries,
        })
    }
}

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// LLM client for the extraction pipeline.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Issue one chat completion and return the raw assistant text.
    ///
    /// Connection failures and retryable HTTP statuses (429, 5xx) are
    /// retried up to `max_retries`; other API errors return immediately.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let mut last_error = LlmError::Connection("no attempt made".to_string());
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(1000 * attempt as u64)).await;
                debug!(attempt, "retrying LLM request");
            }
            match self.call_chat(system, user, max_tokens).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    let retryable = matches!(&e, LlmError::Connection(_) | LlmError::Retryable(_));
                    warn!(attempt, error = %e, "LLM request failed");
                    if !retryable {
                        return Err(e);
                    }
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn call_chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status, body);
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(LlmError::Retryable(message));
            }
            return Err(LlmError::Api(message));
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("response contained no choices".to_string()))
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug)]
pub enum LlmError {
    /// Failed to reach the API.
    Connection(String),
    /// API returned a retryable error (rate limit, server error).
    Retryable(String),
    /// API returned a non-retryable error.
    Api(String),
    /// Failed to parse the response envelope.
    Parse(String),
    /// No API key configured.
    MissingCredentials,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Connection(msg) => write!(f, "Connection error: {}", msg),
            LlmError::Retryable(msg) => write!(f, "Retryable API error: {}", msg),
            LlmError::Api(msg) => write!(f, "API error: {}", msg),
            LlmError::Parse(msg) => write!(f, "Parse error: {}", msg),
            LlmError::MissingCredentials => write!(f, "PERPLEXITY_API_KEY is not set"),
        }
    }
}

impl std::error::Error for LlmError {}
