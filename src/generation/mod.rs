#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// A role-tagged message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An opaque text-generation service.
///
/// One call per invocation; errors propagate to the caller unchanged and no
/// retry happens above this trait (the HTTP adapter retries transport-level
/// failures internally).
pub trait Generator {
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Groq chat-completion client (OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct GroqClient {
    endpoint: Url,
    key: String,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

impl GroqClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        if config.groq.key.is_empty() {
            return Err(RagError::Config(
                "Groq API key is not set; run the config command first".to_string(),
            ));
        }

        let endpoint = config.groq.chat_completions_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            key: config.groq.key.clone(),
            model: config.groq.model.clone(),
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    fn request_with_retry(&self, body: &str) -> Result<String> {
        let mut last_error = None;
        let auth_header = format!("Bearer {}", self.key);

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            let outcome = self
                .agent
                .post(self.endpoint.as_str())
                .header("Authorization", auth_header.as_str())
                .header("Content-Type", "application/json")
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string());

            match outcome {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(e) => {
                    let should_retry = match &e {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(RagError::Generation(format!(
                                    "client error: HTTP {status}"
                                )));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                e, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", e);
                            return Err(RagError::Generation(format!("request failed: {e}")));
                        }
                    };

                    last_error = Some(RagError::Generation(format!("request failed: {e}")));

                    if should_retry && attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.endpoint);

        Err(last_error.unwrap_or_else(|| {
            RagError::Generation("request failed after retries".to_string())
        }))
    }
}

impl Generator for GroqClient {
    #[inline]
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        debug!(
            "Requesting chat completion with {} messages (max {} tokens)",
            messages.len(),
            max_tokens
        );

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Generation(format!("failed to serialize request: {e}")))?;

        let response_text = self.request_with_retry(&request_json)?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Generation(format!("failed to parse response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                RagError::Generation("generation service returned no choices".to_string())
            })
    }
}
