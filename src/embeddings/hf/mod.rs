
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Hugging Face Inference API client for feature extraction.
#[derive(Debug, Clone)]
pub struct HfClient {
    endpoint: Url,
    token: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

/// One feature-extraction result for one input text.
///
/// Sentence-transformer models return a single pooled vector per input;
/// plain transformer checkpoints return one vector per token. The ambiguity
/// is resolved here, at the adapter boundary, so the retrieval algorithm only
/// ever sees sentence vectors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeatureExtraction {
    Single(Vec<f32>),
    PerToken(Vec<Vec<f32>>),
}

impl FeatureExtraction {
    /// Collapse to one sentence vector, mean-pooling token vectors when the
    /// backend returned per-token output.
    #[inline]
    pub fn into_sentence_vector(self) -> Result<Vec<f32>> {
        match self {
            Self::Single(vector) => Ok(vector),
            Self::PerToken(tokens) => {
                let Some(first) = tokens.first() else {
                    return Err(RagError::Embedding(
                        "embedding service returned an empty token sequence".to_string(),
                    ));
                };

                let dimension = first.len();
                let mut pooled = vec![0.0f32; dimension];
                for token in &tokens {
                    if token.len() != dimension {
                        return Err(RagError::Embedding(format!(
                            "embedding service returned token vectors of mixed dimensions ({} vs {})",
                            token.len(),
                            dimension
                        )));
                    }
                    for (sum, value) in pooled.iter_mut().zip(token) {
                        *sum += value;
                    }
                }

                let count = tokens.len() as f32;
                for value in &mut pooled {
                    *value /= count;
                }
                Ok(pooled)
            }
        }
    }
}

impl HfClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        if config.hf.token.is_empty() {
            return Err(RagError::Config(
                "Hugging Face API token is not set; run the config command first".to_string(),
            ));
        }

        let endpoint = config.hf.feature_extraction_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            token: config.hf.token.clone(),
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Run feature extraction on a batch of texts, one result per input.
    #[inline]
    pub fn feature_extraction(&self, texts: &[String]) -> Result<Vec<FeatureExtraction>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Requesting feature extraction for {} texts from {}",
            texts.len(),
            self.endpoint
        );

        let request = FeatureExtractionRequest { inputs: texts };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Embedding(format!("failed to serialize request: {e}")))?;

        let response_text = self.request_with_retry(&request_json)?;

        let results: Vec<FeatureExtraction> = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("failed to parse response: {e}")))?;

        if results.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "requested {} embeddings but the service returned {}",
                texts.len(),
                results.len()
            )));
        }

        Ok(results)
    }

    fn request_with_retry(&self, body: &str) -> Result<String> {
        let mut last_error = None;
        let auth_header = format!("Bearer {}", self.token);

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
                                return Err(RagError::Embedding(format!(
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
                            return Err(RagError::Embedding(format!("request failed: {e}")));
                        }
                    };

                    last_error = Some(RagError::Embedding(format!("request failed: {e}")));

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
            RagError::Embedding("request failed after retries".to_string())
        }))
    }
}

impl Embedder for HfClient {
    #[inline]
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut results = self.feature_extraction(&[query.to_string()])?;
        let Some(result) = results.pop() else {
            return Err(RagError::Embedding(
                "embedding service returned no result for the query".to_string(),
            ));
        };
        result.into_sentence_vector()
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.feature_extraction(texts)?
            .into_iter()
            .map(FeatureExtraction::into_sentence_vector)
            .collect()
    }
}
