
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::RagError;

pub const DEFAULT_HF_MODEL: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";
pub const DEFAULT_HF_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";
pub const DEFAULT_GROQ_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(rename = "hf_api", default)]
    pub hf: HfApiConfig,
    #[serde(rename = "rag_api", default)]
    pub groq: RagApiConfig,
    #[serde(default)]
    pub summarization: SummarizationConfig,
    #[serde(rename = "short_term", default)]
    pub short_term: ShortTermConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Hugging Face Inference API settings for embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HfApiConfig {
    pub token: String,
    pub model: String,
    pub endpoint: String,
    pub batch_size: u32,
}

impl Default for HfApiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            token: String::new(),
            model: DEFAULT_HF_MODEL.to_string(),
            endpoint: DEFAULT_HF_ENDPOINT.to_string(),
            batch_size: 10,
        }
    }
}

/// Groq chat-completion settings for answer generation and summarization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagApiConfig {
    pub key: String,
    pub model: String,
    pub endpoint: String,
}

impl Default for RagApiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            key: String::new(),
            model: DEFAULT_GROQ_MODEL.to_string(),
            endpoint: DEFAULT_GROQ_ENDPOINT.to_string(),
        }
    }
}

/// Per-snippet truncation and summarization thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Hard truncation length per context snippet, in characters.
    pub max_chars: usize,
    /// Similarity below which a snippet is summarized instead of quoted.
    pub summary_threshold: f32,
}

impl Default for SummarizationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chars: 1000,
            summary_threshold: 0.4,
        }
    }
}

/// Short-term conversation memory settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShortTermConfig {
    /// A turn is one user message plus one assistant reply.
    pub max_turns: usize,
}

impl Default for ShortTermConfig {
    #[inline]
    fn default() -> Self {
        Self { max_turns: 5 }
    }
}

/// Fixed-size character chunking settings for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chars: 2000,
            overlap: 200,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid snippet length: {0} (must be between 1 and 100000 characters)")]
    InvalidMaxChars(usize),
    #[error("Invalid summary threshold: {0} (must be a finite similarity between -1 and 1)")]
    InvalidSummaryThreshold(f32),
    #[error("Invalid memory window: {0} (must be between 1 and 100 turns)")]
    InvalidMaxTurns(usize),
    #[error("Invalid chunk size: {0} (must be between 1 and 100000 characters)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than the chunk size ({1})")]
    InvalidOverlap(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            hf: HfApiConfig::default(),
            groq: RagApiConfig::default(),
            summarization: SummarizationConfig::default(),
            short_term: ShortTermConfig::default(),
            chunking: ChunkingConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default config directory.
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir()?;
        Self::load_from(&config_dir)
    }

    /// Load configuration from a specific directory. Missing files yield
    /// defaults so a fresh install can still run the config command.
    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            let mut config = Self::default();
            config.base_dir = config_dir.as_ref().to_path_buf();
            return Ok(config);
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("polyglot-rag"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Paths for a named knowledge base's index and metadata artifacts.
    #[inline]
    pub fn index_paths(&self, name: &str) -> (PathBuf, PathBuf) {
        let embeddings_dir = self.base_dir.join("embeddings");
        let index_path = embeddings_dir.join(format!("{name}.index"));
        let meta_path = embeddings_dir.join(format!("{name}.index.meta.json"));
        (index_path, meta_path)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hf.batch_size == 0 || self.hf.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.hf.batch_size));
        }
        if self.summarization.max_chars == 0 || self.summarization.max_chars > 100_000 {
            return Err(ConfigError::InvalidMaxChars(self.summarization.max_chars));
        }
        let threshold = self.summarization.summary_threshold;
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidSummaryThreshold(threshold));
        }
        if self.short_term.max_turns == 0 || self.short_term.max_turns > 100 {
            return Err(ConfigError::InvalidMaxTurns(self.short_term.max_turns));
        }
        if self.chunking.max_chars == 0 || self.chunking.max_chars > 100_000 {
            return Err(ConfigError::InvalidChunkSize(self.chunking.max_chars));
        }
        if self.chunking.overlap >= self.chunking.max_chars {
            return Err(ConfigError::InvalidOverlap(
                self.chunking.overlap,
                self.chunking.max_chars,
            ));
        }
        if Url::parse(&self.groq.endpoint).is_err() {
            return Err(ConfigError::InvalidEndpoint(self.groq.endpoint.clone()));
        }
        if Url::parse(&self.hf.endpoint).is_err() {
            return Err(ConfigError::InvalidEndpoint(self.hf.endpoint.clone()));
        }
        Ok(())
    }
}

impl HfApiConfig {
    /// Full feature-extraction URL for the configured model.
    #[inline]
    pub fn feature_extraction_url(&self) -> crate::Result<Url> {
        let base = self.endpoint.trim_end_matches('/');
        let full = format!("{base}/{}/pipeline/feature-extraction", self.model);
        Url::parse(&full)
            .map_err(|e| RagError::Config(format!("invalid embedding endpoint {full}: {e}")))
    }
}

impl RagApiConfig {
    #[inline]
    pub fn chat_completions_url(&self) -> crate::Result<Url> {
        Url::parse(&self.endpoint).map_err(|e| {
            RagError::Config(format!("invalid generation endpoint {}: {e}", self.endpoint))
        })
    }
}
