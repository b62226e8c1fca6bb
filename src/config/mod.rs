// Configuration management module
// Handles the TOML configuration file and the API credential


use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;
use crate::query::prompt::{CONTEXT_SLOT, QUESTION_SLOT};

/// Environment variable holding the API credential
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Default configuration file name, resolved relative to the working directory
pub const CONFIG_FILE_NAME: &str = "sop-finder.toml";

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub answer: AnswerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: u32,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub batch_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 512,
            batch_size: 16,
        }
    }
}

/// Which neighbors of the query vector become answer context
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// The k nearest chunks, regardless of score
    TopK,
    /// All chunks at or above the similarity threshold, up to the cap
    Threshold,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub policy: PolicyKind,
    pub top_k: usize,
    pub threshold: f32,
    pub cap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::TopK,
            top_k: 5,
            threshold: 0.45,
            cap: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnswerConfig {
    /// Prompt template override; must keep the context and question slots
    pub prompt_template: Option<String>,
    /// Answers shorter than this (in words) get the length advisory appended
    pub min_answer_words: usize,
    /// Toggle for the short-answer advisory heuristic
    pub length_advisory: bool,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            prompt_template: None,
            min_answer_words: 10,
            length_advisory: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory scanned for PDF manuals during ingestion
    pub data_dir: PathBuf,
    /// Directory holding the persisted vector index
    pub index_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from("sop_index"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid max tokens: {0} (must be between 1 and 32768)")]
    InvalidMaxTokens(u32),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid max chunk size: {0} (must be between 100 and 8192 characters)")]
    InvalidMaxChars(usize),
    #[error("Chunk overlap ({0}) must be smaller than the max chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top-k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid similarity threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidThreshold(f32),
    #[error("Invalid retrieval cap: {0} (must be between 1 and 100)")]
    InvalidCap(usize),
    #[error("Prompt template is missing the {0} slot")]
    PromptMissingSlot(&'static str),
    #[error("{API_KEY_VAR} is not set; add it to the environment or a .env file")]
    MissingApiKey,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load the configuration file, falling back to defaults when absent.
    ///
    /// An explicit `path` that does not exist is an error; the implicit
    /// `./sop-finder.toml` is optional.
    #[inline]
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE_NAME), false),
        };

        if !config_path.exists() {
            if required {
                return Err(crate::SopError::Config(format!(
                    "config file not found: {}",
                    config_path.display()
                )));
            }
            let config = Self::default();
            config
                .validate()
                .map_err(|e| crate::SopError::Config(e.to_string()))?;
            return Ok(config);
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::SopError::Config(format!("{}: {e}", config_path.display())))?;

        config
            .validate()
            .map_err(|e| crate::SopError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Write this configuration to `path` as TOML.
    #[inline]
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.retrieval.validate()?;

        if !(100..=8192).contains(&self.chunking.max_chars) {
            return Err(ConfigError::InvalidMaxChars(self.chunking.max_chars));
        }
        if self.chunking.overlap >= self.chunking.max_chars {
            return Err(ConfigError::OverlapTooLarge(
                self.chunking.overlap,
                self.chunking.max_chars,
            ));
        }

        if let Some(template) = &self.answer.prompt_template {
            if !template.contains(CONTEXT_SLOT) {
                return Err(ConfigError::PromptMissingSlot(CONTEXT_SLOT));
            }
            if !template.contains(QUESTION_SLOT) {
                return Err(ConfigError::PromptMissingSlot(QUESTION_SLOT));
            }
        }

        Ok(())
    }
}

impl ApiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }
        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }
        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if self.max_tokens == 0 || self.max_tokens > 32768 {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        Ok(())
    }

    #[inline]
    pub fn url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if !(1..=100).contains(&self.cap) {
            return Err(ConfigError::InvalidCap(self.cap));
        }
        Ok(())
    }
}

/// Load the API credential from the environment, reading a local `.env`
/// file first. Absence is fatal before any other work begins.
#[inline]
pub fn load_api_key() -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();
    api_key_from(env::var(API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey),
    }
}
