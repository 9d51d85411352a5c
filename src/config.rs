use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, AlignError};

// Default values for fields added after the first config format
fn default_max_retries() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_strip_diacritics() -> bool {
    true
}

fn default_show_download_progress() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Which backend serves translation requests
    pub provider: TranslationProvider,
    /// Base URL of the backend (no trailing path)
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Environment variable holding a bearer key (OpenAI-compatible backends)
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Language code of the text being translated
    pub source_language: String,
    /// Language code the translation is produced in
    pub target_language: String,
    /// Maximum retries for failed translations
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationProvider {
    /// Ollama `/api/generate`
    Ollama,
    /// Any endpoint speaking the OpenAI chat-completions protocol
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Multilingual sentence-embedding model
    pub model: EmbeddingModelChoice,
    /// Show a progress bar while the model downloads on first use
    #[serde(default = "default_show_download_progress")]
    pub show_download_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingModelChoice {
    /// paraphrase-multilingual-MiniLM-L12-v2 (mean pooling, 384 dims)
    ParaphraseMultilingualMiniLm,
    /// multilingual-e5-small (384 dims)
    MultilingualE5Small,
    /// multilingual-e5-base (768 dims)
    MultilingualE5Base,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Strip Hebrew points and cantillation before embedding
    #[serde(default = "default_strip_diacritics")]
    pub strip_diacritics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one `<collection>.jsonl` store per collection
    pub dir: PathBuf,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::Ollama,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            api_key_env: None,
            source_language: "he".to_string(),
            target_language: "en".to_string(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModelChoice::ParaphraseMultilingualMiniLm,
            show_download_progress: default_show_download_progress(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strip_diacritics: default_strip_diacritics(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".bitext-align/cache"),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AlignError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AlignError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| AlignError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
