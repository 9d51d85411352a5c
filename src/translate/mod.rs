// Translation backends
//
// This module provides LLM translation through a factory pattern:
// - Ollama: `/api/generate` on a local or remote ollama server
// - OpenAi: any OpenAI-compatible chat-completions endpoint
//
// Every backend asks the model for one output line per input sentence.
// Nothing downstream relies on the model honouring that.

pub mod common;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use common::*;
use crate::config::{TranslateConfig, TranslationProvider};
use crate::error::Result;

/// A translation that could not be produced. Callers treat it as
/// "no score available" for the pair at hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(String),

    #[error("translation API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("empty translation received")]
    EmptyResponse,

    #[error("unreadable translation response: {0}")]
    InvalidResponse(String),

    #[error("translator is not configured: {0}")]
    Client(String),
}

/// Main trait for translation operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `source_text` into the configured target language
    async fn translate(&self, source_text: &str) -> std::result::Result<String, TranslationError>;

    /// Check that the backend is reachable and the model is present
    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a translator for the configured provider
    pub fn create_translator(config: TranslateConfig) -> Result<Arc<dyn Translator>> {
        let translator: Arc<dyn Translator> = match config.provider {
            TranslationProvider::Ollama => Arc::new(ollama::OllamaTranslator::new(config)?),
            TranslationProvider::OpenAi => Arc::new(openai::OpenAiTranslator::new(config)?),
        };
        Ok(translator)
    }
}
