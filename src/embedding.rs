//! Sentence embeddings for semantic similarity.
//!
//! [`FastEmbedder`] loads its ONNX model on first use and shares it for the
//! life of the process; inference runs on the blocking thread pool.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::{EmbeddingConfig, EmbeddingModelChoice};
use crate::error::{AlignError, Result};

/// Produces one embedding vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Multilingual embedding model, initialized lazily exactly once. A failed
/// initialization is remembered and not retried.
pub struct FastEmbedder {
    config: EmbeddingConfig,
    model: OnceCell<std::result::Result<Arc<TextEmbedding>, String>>,
}

impl FastEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    fn fastembed_model(&self) -> EmbeddingModel {
        match self.config.model {
            EmbeddingModelChoice::ParaphraseMultilingualMiniLm => EmbeddingModel::ParaphraseMLMiniLML12V2,
            EmbeddingModelChoice::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
            EmbeddingModelChoice::MultilingualE5Base => EmbeddingModel::MultilingualE5Base,
        }
    }

    /// E5 models expect a role prefix; both sides of a similarity
    /// comparison are treated as queries.
    fn prefix(&self) -> &'static str {
        match self.config.model {
            EmbeddingModelChoice::ParaphraseMultilingualMiniLm => "",
            EmbeddingModelChoice::MultilingualE5Small | EmbeddingModelChoice::MultilingualE5Base => "query: ",
        }
    }

    async fn model(&self) -> Result<Arc<TextEmbedding>> {
        match self.model.get_or_init(|| self.load_model()).await {
            Ok(model) => Ok(model.clone()),
            Err(e) => Err(AlignError::Embedding(e.clone())),
        }
    }

    async fn load_model(&self) -> std::result::Result<Arc<TextEmbedding>, String> {
        let model_name = self.fastembed_model();
        let show_download_progress = self.config.show_download_progress;
        info!("Initializing multilingual embedding model: {:?}", model_name);

        let loaded = tokio::task::spawn_blocking(move || {
            let mut options = InitOptions::default();
            options.model_name = model_name;
            options.show_download_progress = show_download_progress;
            TextEmbedding::try_new(options)
        })
        .await;

        let result = match loaded {
            Ok(Ok(model)) => Ok(Arc::new(model)),
            Ok(Err(e)) => Err(format!("Failed to initialize embedding model: {}", e)),
            Err(e) => Err(format!("Model initialization panicked: {}", e)),
        };
        if let Err(e) = &result {
            warn!("{}; semantic similarity will be 0 for this run", e);
        }
        result
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let prefix = self.prefix();
        let inputs: Vec<String> = texts.into_iter().map(|t| format!("{}{}", prefix, t)).collect();
        debug!("Embedding {} texts", inputs.len());

        tokio::task::spawn_blocking(move || model.embed(inputs, None))
            .await
            .map_err(|e| AlignError::Embedding(format!("Embedding task panicked: {}", e)))?
            .map_err(|e| AlignError::Embedding(format!("Failed to generate embeddings: {}", e)))
    }
}

/// Cosine similarity of two vectors; 0 for empty, zero or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_multilingual_embedding() {
        let embedder = FastEmbedder::new(EmbeddingConfig::default());
        let vectors = embedder
            .embed(vec!["the cat sat".to_string(), "החתול ישב".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 384);
        assert!(cosine_similarity(&vectors[0], &vectors[1]) > 0.5);
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_model_loaded_once() {
        let embedder = FastEmbedder::new(EmbeddingConfig::default());
        let first = embedder.model().await.unwrap();
        let second = embedder.model().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_failed_model_load_is_not_retried() {
        let embedder = FastEmbedder {
            config: EmbeddingConfig::default(),
            model: OnceCell::new_with(Some(Err("model unavailable".to_string()))),
        };

        for _ in 0..2 {
            match embedder.embed(vec!["שלום".to_string()]).await {
                Err(AlignError::Embedding(msg)) => assert_eq!(msg, "model unavailable"),
                other => panic!("expected embedding error, got {:?}", other.map(|v| v.len())),
            }
        }
        assert!(embedder.model.initialized());
    }
}
