//! Similarity scoring of an (original, translated) pair.
//!
//! Three signals feed the blended score:
//! - lexical overlap: unigram precision of the candidate against the
//!   original's token set (single-gram, no brevity penalty, no clipping)
//! - semantic similarity: cosine of multilingual embeddings of the
//!   normalized texts, floored at 0
//! - length ratio: shorter / longer token count, squared in the blend
//!
//! `blended = (0.6 * lexical + 0.4 * semantic) * length_ratio^2`

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embedding::{Embedder, cosine_similarity};
use crate::text::{NormalizeOptions, normalize_with};

pub const LEXICAL_WEIGHT: f64 = 0.6;
pub const SEMANTIC_WEIGHT: f64 = 0.4;

/// Punctuation split into its own token when counting length.
static RE_LENGTH_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.,;:!?()\[\]{}"'“”‘’「」『』]"#).unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub lexical_overlap: f64,
    pub semantic_similarity: f64,
    pub length_ratio: f64,
    pub blended: f64,
}

impl ScoreResult {
    /// Round the three signals to 4 places and derive the blend from them.
    pub fn from_signals(lexical_overlap: f64, semantic_similarity: f64, length_ratio: f64) -> Self {
        let lexical_overlap = round4(lexical_overlap);
        let semantic_similarity = round4(semantic_similarity);
        let length_ratio = round4(length_ratio);

        Self {
            lexical_overlap,
            semantic_similarity,
            length_ratio,
            blended: round4(blend(lexical_overlap, semantic_similarity, length_ratio)),
        }
    }
}

/// Round half up at 4 decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn blend(lexical_overlap: f64, semantic_similarity: f64, length_ratio: f64) -> f64 {
    let base = LEXICAL_WEIGHT * lexical_overlap + SEMANTIC_WEIGHT * semantic_similarity;
    base * length_ratio.powi(2)
}

/// Share of candidate tokens that occur anywhere in the original.
///
/// Tokens are whitespace-separated and compared case-insensitively, with
/// punctuation left attached. An empty candidate scores 0.
pub fn lexical_overlap(original: &str, candidate: &str) -> f64 {
    let reference: HashSet<String> = original
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let candidate_tokens: Vec<String> = candidate
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    if candidate_tokens.is_empty() {
        return 0.0;
    }

    let matched = candidate_tokens
        .iter()
        .filter(|token| reference.contains(*token))
        .count();

    matched as f64 / candidate_tokens.len() as f64
}

/// Token count with punctuation counted separately.
pub fn length_tokens(text: &str) -> usize {
    let collapsed = RE_WHITESPACE.replace_all(text, " ");
    let spaced = RE_LENGTH_PUNCTUATION.replace_all(&collapsed, " $0 ");
    spaced.split_whitespace().count()
}

/// `min / max` of the two token counts; 0 when either side is empty.
pub fn length_ratio(original: &str, candidate: &str) -> f64 {
    let (n1, n2) = (length_tokens(original), length_tokens(candidate));
    if n1 == 0 || n2 == 0 {
        return 0.0;
    }
    n1.min(n2) as f64 / n1.max(n2) as f64
}

/// Scores pairs; shares one embedder across every call.
pub struct SimilarityScorer {
    embedder: Arc<dyn Embedder>,
    normalize: NormalizeOptions,
}

impl SimilarityScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            normalize: NormalizeOptions::default(),
        }
    }

    pub fn with_strip_diacritics(mut self, strip_diacritics: bool) -> Self {
        self.normalize.strip_diacritics = strip_diacritics;
        self
    }

    pub async fn score(&self, original: &str, candidate: &str) -> ScoreResult {
        let embeddings = self.embed_texts(&[original, candidate]).await;
        self.score_embedded(
            original,
            candidate,
            embeddings[0].as_deref(),
            embeddings[1].as_deref(),
        )
    }

    /// Score a pair whose normalized embeddings were computed beforehand
    /// (see [`Self::embed_texts`]). A missing embedding means semantic 0.
    pub fn score_embedded(
        &self,
        original: &str,
        candidate: &str,
        original_embedding: Option<&[f32]>,
        candidate_embedding: Option<&[f32]>,
    ) -> ScoreResult {
        let semantic = match (original_embedding, candidate_embedding) {
            (Some(a), Some(b)) => cosine_similarity(a, b).clamp(0.0, 1.0),
            _ => 0.0,
        };

        ScoreResult::from_signals(
            lexical_overlap(original, candidate),
            semantic,
            length_ratio(original, candidate),
        )
    }

    /// Embed the normalized form of each text in one model call.
    ///
    /// Texts that normalize to nothing get `None`; an embedding failure
    /// yields `None` for every text.
    pub async fn embed_texts(&self, texts: &[&str]) -> Vec<Option<Vec<f32>>> {
        let normalized: Vec<String> = texts
            .iter()
            .map(|t| normalize_with(t, self.normalize))
            .collect();

        let pending: Vec<usize> = (0..normalized.len())
            .filter(|&i| !normalized[i].is_empty())
            .collect();

        let mut embeddings = vec![None; texts.len()];
        if pending.is_empty() {
            return embeddings;
        }

        let inputs: Vec<String> = pending.iter().map(|&i| normalized[i].clone()).collect();
        match self.embedder.embed(inputs).await {
            Ok(vectors) if vectors.len() == pending.len() => {
                for (i, vector) in pending.into_iter().zip(vectors) {
                    embeddings[i] = Some(vector);
                }
            }
            Ok(vectors) => {
                warn!(
                    "Embedder returned {} vectors for {} texts; semantic similarity set to 0",
                    vectors.len(),
                    pending.len()
                );
            }
            Err(e) => {
                warn!("Embedding failed, semantic similarity set to 0: {}", e);
            }
        }

        debug!(
            "Embedded {}/{} texts",
            embeddings.iter().filter(|e| e.is_some()).count(),
            texts.len()
        );
        embeddings
    }
}
