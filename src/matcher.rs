use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::SimilarityScorer;
use crate::text::split_sentences;

/// Best target sentence for one source sentence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceMatch {
    pub source_sentence_index: usize,
    /// `None` only when the target paragraph has no sentences
    pub target_sentence_index: Option<usize>,
    pub score: f64,
}

/// Greedy per-sentence matcher. Several source sentences may pick the same
/// target; ties go to the earliest target.
pub struct SentenceMatcher<'a> {
    scorer: &'a SimilarityScorer,
}

impl<'a> SentenceMatcher<'a> {
    pub fn new(scorer: &'a SimilarityScorer) -> Self {
        Self { scorer }
    }

    /// For each source sentence, in order, the highest blended score over
    /// every target sentence.
    pub async fn match_sentences(&self, source: &[String], target: &[String]) -> Vec<SentenceMatch> {
        if target.is_empty() {
            return (0..source.len())
                .map(|i| SentenceMatch {
                    source_sentence_index: i,
                    target_sentence_index: None,
                    score: 0.0,
                })
                .collect();
        }

        // One embedding per sentence, reused across all pairs.
        let texts: Vec<&str> = source.iter().chain(target).map(String::as_str).collect();
        let embeddings = self.scorer.embed_texts(&texts).await;
        let (source_embeddings, target_embeddings) = embeddings.split_at(source.len());

        let mut matches = Vec::with_capacity(source.len());
        for (i, source_sentence) in source.iter().enumerate() {
            let mut best_index = 0;
            let mut best_score = f64::NEG_INFINITY;

            for (j, target_sentence) in target.iter().enumerate() {
                let score = self.scorer.score_embedded(
                    source_sentence,
                    target_sentence,
                    source_embeddings[i].as_deref(),
                    target_embeddings[j].as_deref(),
                );
                if score.blended > best_score {
                    best_index = j;
                    best_score = score.blended;
                }
            }

            debug!("Source sentence {} -> target {} ({:.4})", i, best_index, best_score);
            matches.push(SentenceMatch {
                source_sentence_index: i,
                target_sentence_index: Some(best_index),
                score: best_score,
            });
        }
        matches
    }

    /// Match against a translated paragraph. The translation is split on
    /// line breaks first, then each line into sentences, so merged lines
    /// still yield sentence-sized targets.
    pub async fn match_paragraph(&self, source: &[String], target_text: &str) -> Vec<SentenceMatch> {
        let target = split_translated_text(target_text);
        self.match_sentences(source, &target).await
    }
}

pub fn split_translated_text(text: &str) -> Vec<String> {
    text.lines().flat_map(split_sentences).collect()
}
