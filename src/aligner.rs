//! Alignment orchestration: resolve a translation through the cache, then
//! score it. This is the surface the annotation UI talks to.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheRecord, CacheScope, TranslationCache, cache_key};
use crate::error::Result;
use crate::matcher::{SentenceMatch, SentenceMatcher};
use crate::scoring::{ScoreResult, SimilarityScorer};
use crate::translate::{TranslationError, Translator};

pub struct Aligner {
    translator: Arc<dyn Translator>,
    scorer: Arc<SimilarityScorer>,
    cache: Arc<TranslationCache>,
}

impl Aligner {
    pub fn new(
        translator: Arc<dyn Translator>,
        scorer: Arc<SimilarityScorer>,
        cache: Arc<TranslationCache>,
    ) -> Self {
        Self {
            translator,
            scorer,
            cache,
        }
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Make `collection_id` the active cache scope.
    pub async fn load_cache(&self, collection_id: &str) -> Arc<CacheScope> {
        self.cache.load(collection_id).await
    }

    /// Persist the active scope. Returns the number of records written.
    pub async fn flush_cache(&self) -> Result<usize> {
        self.cache.flush().await
    }

    /// Translation of `source_text`, from the collection's cache when
    /// present, otherwise from the translator (and then cached if the scope
    /// is writable).
    pub async fn resolve_translation(
        &self,
        source_text: &str,
        collection_id: &str,
    ) -> std::result::Result<String, TranslationError> {
        let scope = self.cache.load(collection_id).await;
        let key = cache_key(source_text);

        if let Some(record) = scope.get(&key) {
            debug!("Translation cache hit in '{}'", collection_id);
            return Ok(record.translation);
        }

        debug!("Translation cache miss in '{}', translating", collection_id);
        let translation = self.translator.translate(source_text).await?;

        if scope.put(CacheRecord {
            key,
            source: source_text.to_string(),
            translation: translation.clone(),
        }) {
            debug!("Cached translation in '{}' ({} records)", collection_id, scope.len());
        }
        Ok(translation)
    }

    /// Score `original` against the translation of `source_text`.
    pub async fn score_pair(
        &self,
        original: &str,
        source_text: &str,
        collection_id: &str,
    ) -> std::result::Result<ScoreResult, TranslationError> {
        let translation = self.resolve_translation(source_text, collection_id).await?;
        Ok(self.scorer.score(original, &translation).await)
    }

    /// Sentence-level matches of `source_sentences` against an already
    /// translated paragraph.
    pub async fn match_sentences(
        &self,
        source_sentences: &[String],
        target_translated_text: &str,
    ) -> Vec<SentenceMatch> {
        SentenceMatcher::new(&self.scorer)
            .match_paragraph(source_sentences, target_translated_text)
            .await
    }
}
