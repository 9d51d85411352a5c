use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::aligner::Aligner;
use crate::cache::{CacheRecord, CacheScope, TranslationCache};
use crate::config::Config;
use crate::embedding::FastEmbedder;
use crate::error::{AlignError, Result};
use crate::matcher::SentenceMatch;
use crate::scoring::{ScoreResult, SimilarityScorer};
use crate::text::split_sentences;
use crate::translate::TranslatorFactory;

/// One line of a batch input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairInput {
    pub original: String,
    pub source: String,
}

/// One line of a batch output file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairOutput {
    /// Zero-based line number in the input file
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub scored: usize,
    pub failed: usize,
    pub flushed: usize,
}

/// Persisted store found under the cache directory
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub records: usize,
}

pub struct Workflow {
    config: Config,
    aligner: Aligner,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let translator = TranslatorFactory::create_translator(config.translate.clone())?;
        let embedder = Arc::new(FastEmbedder::new(config.embedding.clone()));
        let scorer = SimilarityScorer::new(embedder)
            .with_strip_diacritics(config.scoring.strip_diacritics);
        let cache = TranslationCache::new(config.cache.dir.clone());

        let aligner = Aligner::new(translator, Arc::new(scorer), Arc::new(cache));
        Ok(Self::with_aligner(config, aligner))
    }

    pub fn with_aligner(config: Config, aligner: Aligner) -> Self {
        Self { config, aligner }
    }

    pub fn aligner(&self) -> &Aligner {
        &self.aligner
    }

    /// Score one pair, surfacing a failed translation as an error
    pub async fn score_pair(&self, original: &str, source: &str, collection_id: &str) -> Result<ScoreResult> {
        self.aligner
            .score_pair(original, source, collection_id)
            .await
            .map_err(|e| AlignError::Translation(e.to_string()))
    }

    /// Split `source_paragraph` and match it against translated text
    pub async fn match_paragraphs(&self, source_paragraph: &str, target_text: &str) -> Vec<SentenceMatch> {
        let source = split_sentences(source_paragraph);
        self.aligner.match_sentences(&source, target_text).await
    }

    /// Score every pair in a JSONL file, writing one result line per input line
    pub async fn process_batch<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        collection_id: &str,
        flush: bool,
    ) -> Result<BatchSummary> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();
        info!("Scoring pairs from {} in collection '{}'", input_path.display(), collection_id);

        if !input_path.exists() {
            return Err(AlignError::Config(format!("Input file not found: {}", input_path.display())));
        }

        if let Err(e) = self.aligner.translator().check_availability().await {
            warn!("Translator unavailable, uncached pairs will fail: {}", e);
        }

        let content = fs::read_to_string(input_path).await?;
        let lines: Vec<(usize, &str)> = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .collect();

        let progress = ProgressBar::new(lines.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} [{bar:40}] {pos}/{len} pairs ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        self.aligner.load_cache(collection_id).await;

        let mut summary = BatchSummary::default();
        let mut output = String::new();
        for &(index, line) in &lines {
            let result = match serde_json::from_str::<PairInput>(line) {
                Ok(pair) => self
                    .aligner
                    .score_pair(&pair.original, &pair.source, collection_id)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("invalid input line: {}", e)),
            };

            let record = match result {
                Ok(score) => {
                    summary.scored += 1;
                    PairOutput { index, score: Some(score), error: None }
                }
                Err(error) => {
                    summary.failed += 1;
                    warn!("Pair {} not scored: {}", index, error);
                    PairOutput { index, score: None, error: Some(error) }
                }
            };
            output.push_str(&serde_json::to_string(&record)?);
            output.push('\n');
            progress.inc(1);
        }
        progress.finish_and_clear();

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(output_path, output).await?;

        if flush {
            summary.flushed = self.aligner.flush_cache().await?;
        }

        info!(
            "Batch complete: {} scored, {} failed, {} translations flushed",
            summary.scored, summary.failed, summary.flushed
        );
        Ok(summary)
    }

    /// Persisted collection stores under the configured cache directory
    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        list_collections(&self.config.cache.dir).await
    }

    /// Records of one persisted collection
    pub async fn collection_records(&self, collection_id: &str) -> Result<Vec<CacheRecord>> {
        collection_records(&self.config.cache.dir, collection_id).await
    }
}

/// Persisted collection stores under `dir`. Needs no translator or model.
pub async fn list_collections(dir: &Path) -> Result<Vec<CollectionInfo>> {
    let mut collections = Vec::new();
    if !dir.is_dir() {
        return Ok(collections);
    }

    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let scope = CacheScope::load(name, path.to_path_buf()).await;
        collections.push(CollectionInfo {
            name: name.to_string(),
            records: scope.len(),
        });
    }

    collections.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(collections)
}

/// Records of the collection persisted under `dir`
pub async fn collection_records(dir: &Path, collection_id: &str) -> Result<Vec<CacheRecord>> {
    let path = TranslationCache::new(dir).store_path(collection_id);
    if !path.exists() {
        return Err(AlignError::Cache(format!("No cache stored for collection '{}'", collection_id)));
    }
    Ok(CacheScope::load(collection_id, path).await.records())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::KeywordEmbedder;
    use crate::translate::{MockTranslator, TranslationError};

    fn workflow_with(translator: MockTranslator, dir: &Path) -> Workflow {
        let mut config = Config::default();
        config.cache.dir = dir.to_path_buf();

        let scorer = SimilarityScorer::new(Arc::new(KeywordEmbedder::new(&[])));
        let aligner = Aligner::new(
            Arc::new(translator),
            Arc::new(scorer),
            Arc::new(TranslationCache::new(dir)),
        );
        Workflow::with_aligner(config, aligner)
    }

    fn translator_failing_on(bad: &'static str) -> MockTranslator {
        let mut translator = MockTranslator::new();
        translator.expect_check_availability().returning(|| Ok(()));
        translator.expect_translate().returning(move |text| {
            if text == bad {
                Err(TranslationError::Api { status: 500, body: String::new() })
            } else {
                Ok("Hello there.".to_string())
            }
        });
        translator
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pairs.jsonl");
        let output = dir.path().join("out/results.jsonl");
        std::fs::write(
            &input,
            concat!(
                "{\"original\":\"Hello there.\",\"source\":\"שלום לך.\"}\n",
                "{\"original\":\"Broken.\",\"source\":\"שגיאה\"}\n",
                "not json\n",
                "\n",
                "{\"original\":\"Hello there.\",\"source\":\"היי.\"}\n",
            ),
        )
        .unwrap();

        let workflow = workflow_with(translator_failing_on("שגיאה"), &dir.path().join("cache"));
        let summary = workflow
            .process_batch(&input, &output, "batch", true)
            .await
            .unwrap();

        assert_eq!(summary, BatchSummary { scored: 2, failed: 2, flushed: 2 });

        let written = std::fs::read_to_string(&output).unwrap();
        let results: Vec<PairOutput> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].score.unwrap().blended, 1.0);
        assert!(results[1].error.is_some());
        assert!(results[2].error.as_deref().unwrap().contains("invalid input"));
        assert_eq!(results[3].index, 4);
    }

    #[tokio::test]
    async fn test_list_and_show_collections() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.jsonl"),
            format!(
                "{}\n{}\n",
                serde_json::to_string(&CacheRecord::new("א", "A")).unwrap(),
                serde_json::to_string(&CacheRecord::new("ב", "B")).unwrap()
            ),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let workflow = workflow_with(MockTranslator::new(), dir.path());

        let collections = workflow.list_collections().await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].name, "a");
        assert_eq!(collections[0].records, 2);

        let records = workflow.collection_records("a").await.unwrap();
        assert_eq!(records[1].translation, "B");
        assert!(matches!(
            workflow.collection_records("missing").await,
            Err(AlignError::Cache(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_inspection_without_translator() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lecture_7.jsonl"),
            format!("{}\n", serde_json::to_string(&CacheRecord::new("שבוע טוב", "Good week")).unwrap()),
        )
        .unwrap();

        // an OpenAI config with no key would fail Workflow::new, inspection must not need it
        let mut config = Config::default();
        config.cache.dir = dir.path().to_path_buf();
        config.translate.provider = crate::config::TranslationProvider::OpenAi;
        config.translate.api_key_env = Some("BITEXT_ALIGN_TEST_UNSET_KEY".to_string());
        assert!(Workflow::new(config.clone()).is_err());

        let collections = list_collections(&config.cache.dir).await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].name, "lecture_7");

        let records = collection_records(&config.cache.dir, "lecture 7").await.unwrap();
        assert_eq!(records[0].translation, "Good week");
    }

    #[tokio::test]
    async fn test_score_pair_error_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow_with(translator_failing_on("שגיאה"), dir.path());

        assert!(matches!(
            workflow.score_pair("x", "שגיאה", "1").await,
            Err(AlignError::Translation(_))
        ));
    }
}
