//! Content-addressed translation cache.
//!
//! One [`CacheScope`] per collection (e.g. one lecture). A scope loaded from
//! its persisted JSONL store is read-only; a scope with no store on disk is
//! writable and can be promoted to durable storage with [`CacheScope::flush`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Result;

const STORE_EXTENSION: &str = "jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    #[serde(alias = "sourceText", alias = "text")]
    pub source: String,
    #[serde(alias = "translatedText")]
    pub translation: String,
}

impl CacheRecord {
    pub fn new(source: &str, translation: &str) -> Self {
        Self {
            key: cache_key(source),
            source: source.to_string(),
            translation: translation.to_string(),
        }
    }
}

/// Fingerprint of the source text: base64 of its UTF-8 bytes.
pub fn cache_key(source_text: &str) -> String {
    STANDARD.encode(source_text.as_bytes())
}

/// Store file name for a collection; anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn store_file_name(collection_id: &str) -> String {
    let stem: String = collection_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    format!("{}.{}", stem, STORE_EXTENSION)
}

#[derive(Debug, Default)]
struct ScopeRecords {
    records: Vec<CacheRecord>,
    index: HashMap<String, usize>,
    unflushed: usize,
}

impl ScopeRecords {
    fn insert(&mut self, record: CacheRecord) -> bool {
        if self.index.contains_key(&record.key) {
            return false;
        }
        self.index.insert(record.key.clone(), self.records.len());
        self.records.push(record);
        true
    }
}

/// In-memory records of one collection.
#[derive(Debug)]
pub struct CacheScope {
    collection_id: String,
    store_path: PathBuf,
    persistent: bool,
    inner: RwLock<ScopeRecords>,
}

impl CacheScope {
    /// Empty writable scope; nothing is read from disk.
    pub fn ephemeral(collection_id: &str, store_path: PathBuf) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            store_path,
            persistent: false,
            inner: RwLock::new(ScopeRecords::default()),
        }
    }

    /// Load the store at `store_path`. A missing or unreadable store yields an
    /// empty writable scope; malformed lines (bad JSON or bad UTF-8) are skipped.
    pub async fn load(collection_id: &str, store_path: PathBuf) -> Self {
        let content = match fs::read(&store_path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    info!(
                        "No translation cache for collection '{}', every text is a cache miss",
                        collection_id
                    );
                } else {
                    warn!(
                        "Failed to read translation cache {}: {}; continuing with an empty cache",
                        store_path.display(),
                        e
                    );
                }
                return Self::ephemeral(collection_id, store_path);
            }
        };

        let mut records = ScopeRecords::default();
        let mut skipped = 0;
        for (line_no, line) in content.split(|&b| b == b'\n').enumerate() {
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<CacheRecord>(line) {
                Ok(record) => {
                    records.insert(record);
                }
                Err(e) => {
                    skipped += 1;
                    debug!("Skipping malformed cache line {}: {}", line_no + 1, e);
                }
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} malformed lines in {}",
                skipped,
                store_path.display()
            );
        }
        info!(
            "Loaded {} cached translations for collection '{}' (read-only)",
            records.records.len(),
            collection_id
        );

        Self {
            collection_id: collection_id.to_string(),
            store_path,
            persistent: true,
            inner: RwLock::new(records),
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records added since the scope was created or last flushed.
    pub fn unflushed(&self) -> usize {
        self.inner.read().unflushed
    }

    pub fn get(&self, key: &str) -> Option<CacheRecord> {
        let inner = self.inner.read();
        inner.index.get(key).map(|&i| inner.records[i].clone())
    }

    /// Insert if the scope is writable and the key is new. Returns whether
    /// the record was stored.
    pub fn put(&self, record: CacheRecord) -> bool {
        if self.persistent {
            debug!(
                "Cache for collection '{}' is read-only, not storing {}",
                self.collection_id, record.key
            );
            return false;
        }
        let mut inner = self.inner.write();
        let inserted = inner.insert(record);
        if inserted {
            inner.unflushed += 1;
        }
        inserted
    }

    pub fn records(&self) -> Vec<CacheRecord> {
        self.inner.read().records.clone()
    }

    /// Write every record to the store, one JSON object per line. Persistent
    /// and empty scopes are left untouched. Returns the number of records
    /// written.
    pub async fn flush(&self) -> Result<usize> {
        if self.persistent {
            debug!("Collection '{}' is already persisted, nothing to flush", self.collection_id);
            return Ok(0);
        }

        let (content, count) = {
            let inner = self.inner.read();
            let mut content = String::new();
            for record in &inner.records {
                content.push_str(&serde_json::to_string(record)?);
                content.push('\n');
            }
            (content, inner.records.len())
        };

        if count == 0 {
            debug!("Collection '{}' has no translations to flush", self.collection_id);
            return Ok(0);
        }

        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.store_path.with_extension(format!("{}.tmp", STORE_EXTENSION));
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.store_path).await?;

        {
            let mut inner = self.inner.write();
            inner.unflushed = inner.records.len() - count;
        }
        info!(
            "Flushed {} translations for collection '{}' to {}",
            count,
            self.collection_id,
            self.store_path.display()
        );
        Ok(count)
    }
}

/// Holds the single active [`CacheScope`] and the directory of persisted stores.
#[derive(Debug)]
pub struct TranslationCache {
    dir: PathBuf,
    active: Mutex<Option<Arc<CacheScope>>>,
}

impl TranslationCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            active: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store_path(&self, collection_id: &str) -> PathBuf {
        self.dir.join(store_file_name(collection_id))
    }

    /// The active scope, if any collection has been loaded.
    pub fn active(&self) -> Option<Arc<CacheScope>> {
        self.active.lock().clone()
    }

    /// Make `collection_id` the active scope, loading it unless it already is.
    /// The previous scope's in-memory records are discarded.
    pub async fn load(&self, collection_id: &str) -> Arc<CacheScope> {
        if let Some(scope) = self.active() {
            if scope.collection_id() == collection_id {
                return scope;
            }
        }

        let scope = Arc::new(CacheScope::load(collection_id, self.store_path(collection_id)).await);

        let mut active = self.active.lock();
        // Another task may have loaded the same collection while we were reading.
        if let Some(current) = active.as_ref() {
            if current.collection_id() == collection_id {
                return current.clone();
            }
            if current.unflushed() > 0 {
                warn!(
                    "Discarding {} unflushed translations for collection '{}'",
                    current.unflushed(),
                    current.collection_id()
                );
            }
        }
        *active = Some(scope.clone());
        scope
    }

    /// Flush the active scope. Returns 0 when no scope is active.
    pub async fn flush(&self) -> Result<usize> {
        match self.active() {
            Some(scope) => scope.flush().await,
            None => Ok(0),
        }
    }
}
