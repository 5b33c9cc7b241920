//! Persistent description cache keyed by the verbatim SMILES string.
//!
//! Entries are written once and never updated. When two writers race on the
//! same key the first committed entry wins.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use polyprop_core::PropertySet;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CacheError, CacheResult};

/// A stored description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub smiles: String,
    pub description: String,
    pub properties: PropertySet,

    /// Version of the model artifacts that produced `properties`.
    #[serde(default)]
    pub model_version: String,

    pub created_at: SystemTime,
}

impl CachedEntry {
    pub fn new(
        smiles: impl Into<String>,
        description: impl Into<String>,
        properties: PropertySet,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            smiles: smiles.into(),
            description: description.into(),
            properties,
            model_version: model_version.into(),
            created_at: SystemTime::now(),
        }
    }
}

/// Result of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Committed,
    /// An entry for the key already existed and was kept.
    AlreadyPresent,
}

/// Storage backend for descriptions.
#[async_trait]
pub trait DescriptionCache: Send + Sync {
    async fn lookup(&self, smiles: &str) -> CacheResult<Option<CachedEntry>>;

    /// Store `entry` unless its key is already present.
    async fn insert(&self, entry: CachedEntry) -> CacheResult<InsertOutcome>;

    async fn len(&self) -> CacheResult<usize>;
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local cache, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryDescriptionCache {
    entries: DashMap<String, CachedEntry>,
}

impl MemoryDescriptionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DescriptionCache for MemoryDescriptionCache {
    async fn lookup(&self, smiles: &str) -> CacheResult<Option<CachedEntry>> {
        Ok(self.entries.get(smiles).map(|e| e.value().clone()))
    }

    async fn insert(&self, entry: CachedEntry) -> CacheResult<InsertOutcome> {
        Ok(match self.entries.entry(entry.smiles.clone()) {
            Entry::Occupied(_) => InsertOutcome::AlreadyPresent,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                InsertOutcome::Committed
            }
        })
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.len())
    }
}

// =============================================================================
// Append-only JSON lines file
// =============================================================================

/// File-backed cache: one JSON object per line, indexed in memory on open.
#[derive(Debug)]
pub struct FileDescriptionCache {
    path: PathBuf,
    index: DashMap<String, CachedEntry>,
    /// Held across appends; `true` while the file ends mid-line.
    writer: Mutex<bool>,
}

impl FileDescriptionCache {
    /// Open (or create) the cache file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(parent, e))?;
        }

        let index = DashMap::new();
        let mut torn_tail = false;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                torn_tail = !text.is_empty() && !text.ends_with('\n');
                for (number, line) in text.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<CachedEntry>(line) {
                        Ok(entry) => {
                            // Earlier lines win, matching insert semantics.
                            index.entry(entry.smiles.clone()).or_insert(entry);
                        }
                        Err(e) => warn!(
                            path = %path.display(),
                            line = number + 1,
                            error = %e,
                            "Skipping unreadable cache line"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Cache file does not exist yet");
            }
            Err(e) => return Err(CacheError::io(&path, e)),
        }

        info!(path = %path.display(), entries = index.len(), "description_cache_opened");
        Ok(Self {
            path,
            index,
            writer: Mutex::new(torn_tail),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DescriptionCache for FileDescriptionCache {
    async fn lookup(&self, smiles: &str) -> CacheResult<Option<CachedEntry>> {
        Ok(self.index.get(smiles).map(|e| e.value().clone()))
    }

    async fn insert(&self, entry: CachedEntry) -> CacheResult<InsertOutcome> {
        let mut torn_tail = self.writer.lock().await;
        if self.index.contains_key(&entry.smiles) {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let mut line = String::new();
        if *torn_tail {
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(&entry)?);
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;
        let committed_len = file
            .metadata()
            .await
            .map_err(|e| CacheError::io(&self.path, e))?
            .len();

        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Drop the partial line; if that fails too, the next append starts fresh.
            if let Err(rollback) = file.set_len(committed_len).await {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "description_cache_rollback_failed"
                );
                *torn_tail = true;
            }
            return Err(CacheError::io(&self.path, e));
        }
        *torn_tail = false;

        self.index.insert(entry.smiles.clone(), entry);
        Ok(InsertOutcome::Committed)
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn props() -> PropertySet {
        PropertySet {
            density: 1.0,
            refractive_index: 1.5,
            dielectric_const_dc: 3.0,
            thermal_conductivity: 0.2,
        }
    }

    #[tokio::test]
    async fn memory_cache_keeps_first_entry() {
        let cache = MemoryDescriptionCache::new();
        let first = CachedEntry::new("CCO", "first", props(), "v1");
        let second = CachedEntry::new("CCO", "second", props(), "v1");

        assert_eq!(cache.insert(first).await.unwrap(), InsertOutcome::Committed);
        assert_eq!(
            cache.insert(second).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        let stored = cache.lookup("CCO").await.unwrap().unwrap();
        assert_eq!(stored.description, "first");
    }

    #[tokio::test]
    async fn lookup_is_exact_match() {
        let cache = MemoryDescriptionCache::new();
        cache
            .insert(CachedEntry::new("OCC", "ethanol", props(), "v1"))
            .await
            .unwrap();
        assert!(cache.lookup("CCO").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_cache_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache").join("descriptions.jsonl");

        let cache = FileDescriptionCache::open(&path).await.unwrap();
        cache
            .insert(CachedEntry::new("*CC(*)C", "Polypropylene.", props(), "v2"))
            .await
            .unwrap();
        drop(cache);

        let reopened = FileDescriptionCache::open(&path).await.unwrap();
        let entry = reopened.lookup("*CC(*)C").await.unwrap().unwrap();
        assert_eq!(entry.description, "Polypropylene.");
        assert_eq!(entry.model_version, "v2");
        assert_eq!(entry.properties, props());
    }

    #[tokio::test]
    async fn file_cache_first_write_wins_on_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("descriptions.jsonl");
        let cache = FileDescriptionCache::open(&path).await.unwrap();

        cache
            .insert(CachedEntry::new("C", "one", props(), "v"))
            .await
            .unwrap();
        let outcome = cache
            .insert(CachedEntry::new("C", "two", props(), "v"))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyPresent);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn unreadable_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("descriptions.jsonl");
        let good = serde_json::to_string(&CachedEntry::new("N", "ammonia", props(), "v")).unwrap();
        std::fs::write(&path, format!("{{broken\n{good}\n\n")).unwrap();

        let cache = FileDescriptionCache::open(&path).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 1);
        assert!(cache.lookup("N").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn append_after_torn_line_starts_fresh() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("descriptions.jsonl");
        let good = serde_json::to_string(&CachedEntry::new("N", "ammonia", props(), "v")).unwrap();
        // A crash mid-append leaves a fragment with no trailing newline.
        std::fs::write(&path, format!("{good}\n{{\"smiles\":\"CC")).unwrap();

        let cache = FileDescriptionCache::open(&path).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 1);
        cache
            .insert(CachedEntry::new("CCO", "ethanol", props(), "v"))
            .await
            .unwrap();
        drop(cache);

        let reopened = FileDescriptionCache::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 2);
        let entry = reopened.lookup("CCO").await.unwrap().unwrap();
        assert_eq!(entry.description, "ethanol");
        assert!(std::fs::read_to_string(&path).unwrap().ends_with('\n'));
    }
}
