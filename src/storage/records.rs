//! Record store for JSON storage
//!
//! Keeps the whole record collection in memory and rewrites the backing
//! file in full on every mutation. There are no partial or delta writes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CaseError, CaseResult};
use crate::models::{Document, Record};

use super::file_io::{ensure_parent_dir, read_json_opt, write_json_atomic};
use super::lock::FileLock;
use super::RecordRepository;

/// Current on-disk document version
pub const SCHEMA_VERSION: u32 = 1;

/// Serialized form written to the backing file
#[derive(Serialize)]
struct RecordData<'a, R> {
    schema_version: u32,
    records: &'a [R],
}

/// Accepted on load: the versioned document or a bare array of records
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredRecords<R> {
    Versioned {
        #[serde(default)]
        #[allow(dead_code)]
        schema_version: u32,
        records: Vec<R>,
    },
    Bare(Vec<R>),
}

impl<R> StoredRecords<R> {
    pub(crate) fn into_records(self) -> Vec<R> {
        match self {
            Self::Versioned { records, .. } => records,
            Self::Bare(records) => records,
        }
    }
}

/// Whole-file JSON record store with an in-memory cache
pub struct RecordStore<R = Record> {
    path: PathBuf,
    records: RwLock<Vec<R>>,
    file_lock: FileLock,
}

impl<R: Document> RecordStore<R> {
    /// Open a store backed by `path`
    ///
    /// Creates the parent directory if missing. The file itself is not read
    /// until [`load_all`](Self::load_all).
    pub fn open(path: impl Into<PathBuf>) -> CaseResult<Self> {
        let path = path.into();

        ensure_parent_dir(&path)?;

        Ok(Self {
            path,
            records: RwLock::new(Vec::new()),
            file_lock: FileLock::new(),
        })
    }

    /// Use a lock shared with other users of the same file
    pub fn with_file_lock(mut self, file_lock: FileLock) -> Self {
        self.file_lock = file_lock;
        self
    }

    /// Path to the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock guarding the backing file, for sharing with a backup scheduler
    pub fn file_lock(&self) -> FileLock {
        self.file_lock.clone()
    }

    /// Read the backing file and replace the cache with its content
    ///
    /// A missing file is the initial state and yields an empty collection.
    pub fn load_all(&self) -> CaseResult<Vec<R>> {
        let mut cache = self.write_cache()?;

        let stored = {
            let _guard = self.file_lock.acquire()?;
            read_json_opt::<StoredRecords<R>, _>(&self.path)?
        };

        *cache = stored.map(StoredRecords::into_records).unwrap_or_default();
        debug!(path = %self.path.display(), count = cache.len(), "Loaded records");

        Ok(cache.clone())
    }

    /// Resynchronize the cache with the backing file
    pub fn refresh(&self) -> CaseResult<Vec<R>> {
        self.load_all()
    }

    /// Look up a record in the cache
    pub fn find_by_id(&self, id: &str) -> Option<R> {
        if id.trim().is_empty() {
            return None;
        }
        self.read_cache().iter().find(|r| r.id() == id).cloned()
    }

    /// Whether a record with this id is cached
    pub fn contains(&self, id: &str) -> bool {
        self.find_by_id(id).is_some()
    }

    /// All cached records, in stored order
    pub fn all(&self) -> Vec<R> {
        self.read_cache().clone()
    }

    /// Insert or replace a record, then persist the whole collection
    ///
    /// A record whose id already exists replaces it in place. If the write
    /// fails the cache keeps the new record and the error is returned.
    pub fn save(&self, record: R) -> CaseResult<()> {
        if record.id().trim().is_empty() {
            return Err(CaseError::Validation("Record id cannot be blank".into()));
        }

        let mut cache = self.write_cache()?;

        match cache.iter().position(|r| r.id() == record.id()) {
            Some(index) => cache[index] = record,
            None => cache.push(record),
        }

        self.persist(&cache)
    }

    /// Remove every record with this id
    ///
    /// Returns whether anything was removed; the file is only rewritten then.
    pub fn delete(&self, id: &str) -> CaseResult<bool> {
        let mut cache = self.write_cache()?;

        let before = cache.len();
        cache.retain(|r| r.id() != id);

        if cache.len() == before {
            return Ok(false);
        }

        self.persist(&cache)?;
        Ok(true)
    }

    /// Remove every record whose id is in `ids`, with a single flush
    pub fn batch_delete<I, S>(&self, ids: I) -> CaseResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: HashSet<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut cache = self.write_cache()?;

        let before = cache.len();
        cache.retain(|r| !ids.contains(r.id()));
        let removed = before - cache.len();

        if removed > 0 {
            self.persist(&cache)?;
        }

        Ok(removed)
    }

    /// Number of cached records
    pub fn count(&self) -> usize {
        self.read_cache().len()
    }

    /// Remove all records and persist the empty collection
    pub fn clear(&self) -> CaseResult<()> {
        let mut cache = self.write_cache()?;
        cache.clear();
        self.persist(&cache)
    }

    fn persist(&self, records: &[R]) -> CaseResult<()> {
        let data = RecordData {
            schema_version: SCHEMA_VERSION,
            records,
        };

        let _guard = self.file_lock.acquire()?;
        write_json_atomic(&self.path, &data)?;
        debug!(path = %self.path.display(), count = records.len(), "Flushed records");
        Ok(())
    }

    // Lookups have no error channel and read whatever the cache holds
    fn read_cache(&self) -> RwLockReadGuard<'_, Vec<R>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> CaseResult<RwLockWriteGuard<'_, Vec<R>>> {
        self.records
            .write()
            .map_err(|e| CaseError::Storage(format!("Failed to acquire write lock: {}", e)))
    }
}

impl<R: Document> RecordRepository<R> for RecordStore<R> {
    fn load_all(&self) -> CaseResult<Vec<R>> {
        RecordStore::load_all(self)
    }

    fn find_by_id(&self, id: &str) -> Option<R> {
        RecordStore::find_by_id(self, id)
    }

    fn save(&self, record: R) -> CaseResult<()> {
        RecordStore::save(self, record)
    }

    fn delete(&self, id: &str) -> CaseResult<bool> {
        RecordStore::delete(self, id)
    }
}
