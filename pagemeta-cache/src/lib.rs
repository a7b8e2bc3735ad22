//! Content-addressed metadata cache with a validity window.
//!
//! Each looked-up URL maps to one `<digest>.json` entry. An entry older than
//! the window is *expired*: the caller should refresh it, but the stale
//! record stays readable until it is overwritten.
//!
//! Storage sits behind [`CacheStore`] so the lookup flow can be tested
//! against [`MemoryCache`] with controlled timestamps, while the binary uses
//! [`FileCache`] where the file's modification time is the write time.
//!
//! ```
//! use pagemeta_cache::{CacheKey, MemoryCache, MetaCache, DEFAULT_MAX_AGE};
//! use pagemeta_common::MetadataRecord;
//!
//! let cache = MetaCache::new(MemoryCache::default());
//! let key = CacheKey::for_url("http://example.com/");
//! assert!(cache.is_expired(&key, DEFAULT_MAX_AGE));
//!
//! let record = MetadataRecord { title: "Example Domain".into(), ..Default::default() };
//! cache.store(&key, &record).unwrap();
//! assert_eq!(cache.load(&key).unwrap(), Some(record));
//! assert!(!cache.is_expired(&key, DEFAULT_MAX_AGE));
//! ```

use pagemeta_common::MetadataRecord;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Entries older than this are refreshed on the next lookup.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(90 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("cache entry {key} is not a valid record: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage name of one entry: 32 lowercase hex characters plus `.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Digest of the exact URL string; callers pass the normalized form so
    /// `example.com` and `http://example.com/` share an entry.
    pub fn for_url(url: &str) -> Self {
        let digest = blake3::hash(url.as_bytes());
        Self(format!("{}.json", hex::encode(&digest.as_bytes()[..16])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte-level storage with per-entry write times.
pub trait CacheStore {
    fn exists(&self, key: &CacheKey) -> bool;

    /// `Ok(None)` when there is no entry.
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;

    /// When the entry was last written, `None` when it does not exist.
    fn written_at(&self, key: &CacheKey) -> Option<SystemTime>;

    /// True when the entry is missing or older than `max_age`. A write time
    /// in the future counts as fresh.
    fn is_expired(&self, key: &CacheKey, max_age: Duration) -> bool {
        match self.written_at(key) {
            None => true,
            Some(at) => SystemTime::now()
                .duration_since(at)
                .map(|age| age > max_age)
                .unwrap_or(false),
        }
    }
}

// ==============================
// Directory-backed store
// ==============================

/// One file per entry inside a directory, created on first write.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }
}

impl CacheStore for FileCache {
    fn exists(&self, key: &CacheKey) -> bool {
        self.path_for(key).is_file()
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let io_err = |source: io::Error| CacheError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // readers never see a half-written entry
        let tmp = self.dir.join(format!("{}.tmp", key.as_str()));
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, self.path_for(key)).map_err(io_err)?;
        Ok(())
    }

    fn written_at(&self, key: &CacheKey) -> Option<SystemTime> {
        fs::metadata(self.path_for(key))
            .and_then(|meta| meta.modified())
            .ok()
    }
}

// ==============================
// In-memory store
// ==============================

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, (Vec<u8>, SystemTime)>>,
}

impl MemoryCache {
    /// Insert with an explicit write time, e.g. to simulate an old entry.
    pub fn insert_at(&self, key: &CacheKey, bytes: &[u8], at: SystemTime) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(key.clone(), (bytes.to_vec(), at));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn exists(&self, key: &CacheKey) -> bool {
        self.written_at(key).is_some()
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).map(|(bytes, _)| bytes.clone()))
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        self.insert_at(key, bytes, SystemTime::now());
        Ok(())
    }

    fn written_at(&self, key: &CacheKey) -> Option<SystemTime> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.get(key).map(|(_, at)| *at)
    }
}

// ==============================
// Typed layer
// ==============================

/// [`MetadataRecord`] (de)serialization on top of a [`CacheStore`].
#[derive(Debug)]
pub struct MetaCache<S> {
    store: S,
}

impl<S: CacheStore> MetaCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store_ref(&self) -> &S {
        &self.store
    }

    pub fn exists(&self, key: &CacheKey) -> bool {
        self.store.exists(key)
    }

    pub fn is_expired(&self, key: &CacheKey, max_age: Duration) -> bool {
        self.store.is_expired(key, max_age)
    }

    pub fn load(&self, key: &CacheKey) -> Result<Option<MetadataRecord>, CacheError> {
        let Some(bytes) = self.store.get(key)? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes).map_err(|source| CacheError::Json {
            key: key.to_string(),
            source,
        })?;
        tracing::debug!(key = %key, "cache.load");
        Ok(Some(record))
    }

    pub fn store(&self, key: &CacheKey, record: &MetadataRecord) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(record).map_err(|source| CacheError::Json {
            key: key.to_string(),
            source,
        })?;
        self.store.put(key, &bytes)?;
        tracing::debug!(key = %key, bytes = bytes.len(), "cache.store");
        Ok(())
    }
}
