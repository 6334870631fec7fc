//! Compiled-asset cache.
//!
//! Maps a [`CacheKey`] (input content + filter chain identity) to compiled
//! output bytes. Storage failures never fail a dump: [`CompiledCache`] logs
//! the first error and degrades to a permanent miss.

mod key;

pub use key::CacheKey;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use thiserror::Error;

use crate::config::PipelineOptions;
use crate::utils::fs::write_atomic;

/// Cache storage failure. Always recovered inside [`CompiledCache`].
#[derive(Debug, Error)]
#[error("cache I/O error at `{}`", .path.display())]
pub struct CacheError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl CacheError {
    fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Raw storage for compiled output.
pub trait CacheStore: Send + Sync {
    /// Read the entry for `key`; `Ok(None)` is a miss.
    fn lookup(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write the entry for `key`. Repeated stores of one key must be safe.
    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;
}

// ============================================================================
// FilesystemCache
// ============================================================================

/// One file per key: `<dir>/<hex[..2]>/<hex>`.
#[derive(Debug, Clone)]
pub struct FilesystemCache {
    dir: PathBuf,
}

impl FilesystemCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let hex = key.to_hex();
        self.dir.join(&hex[..2]).join(hex)
    }
}

impl CacheStore for FilesystemCache {
    fn lookup(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::new(path, e)),
        }
    }

    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::new(parent, e))?;
        }
        write_atomic(&path, bytes).map_err(|e| CacheError::new(path, e))
    }
}

// ============================================================================
// CompiledCache
// ============================================================================

/// Fail-safe wrapper over a [`CacheStore`].
pub struct CompiledCache {
    store: Box<dyn CacheStore>,
    degraded: AtomicBool,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl CompiledCache {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            degraded: AtomicBool::new(false),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Filesystem cache for the options, or `None` when caching is off
    /// (debug mode, or no cache directory configured).
    pub fn from_options(options: &PipelineOptions) -> Option<Self> {
        if options.debug {
            return None;
        }
        let dir = options.formulae_cache_dir.as_ref()?;
        crate::debug!("cache"; "using {}", dir.display());
        Some(Self::new(FilesystemCache::new(dir)))
    }

    /// Cached bytes for `key`, or `None` on a miss.
    ///
    /// Never runs filters. After a storage error every lookup misses.
    pub fn lookup(&self, key: &CacheKey) -> Option<Vec<u8>> {
        if self.is_degraded() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        match self.store.lookup(key) {
            Ok(Some(bytes)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(bytes)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.degrade(&e);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store compiled bytes; errors degrade the cache instead of failing.
    pub fn store(&self, key: &CacheKey, bytes: &[u8]) {
        if self.is_degraded() {
            return;
        }
        if let Err(e) = self.store.store(key, bytes) {
            self.degrade(&e);
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    fn degrade(&self, error: &CacheError) {
        // Log only on the transition so a broken cache dir is reported once
        if !self.degraded.swap(true, Ordering::AcqRel) {
            crate::log!("cache"; "{}: {}, recompiling without cache", error, error.source);
        }
    }
}

impl std::fmt::Debug for CompiledCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCache")
            .field("degraded", &self.is_degraded())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filesystem_store_and_lookup() {
        let dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(dir.path());
        let key = CacheKey::new([7; 32]);

        assert!(cache.lookup(&key).unwrap().is_none());
        cache.store(&key, b"compiled").unwrap();
        assert_eq!(cache.lookup(&key).unwrap().unwrap(), b"compiled");

        // Idempotent overwrite
        cache.store(&key, b"compiled").unwrap();
        assert!(cache.entry_path(&key).starts_with(dir.path().join("07")));
    }

    #[test]
    fn test_compiled_cache_counts() {
        let dir = TempDir::new().unwrap();
        let cache = CompiledCache::new(FilesystemCache::new(dir.path()));
        let key = CacheKey::new([1; 32]);

        assert!(cache.lookup(&key).is_none());
        cache.store(&key, b"x");
        assert_eq!(cache.lookup(&key).unwrap(), b"x");
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn test_io_error_degrades_to_miss() {
        let dir = TempDir::new().unwrap();
        // A regular file where the cache directory should be
        let blocker = dir.path().join("cache");
        fs::write(&blocker, "not a dir").unwrap();

        let cache = CompiledCache::new(FilesystemCache::new(&blocker));
        let key = CacheKey::new([2; 32]);

        cache.store(&key, b"x");
        assert!(cache.is_degraded());
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn test_from_options() {
        let dir = TempDir::new().unwrap();
        let mut options = PipelineOptions::default();
        assert!(CompiledCache::from_options(&options).is_none());

        options.formulae_cache_dir = Some(dir.path().to_path_buf());
        assert!(CompiledCache::from_options(&options).is_some());

        options.debug = true;
        assert!(CompiledCache::from_options(&options).is_none());
    }
}
