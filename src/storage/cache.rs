//! TTL cache for fetched data.
//!
//! Every upstream fetch (warehouse query, Dune results, Axelarscan stats)
//! goes through [`FetchCache`] with an explicit per-source TTL. Entries are
//! JSON files keyed by a digest of the source name and request parameters,
//! so two call sites issuing the same request share one entry.
//!
//! # Features
//! - Atomic writes using temp file + rename (prevents corruption)
//! - Explicit TTL stored inside each entry
//! - Graceful degradation on missing/corrupt cache

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::storage::paths::AppPaths;

/// TTL for Dune TVL results.
pub const TTL_DUNE_TVL_SECS: u64 = 3600;
/// TTL for Dune platform-activity results.
pub const TTL_DUNE_PLATFORMS_SECS: u64 = 600;
/// TTL for warehouse query results.
pub const TTL_WAREHOUSE_SECS: u64 = 3600;
/// TTL for Axelarscan GMP stats.
pub const TTL_AXELARSCAN_SECS: u64 = 3600;

/// Identifies one cacheable request: a source name plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    source: String,
    params: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(source: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            params: params.into(),
        }
    }

    /// Stable file name: `<source>-<first 16 hex of sha256(params)>.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let digest = Sha256::digest(self.params.as_bytes());
        format!("{}-{}.json", self.source, &hex::encode(digest)[..16])
    }
}

/// One cache entry with its payload and expiry metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl<T> CacheEntry<T> {
    /// Age of the entry.
    #[must_use]
    pub fn age(&self) -> Duration {
        let age = Utc::now() - self.fetched_at;
        Duration::from_secs(u64::try_from(age.num_seconds()).unwrap_or(0))
    }

    /// Whether the entry is still within its TTL.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.age().as_secs() <= self.ttl_seconds
    }
}

/// File-backed TTL cache.
pub struct FetchCache {
    cache_dir: PathBuf,
}

impl FetchCache {
    /// Cache rooted at the application cache directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dir(AppPaths::new().fetch_cache_dir())
    }

    /// Cache rooted at a specific directory (useful for tests).
    #[must_use]
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!("Failed to create fetch cache dir: {}", e);
        }
        Self { cache_dir }
    }

    /// Path for a cache key.
    #[must_use]
    pub fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    /// Read a fresh entry's value; `None` on missing, corrupt, or expired.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = self.get_entry(key)?;
        if entry.is_fresh() { Some(entry.value) } else { None }
    }

    /// Read an entry regardless of freshness.
    pub fn get_entry<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let content = std::fs::read_to_string(self.cache_path(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Store a value with an explicit TTL.
    ///
    /// # Errors
    ///
    /// Returns an IO or serialization error from the atomic write.
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_seconds: u64) -> Result<()> {
        let entry = CacheEntry {
            value,
            fetched_at: Utc::now(),
            ttl_seconds,
        };
        write(&self.cache_path(key), &entry)
    }

    /// Fetch through the cache: return the fresh cached value, or run
    /// `fetch`, store its result for `ttl_seconds`, and return it. A cache
    /// write failure is logged, not fatal; the fetched value still flows.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error on a cache miss.
    pub fn get_or_fetch<T, F>(&self, key: &CacheKey, ttl_seconds: u64, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(source = %key.source, "cache hit");
            return Ok(value);
        }
        let value = fetch()?;
        if let Err(e) = self.put(key, &value, ttl_seconds) {
            tracing::warn!("Failed to write cache entry: {}", e);
        }
        Ok(value)
    }

    /// Remove one entry.
    ///
    /// # Errors
    ///
    /// Returns an IO error when deletion fails.
    pub fn clear(&self, key: &CacheKey) -> Result<()> {
        let path = self.cache_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Remove every entry in the cache directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error when deletion fails.
    pub fn clear_all(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.cache_dir)?.filter_map(std::result::Result::ok) {
            if entry.path().extension() == Some("json".as_ref()) {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Write data to cache atomically.
/// Uses temp file + rename to prevent corruption.
fn write<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string(data)?;
    write_atomic(path, content.as_bytes())?;
    Ok(())
}

/// Write bytes atomically using temp file + rename.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Temp file must live in the same directory for the rename to be atomic.
    let parent = path.parent().unwrap_or(Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("cache"),
        std::process::id()
    ));

    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        value: String,
        count: i32,
    }

    fn sample() -> TestData {
        TestData {
            value: "hello".to_string(),
            count: 42,
        }
    }

    #[test]
    fn key_file_name_is_stable_and_param_sensitive() {
        let a = CacheKey::new("dune_tvl", "query=5524904");
        let b = CacheKey::new("dune_tvl", "query=5524904");
        let c = CacheKey::new("dune_tvl", "query=5575605");

        assert_eq!(a.file_name(), b.file_name());
        assert_ne!(a.file_name(), c.file_name());
        assert!(a.file_name().starts_with("dune_tvl-"));
        assert!(a.file_name().ends_with(".json"));
    }

    #[test]
    fn put_then_get_round_trip() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::with_dir(tmp.path().to_path_buf());
        let key = CacheKey::new("test", "params");

        cache.put(&key, &sample(), 60).unwrap();
        let read: TestData = cache.get(&key).unwrap();
        assert_eq!(read, sample());
    }

    #[test]
    fn expired_entry_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::with_dir(tmp.path().to_path_buf());
        let key = CacheKey::new("test", "params");

        // Backdate the entry past its TTL.
        let entry = CacheEntry {
            value: sample(),
            fetched_at: Utc::now() - ChronoDuration::seconds(120),
            ttl_seconds: 60,
        };
        write(&cache.cache_path(&key), &entry).unwrap();

        assert!(cache.get::<TestData>(&key).is_none());
        // The stale entry is still readable explicitly.
        assert!(cache.get_entry::<TestData>(&key).is_some());
    }

    #[test]
    fn corrupt_entry_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::with_dir(tmp.path().to_path_buf());
        let key = CacheKey::new("test", "params");

        std::fs::write(cache.cache_path(&key), "{not json").unwrap();
        assert!(cache.get::<TestData>(&key).is_none());
    }

    #[test]
    fn get_or_fetch_skips_fetch_on_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::with_dir(tmp.path().to_path_buf());
        let key = CacheKey::new("test", "params");

        let fetched: TestData = cache.get_or_fetch(&key, 60, || Ok(sample())).unwrap();
        assert_eq!(fetched, sample());

        let cached: TestData = cache
            .get_or_fetch(&key, 60, || panic!("fetch must not run on a fresh entry"))
            .unwrap();
        assert_eq!(cached, sample());
    }

    #[test]
    fn get_or_fetch_propagates_fetch_error() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::with_dir(tmp.path().to_path_buf());
        let key = CacheKey::new("test", "params");

        let result: Result<TestData> = cache.get_or_fetch(&key, 60, || {
            Err(crate::error::AxlensError::Network("down".to_string()))
        });
        assert!(result.is_err());
        assert!(cache.get::<TestData>(&key).is_none());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("atomic.json");

        write_atomic(&path, b"test content").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "test content");

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn clear_and_clear_all() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::with_dir(tmp.path().to_path_buf());
        let a = CacheKey::new("a", "1");
        let b = CacheKey::new("b", "2");

        cache.put(&a, &sample(), 60).unwrap();
        cache.put(&b, &sample(), 60).unwrap();

        cache.clear(&a).unwrap();
        assert!(cache.get::<TestData>(&a).is_none());
        assert!(cache.get::<TestData>(&b).is_some());

        cache.clear_all().unwrap();
        assert!(cache.get::<TestData>(&b).is_none());
    }
}
