//! Persistent storage backends for the offline message cache
//!
//! Entries are stored as JSON records of the dictionary plus a creation
//! timestamp in epoch milliseconds. A record that fails to parse is treated
//! as absent rather than as an error.
//!
//! Backends:
//! - [`MemoryStorage`] - process-local, for tests and short-lived tools
//! - [`FileStorage`] - one JSON file per key in a directory (default)
//! - [`RedisStorage`] - shared Redis instance through a connection pool

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::messages::Messages;

/// A persisted dictionary with its creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedMessages {
    /// The dictionary payload
    pub messages: Messages,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
}

impl CachedMessages {
    /// Wrap `messages` stamped with the current time
    pub fn new(messages: Messages) -> Self {
        Self {
            messages,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Wrap `messages` with an explicit timestamp
    pub fn with_timestamp(messages: Messages, timestamp: i64) -> Self {
        Self {
            messages,
            timestamp,
        }
    }

    /// Age relative to now; entries stamped in the future count as age zero
    pub fn age(&self) -> Duration {
        let elapsed = Utc::now().timestamp_millis() - self.timestamp;
        Duration::from_millis(u64::try_from(elapsed).unwrap_or(0))
    }

    /// Check if the entry is younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Key-value backend for cached dictionaries
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Read an entry; unparsable records read as `None`
    async fn get(&self, key: &str) -> Result<Option<CachedMessages>>;

    /// Write an entry, replacing any previous one
    async fn set(&self, key: &str, entry: &CachedMessages) -> Result<()>;

    /// Delete an entry if present
    async fn remove(&self, key: &str) -> Result<()>;

    /// Delete every entry owned by this backend
    async fn clear(&self) -> Result<()>;
}

fn encode(entry: &CachedMessages) -> Result<String> {
    serde_json::to_string(entry).map_err(|e| Error::storage("serialize", e))
}

fn decode(key: &str, raw: &str) -> Option<CachedMessages> {
    match serde_json::from_str(raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding corrupted cache entry");
            None
        }
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local storage holding serialized records
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw record as-is, bypassing serialization
    pub async fn insert_raw(&self, key: &str, raw: impl Into<String>) {
        self.entries.write().await.insert(key.to_string(), raw.into());
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<CachedMessages>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).and_then(|raw| decode(key, raw)))
    }

    async fn set(&self, key: &str, entry: &CachedMessages) -> Result<()> {
        let raw = encode(entry)?;
        self.entries.write().await.insert(key.to_string(), raw);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

// ============================================================================
// File-system backend
// ============================================================================

/// Directory of JSON records, one file per key
///
/// File names are the SHA-256 of the key so arbitrary keys map to safe names.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for records; it is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_key(key)))
    }
}

/// Hash a cache key for use as a file name
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check if `path` names a record this backend writes
///
/// Records are `<sha256>.json`, plus `<sha256>.json.tmp` left behind by an
/// interrupted write. Anything else in the directory is not ours.
fn is_record_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(stem) = name
        .strip_suffix(".json")
        .or_else(|| name.strip_suffix(".json.tmp"))
    else {
        return false;
    };
    stem.len() == 64 && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[async_trait]
impl CacheStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<CachedMessages>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(decode(key, &raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(format!("read {}", path.display()), e)),
        }
    }

    async fn set(&self, key: &str, entry: &CachedMessages) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::storage(format!("create {}", self.dir.display()), e))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let raw = encode(entry)?;

        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| Error::storage(format!("write {}", tmp.display()), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::storage(format!("rename {}", path.display()), e))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!("remove {}", path.display()), e)),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::storage(format!("list {}", self.dir.display()), e)),
        };

        let mut removed = 0u64;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage("list", e))?
        {
            let path = entry.path();
            if is_record_file(&path) {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|e| Error::storage(format!("remove {}", path.display()), e))?;
                removed += 1;
            }
        }

        tracing::info!(dir = %self.dir.display(), count = removed, "Cleared cached messages");
        Ok(())
    }
}

// ============================================================================
// Redis backend
// ============================================================================

/// Redis backend configuration
#[derive(Debug, Clone)]
pub struct RedisStorageConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for RedisStorageConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 4,
            key_prefix: "tercume".to_string(),
        }
    }
}

/// Redis-backed storage
///
/// Records are written without a server-side expiry; staleness is judged
/// from the stored timestamp so old data remains available offline.
pub struct RedisStorage {
    pool: Pool,
    config: RedisStorageConfig,
}

impl RedisStorage {
    /// Connect and verify the server answers PING
    pub async fn new(config: &RedisStorageConfig) -> Result<Self> {
        let pool = PoolConfig::from_url(&config.url)
            .builder()
            .map_err(|e| Error::storage("connect", e))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| Error::storage("connect", e))?;

        let mut conn = pool.get().await.map_err(|e| Error::storage("connect", e))?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::storage("ping", e))?;

        tracing::info!(url = %config.url, "Connected to Redis");

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::storage("get connection", e))
    }
}

#[async_trait]
impl CacheStorage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<CachedMessages>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(self.redis_key(key))
            .await
            .map_err(|e| Error::storage("get", e))?;
        Ok(raw.and_then(|raw| decode(key, &raw)))
    }

    async fn set(&self, key: &str, entry: &CachedMessages) -> Result<()> {
        let raw = encode(entry)?;
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(self.redis_key(key), raw)
            .await
            .map_err(|e| Error::storage("set", e))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(self.redis_key(key))
            .await
            .map_err(|e| Error::storage("del", e))
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}:*", self.config.key_prefix);

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::storage("scan keys", e))?;

        if keys.is_empty() {
            return Ok(());
        }

        let count = keys.len();
        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| Error::storage("del", e))?;

        tracing::info!(pattern = %pattern, count = count, "Cleared cached messages");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Messages {
        Messages::from_value(json!({"hello": "Merhaba"})).unwrap()
    }

    #[test]
    fn test_freshness() {
        let entry = CachedMessages::new(sample());
        assert!(entry.is_fresh(Duration::from_secs(60)));
        assert!(!entry.is_fresh(Duration::ZERO));

        let old = CachedMessages::with_timestamp(sample(), entry.timestamp - 120_000);
        assert!(!old.is_fresh(Duration::from_secs(60)));
        assert!(old.age() >= Duration::from_secs(120));
    }

    #[test]
    fn test_future_timestamp_is_age_zero() {
        let entry = CachedMessages::with_timestamp(sample(), i64::MAX);
        assert_eq!(entry.age(), Duration::ZERO);
    }

    #[test]
    fn test_record_shape() {
        let entry = CachedMessages::with_timestamp(sample(), 1_700_000_000_000);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"messages": {"hello": "Merhaba"}, "timestamp": 1_700_000_000_000i64})
        );
    }

    #[test]
    fn test_hash_key() {
        assert_eq!(hash_key("a"), hash_key("a"));
        assert_ne!(hash_key("a"), hash_key("b"));
        assert_eq!(hash_key("tercume_messages_tr").len(), 64);
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        let entry = CachedMessages::new(sample());

        storage.set("k", &entry).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some(entry));

        storage.remove("k").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_corrupted_entry_is_miss() {
        let storage = MemoryStorage::new();
        storage.insert_raw("k", "{broken").await;
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("cache"));
        let entry = CachedMessages::new(sample());

        assert_eq!(storage.get("tr").await.unwrap(), None);
        storage.set("tr", &entry).await.unwrap();
        assert!(storage.path_for("tr").exists());
        assert_eq!(storage.get("tr").await.unwrap(), Some(entry));

        storage.remove("tr").await.unwrap();
        storage.remove("tr").await.unwrap();
        assert_eq!(storage.get("tr").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_corrupted_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.set("en", &CachedMessages::new(sample())).await.unwrap();
        std::fs::write(storage.path_for("tr"), "not json").unwrap();
        assert_eq!(storage.get("tr").await.unwrap(), None);

        storage.clear().await.unwrap();
        assert_eq!(storage.get("en").await.unwrap(), None);
        assert!(!storage.path_for("tr").exists());
    }

    #[tokio::test]
    async fn test_file_storage_clear_keeps_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let authored = dir.path().join("en.json");
        std::fs::write(&authored, r#"{"hello": "Hello"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        storage.set("en", &CachedMessages::new(sample())).await.unwrap();
        let stray = storage.path_for("tr").with_extension("json.tmp");
        std::fs::write(&stray, "partial").unwrap();

        storage.clear().await.unwrap();
        assert!(authored.exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(!storage.path_for("en").exists());
        assert!(!stray.exists());
    }

    #[test]
    fn test_record_file_names() {
        let hash = hash_key("en");
        assert!(is_record_file(Path::new(&format!("{hash}.json"))));
        assert!(is_record_file(Path::new(&format!("/tmp/{hash}.json.tmp"))));
        assert!(!is_record_file(Path::new("en.json")));
        assert!(!is_record_file(Path::new(&format!("{}.json", hash.to_uppercase()))));
        assert!(!is_record_file(Path::new(&format!("{hash}.txt"))));
    }

    #[tokio::test]
    async fn test_file_storage_clear_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("never-created"));
        assert!(storage.clear().await.is_ok());
    }

    #[tokio::test]
    #[ignore = "Requires running Redis"]
    async fn test_redis_storage() {
        let storage = RedisStorage::new(&RedisStorageConfig::default())
            .await
            .unwrap();
        let entry = CachedMessages::new(sample());

        storage.set("tr", &entry).await.unwrap();
        assert_eq!(storage.get("tr").await.unwrap(), Some(entry));

        storage.clear().await.unwrap();
        assert_eq!(storage.get("tr").await.unwrap(), None);
    }
}
