use crate::{CacheStats, RecordStore};
use async_trait::async_trait;
use lru::LruCache;
use netcache_core::Result;
use std::num::NonZeroUsize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

/// In-memory LRU record store.
///
/// Nothing survives the process, so the schema version only serves to stamp
/// records written through [`crate::ResultCache`]. Useful for ephemeral
/// sessions and tests.
pub struct MemoryStore {
    entries: Mutex<LruCache<String, Vec<u8>>>,
    schema_version: u32,
    capacity: usize,
    stats: RwLock<CacheStats>,
}

impl MemoryStore {
    /// Create a new memory store holding at most `capacity` entries
    pub fn new(capacity: usize, schema_version: u32) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        debug!(capacity = capacity.get(), schema_version, "Creating memory record store");

        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            schema_version,
            capacity: capacity.get(),
            stats: RwLock::new(CacheStats {
                capacity: capacity.get(),
                ..Default::default()
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.entries.lock().await.get(key).cloned();

        let mut stats = self.stats.write().await;
        if value.is_some() {
            trace!(key, "Memory store hit");
            stats.hits += 1;
        } else {
            trace!(key, "Memory store miss");
            stats.misses += 1;
        }

        Ok(value)
    }

    async fn write(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let size = {
            let mut entries = self.entries.lock().await;
            if let Some((evicted, _)) = entries.push(key.to_string(), data) {
                if evicted != key {
                    trace!(evicted = %evicted, "Memory store evicted entry due to capacity limit");
                }
            }
            entries.len()
        };

        let mut stats = self.stats.write().await;
        stats.writes += 1;
        stats.size = size;

        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().await.contains(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let size = {
            let mut entries = self.entries.lock().await;
            entries.pop(key);
            entries.len()
        };

        self.stats.write().await.size = size;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().await.clear();
        self.stats.write().await.size = 0;
        Ok(())
    }

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn stats(&self) -> CacheStats {
        self.stats
            .try_read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic_operations() {
        let store = MemoryStore::new(10, 1);

        store.write("a", b"1".to_vec()).await.unwrap();
        store.write("a", b"2".to_vec()).await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len().await, 1);

        store.delete("a").await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), None);
        assert!(store.is_empty().await);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.capacity, 10);
    }

    #[tokio::test]
    async fn test_memory_store_evicts_least_recently_used() {
        let store = MemoryStore::new(2, 1);

        store.write("a", b"1".to_vec()).await.unwrap();
        store.write("b", b"2".to_vec()).await.unwrap();
        // Touch "a" so "b" becomes the eviction candidate
        store.read("a").await.unwrap();
        store.write("c", b"3".to_vec()).await.unwrap();

        assert!(store.read("a").await.unwrap().is_some());
        assert!(store.read("b").await.unwrap().is_none());
        assert!(store.read("c").await.unwrap().is_some());
        assert_eq!(store.stats().size, 2);
    }

    #[tokio::test]
    async fn test_contains_does_not_touch_recency() {
        let store = MemoryStore::new(2, 1);

        store.write("a", b"1".to_vec()).await.unwrap();
        store.write("b", b"2".to_vec()).await.unwrap();
        assert!(store.contains("a").await.unwrap());
        store.write("c", b"3".to_vec()).await.unwrap();

        // "a" stayed least recently used despite the lookup
        assert!(!store.contains("a").await.unwrap());
        assert_eq!(store.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let store = MemoryStore::new(0, 1);
        assert_eq!(store.capacity(), 1);

        store.write("a", b"1".to_vec()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.stats().size, 0);
    }
}
