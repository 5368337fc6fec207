use async_trait::async_trait;
use netcache_core::Result;

pub mod disk;
pub mod memory;
pub mod result_cache;
pub mod snapshot;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use result_cache::ResultCache;
pub use snapshot::SnapshotBridge;

/// Simplified store statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Byte-level key/value store underneath [`ResultCache`].
///
/// Implementations are opened against a schema version; a store opened with
/// a version other than the one its data was written with must come up empty.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the bytes stored under `key`
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `data` under `key`, replacing any previous value.
    ///
    /// Once this returns `Ok`, a subsequent `read` of `key` observes `data`.
    async fn write(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Whether `key` holds a value, without counting a hit or touching recency
    async fn contains(&self, key: &str) -> Result<bool>;

    /// Remove `key` if present
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Schema version this store was opened with
    fn schema_version(&self) -> u32;

    /// Get store statistics (non-async for simplicity)
    fn stats(&self) -> CacheStats;
}
