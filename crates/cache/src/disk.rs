use crate::{CacheStats, RecordStore};
use async_trait::async_trait;
use netcache_core::{CacheError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

/// Reserved key holding the schema version the store was written with
const SCHEMA_KEY: &str = "netcache:schema";

/// Prefix separating caller keys from the schema marker
const ENTRY_PREFIX: &str = "entry:";

/// Subdirectory holding the cacache content; wipes never touch its siblings
const STORE_DIR: &str = "store";

/// Disk-backed record store using cacache.
///
/// Opening the store compares the schema marker on disk with the expected
/// version. On any mismatch, or when no marker exists, the whole store is
/// wiped and recreated empty rather than migrated. Only the `store`
/// subdirectory of `cache_dir` is managed, so other files may live beside it.
pub struct DiskStore {
    cache_dir: PathBuf,
    store_dir: PathBuf,
    schema_version: u32,
    stats: RwLock<CacheStats>,
}

impl DiskStore {
    /// Open (or create) a store in `cache_dir` for `schema_version`
    pub async fn open<P: AsRef<Path>>(cache_dir: P, schema_version: u32) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        let store_dir = cache_dir.join(STORE_DIR);

        tokio::fs::create_dir_all(&store_dir)
            .await
            .map_err(|e| CacheError::disk_error(store_dir.display().to_string(), e.to_string()))?;

        let store = Self {
            cache_dir,
            store_dir,
            schema_version,
            stats: RwLock::new(CacheStats {
                capacity: usize::MAX, // Disk store doesn't have a fixed item capacity
                ..Default::default()
            }),
        };
        store.reconcile_schema().await?;

        debug!(
            dir = %store.store_dir.display(),
            schema_version,
            "Opened disk record store"
        );

        Ok(store)
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory owned by cacache, wiped on schema mismatch and `clear`
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    async fn reconcile_schema(&self) -> Result<()> {
        let on_disk = self
            .read_raw(SCHEMA_KEY)
            .await?
            .and_then(|data| String::from_utf8(data).ok())
            .and_then(|text| text.trim().parse::<u32>().ok());

        match on_disk {
            Some(version) if version == self.schema_version => return Ok(()),
            Some(version) => {
                warn!(
                    dir = %self.store_dir.display(),
                    found = version,
                    expected = self.schema_version,
                    "Cache schema mismatch, discarding all cached records"
                );
            }
            None => {
                debug!(
                    dir = %self.store_dir.display(),
                    "No schema marker found, initializing empty store"
                );
            }
        }

        self.wipe().await
    }

    /// Remove everything and write a fresh schema marker
    async fn wipe(&self) -> Result<()> {
        cacache::clear(&self.store_dir)
            .await
            .map_err(|e| self.disk_error(e))?;

        cacache::write(
            &self.store_dir,
            SCHEMA_KEY,
            self.schema_version.to_string().into_bytes(),
        )
        .await
        .map_err(|e| self.disk_error(e))?;

        let mut stats = self.stats.write().await;
        stats.size = 0;

        Ok(())
    }

    async fn read_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match cacache::read(&self.store_dir, key).await {
            Ok(data) => Ok(Some(data)),
            Err(cacache::Error::EntryNotFound(..)) => Ok(None),
            Err(e) => Err(self.disk_error(e)),
        }
    }

    async fn contains_entry(&self, entry_key: &str) -> Result<bool> {
        cacache::metadata(&self.store_dir, entry_key)
            .await
            .map(|meta| meta.is_some())
            .map_err(|e| self.disk_error(e))
    }

    fn entry_key(key: &str) -> String {
        format!("{ENTRY_PREFIX}{key}")
    }

    fn disk_error(&self, error: cacache::Error) -> netcache_core::Error {
        CacheError::disk_error(self.store_dir.display().to_string(), error.to_string()).into()
    }
}

#[async_trait]
impl RecordStore for DiskStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.read_raw(&Self::entry_key(key)).await?;

        let mut stats = self.stats.write().await;
        if value.is_some() {
            trace!(key, "Disk store hit");
            stats.hits += 1;
        } else {
            trace!(key, "Disk store miss");
            stats.misses += 1;
        }

        Ok(value)
    }

    async fn write(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let entry_key = Self::entry_key(key);
        let existed = self.contains_entry(&entry_key).await?;

        cacache::write(&self.store_dir, &entry_key, data)
            .await
            .map_err(|e| self.disk_error(e))?;

        // Overwrites do not grow the store
        let mut stats = self.stats.write().await;
        stats.writes += 1;
        if !existed {
            stats.size = stats.size.saturating_add(1);
        }

        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        self.contains_entry(&Self::entry_key(key)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let entry_key = Self::entry_key(key);
        if !self.contains_entry(&entry_key).await? {
            return Ok(());
        }

        cacache::remove(&self.store_dir, &entry_key)
            .await
            .map_err(|e| self.disk_error(e))?;

        let mut stats = self.stats.write().await;
        stats.size = stats.size.saturating_sub(1);

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.wipe().await
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
