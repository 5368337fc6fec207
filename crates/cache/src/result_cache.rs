use crate::{CacheStats, RecordStore};
use chrono::{DateTime, Utc};
use netcache_core::{CacheError, CacheKey, CacheMeta, CacheRecord, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Borrowed form of [`CacheRecord`] so `put` can serialize without cloning items
#[derive(Serialize)]
struct RecordRef<'a, T> {
    key: &'a CacheKey,
    items: &'a [T],
    fetched_at: DateTime<Utc>,
    schema_version: u32,
}

/// Typed result cache keyed by request identity.
///
/// Each key maps to two store entries: the full [`CacheRecord`] and a small
/// [`CacheMeta`] that can be read without deserializing the items. Records
/// whose schema version differs from the store's are treated as absent and
/// purged on the next `put`.
pub struct ResultCache<T> {
    store: Arc<dyn RecordStore>,
    stale_keys: Mutex<HashSet<CacheKey>>,
    _items: PhantomData<fn() -> T>,
}

impl<T> ResultCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            stale_keys: Mutex::new(HashSet::new()),
            _items: PhantomData,
        }
    }

    /// Schema version stamped on every record written by this cache
    pub fn schema_version(&self) -> u32 {
        self.store.schema_version()
    }

    /// Get the most recent record for `key`
    pub async fn get(&self, key: &CacheKey) -> Result<Option<CacheRecord<T>>> {
        let Some(data) = self.store.read(&items_key(key)).await? else {
            trace!(key = %key, "Result cache miss");
            return Ok(None);
        };

        let record: CacheRecord<T> = match serde_json::from_slice(&data) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache record");
                self.mark_stale(key).await;
                return Ok(None);
            }
        };

        if record.schema_version != self.schema_version() {
            debug!(
                key = %key,
                found = record.schema_version,
                expected = self.schema_version(),
                "Ignoring cache record with stale schema"
            );
            self.mark_stale(key).await;
            return Ok(None);
        }

        trace!(key = %key, items = record.items.len(), "Result cache hit");
        Ok(Some(record))
    }

    /// Get bookkeeping for `key` without reading its items.
    ///
    /// Agrees with [`ResultCache::get`]: metadata whose items were evicted
    /// reads as absent, and a record whose metadata was evicted has it
    /// rebuilt from the record.
    pub async fn meta(&self, key: &CacheKey) -> Result<Option<CacheMeta>> {
        let Some(data) = self.store.read(&meta_key(key)).await? else {
            return Ok(self.get(key).await?.map(|record| record.meta()));
        };

        match serde_json::from_slice::<CacheMeta>(&data) {
            Ok(meta) if meta.schema_version == self.schema_version() => {
                if self.store.contains(&items_key(key)).await? {
                    Ok(Some(meta))
                } else {
                    debug!(key = %key, "Cache metadata without items, ignoring");
                    self.mark_stale(key).await;
                    Ok(None)
                }
            }
            Ok(_) => {
                self.mark_stale(key).await;
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache metadata");
                self.mark_stale(key).await;
                Ok(None)
            }
        }
    }

    /// Replace whatever is stored for `key` with `items`.
    ///
    /// This is a full overwrite stamped with the current time; nothing from a
    /// previous record is merged in.
    pub async fn put(&self, key: &CacheKey, items: &[T]) -> Result<CacheMeta> {
        self.purge_stale(key).await;

        let record = RecordRef {
            key,
            items,
            fetched_at: Utc::now(),
            schema_version: self.schema_version(),
        };
        let meta = CacheMeta {
            key: key.clone(),
            fetched_at: record.fetched_at,
            schema_version: record.schema_version,
            item_count: items.len(),
        };

        let record_data = serde_json::to_vec(&record).map_err(CacheError::from)?;
        let meta_data = serde_json::to_vec(&meta).map_err(CacheError::from)?;

        self.store.write(&items_key(key), record_data).await?;
        self.store.write(&meta_key(key), meta_data).await?;

        debug!(key = %key, items = items.len(), "Stored result in cache");
        Ok(meta)
    }

    /// Drop the record for `key`
    pub async fn delete(&self, key: &CacheKey) -> Result<()> {
        self.store.delete(&items_key(key)).await?;
        self.store.delete(&meta_key(key)).await?;
        self.stale_keys.lock().await.remove(key);
        Ok(())
    }

    /// Drop every record
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        self.stale_keys.lock().await.clear();
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    async fn mark_stale(&self, key: &CacheKey) {
        self.stale_keys.lock().await.insert(key.clone());
    }

    /// Delete records previously found stale, except `current` which is about
    /// to be overwritten anyway
    async fn purge_stale(&self, current: &CacheKey) {
        let stale: Vec<CacheKey> = {
            let mut stale_keys = self.stale_keys.lock().await;
            stale_keys.remove(current);
            stale_keys.drain().collect()
        };

        for key in stale {
            let result = async {
                self.store.delete(&items_key(&key)).await?;
                self.store.delete(&meta_key(&key)).await
            }
            .await;

            match result {
                Ok(()) => trace!(key = %key, "Purged stale cache record"),
                Err(e) => warn!(key = %key, error = %e, "Failed to purge stale cache record"),
            }
        }
    }
}

fn items_key(key: &CacheKey) -> String {
    format!("items:{key}")
}

fn meta_key(key: &CacheKey) -> String {
    format!("meta:{key}")
}
