use crate::models::request::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Items stored for one cache key, replaced wholesale on every refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub key: CacheKey,
    pub items: Vec<T>,
    pub fetched_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl<T> CacheRecord<T> {
    /// Create a record stamped with the current time
    pub fn new(key: CacheKey, items: Vec<T>, schema_version: u32) -> Self {
        Self {
            key,
            items,
            fetched_at: Utc::now(),
            schema_version,
        }
    }

    pub fn meta(&self) -> CacheMeta {
        CacheMeta {
            key: self.key.clone(),
            fetched_at: self.fetched_at,
            schema_version: self.schema_version,
            item_count: self.items.len(),
        }
    }
}

/// Bookkeeping for a cache key, stored apart from the items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub key: CacheKey,
    pub fetched_at: DateTime<Utc>,
    pub schema_version: u32,
    pub item_count: usize,
}

impl CacheMeta {
    /// Time elapsed since the record was fetched
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_older_than(&self, max_age: Duration) -> bool {
        chrono::Duration::from_std(max_age)
            .map(|max_age| self.age() > max_age)
            .unwrap_or(false)
    }
}
