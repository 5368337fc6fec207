//! Shared fixtures for the netcache integration tests
//!
//! The tests themselves live under `tests/` and drive the whole pipeline:
//! executor, reachability gate, result cache and orchestrator.

pub mod common;

// Re-export commonly used types for tests
pub use netcache_cache::{DiskStore, MemoryStore, RecordStore, ResultCache, SnapshotBridge};
pub use netcache_client::{
    CacheOrchestrator, CancelToken, FetchOutcome, ManualReachability, RequestExecutor,
    RetryConfig, RetryPolicy,
};
pub use netcache_core::{
    CacheKey, ClassifiedError, RequestDescriptor, SharedSnapshot, SnapshotItem,
};
pub use serde_json::{json, Value};
pub use std::sync::Arc;
pub use std::time::Duration;
