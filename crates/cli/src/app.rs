use crate::config::{Config, SnapshotSettings};
use anyhow::{Context, Result};
use netcache_cache::{DiskStore, MemoryStore, RecordStore, ResultCache, SnapshotBridge};
use netcache_client::{
    AlwaysReachable, CacheOrchestrator, FetchOutcome, ManualReachability, ProbeReachability,
    ReachabilityGate, RequestExecutor, RetryPolicy,
};
use netcache_core::{RequestDescriptor, SnapshotItem};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Options decided per invocation rather than by configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct AppOptions {
    /// Treat the network as unreachable and serve from the cache only
    pub offline: bool,
    /// Write a shared snapshot after every fresh fetch
    pub publish: bool,
}

/// Fully wired pipeline over untyped JSON items
pub struct App {
    orchestrator: CacheOrchestrator<Value>,
    cache: Arc<ResultCache<Value>>,
    bridge: Arc<SnapshotBridge>,
}

impl App {
    pub async fn new(config: &Config, options: AppOptions) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn RecordStore> = if config.cache.memory_only {
            debug!(capacity = config.cache.memory_capacity, "Using in-memory store");
            Arc::new(MemoryStore::new(
                config.cache.memory_capacity,
                config.cache.schema_version,
            ))
        } else {
            let dir = config.cache_dir();
            debug!(path = %dir.display(), "Using disk store");
            Arc::new(
                DiskStore::open(&dir, config.cache.schema_version)
                    .await
                    .with_context(|| format!("failed to open cache at {}", dir.display()))?,
            )
        };
        let cache = Arc::new(ResultCache::new(store));
        let bridge = Arc::new(SnapshotBridge::new(config.snapshot_path()));

        let executor = RequestExecutor::from_config(&config.client_config()?)?;
        let gate = reachability_gate(config, options.offline)?;

        let mut builder = CacheOrchestrator::builder(executor, Arc::clone(&cache))
            .reachability(gate)
            .retry(RetryPolicy::new(config.retry_config()));

        if options.publish {
            let settings = config.snapshot.clone();
            builder = builder.publish_snapshots(Arc::clone(&bridge), settings.limit, move |item| {
                snapshot_item(&settings, item)
            });
        }

        info!(base_url = %config.client.base_url, offline = options.offline, "Pipeline ready");

        Ok(Self {
            orchestrator: builder.build(),
            cache,
            bridge,
        })
    }

    pub async fn fetch(&self, descriptor: &RequestDescriptor) -> FetchOutcome<Value> {
        self.orchestrator.fetch(descriptor).await
    }

    pub fn cache(&self) -> &ResultCache<Value> {
        &self.cache
    }

    pub fn bridge(&self) -> &SnapshotBridge {
        &self.bridge
    }
}

fn reachability_gate(config: &Config, offline: bool) -> Result<Arc<dyn ReachabilityGate>> {
    if offline {
        return Ok(Arc::new(ManualReachability::new(false)));
    }

    Ok(match config.probe_config()? {
        Some(probe) => {
            debug!(address = %probe.address, "Starting reachability probe");
            Arc::new(ProbeReachability::spawn(probe))
        }
        None => Arc::new(AlwaysReachable),
    })
}

/// Reduce a JSON item to a snapshot record using the configured field names
pub fn snapshot_item(settings: &SnapshotSettings, item: &Value) -> SnapshotItem {
    let text = |field: &str| match item.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    SnapshotItem {
        id: text(&settings.id_field).unwrap_or_default(),
        title: text(&settings.title_field).unwrap_or_default(),
        subtitle: settings.subtitle_field.as_deref().and_then(text),
        image_url: settings.image_field.as_deref().and_then(text),
    }
}
