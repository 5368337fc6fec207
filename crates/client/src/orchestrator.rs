use crate::cancel::CancelToken;
use crate::error_handling::handle_cache_error;
use crate::executor::RequestExecutor;
use crate::reachability::{AlwaysReachable, ReachabilityGate};
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use netcache_cache::{ResultCache, SnapshotBridge};
use netcache_core::{
    CacheKey, ClassifiedError, Listing, RequestDescriptor, SharedSnapshot, SnapshotItem,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Terminal state of one orchestrated fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// Live data, already written to the cache
    Fresh(Vec<T>),
    /// The live request failed and cached data was served instead
    Fallback {
        items: Vec<T>,
        fetched_at: DateTime<Utc>,
        error: ClassifiedError,
    },
    /// The live request failed and nothing was cached for the key
    Failed(ClassifiedError),
}

impl<T> FetchOutcome<T> {
    pub fn items(&self) -> Option<&[T]> {
        match self {
            FetchOutcome::Fresh(items) | FetchOutcome::Fallback { items, .. } => Some(items),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn into_items(self) -> Option<Vec<T>> {
        match self {
            FetchOutcome::Fresh(items) | FetchOutcome::Fallback { items, .. } => Some(items),
            FetchOutcome::Failed(_) => None,
        }
    }

    /// Error of the live request, if it failed
    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            FetchOutcome::Fresh(_) => None,
            FetchOutcome::Fallback { error, .. } | FetchOutcome::Failed(error) => Some(error),
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, FetchOutcome::Fresh(_))
    }
}

type SnapshotMapper<T> = dyn Fn(&T) -> SnapshotItem + Send + Sync;

struct SnapshotPublisher<T> {
    bridge: Arc<SnapshotBridge>,
    limit: usize,
    mapper: Box<SnapshotMapper<T>>,
}

/// Live fetch with cached fallback.
///
/// Each fetch checks the reachability gate, runs the request through the
/// executor and retry policy, and on success replaces the cached record for
/// the request's key. When the live request fails the cached record is served
/// if there is one.
pub struct CacheOrchestrator<T> {
    executor: RequestExecutor,
    cache: Arc<ResultCache<T>>,
    gate: Arc<dyn ReachabilityGate>,
    retry: RetryPolicy,
    publisher: Option<SnapshotPublisher<T>>,
}

impl<T> CacheOrchestrator<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn builder(
        executor: RequestExecutor,
        cache: Arc<ResultCache<T>>,
    ) -> CacheOrchestratorBuilder<T> {
        CacheOrchestratorBuilder {
            executor,
            cache,
            gate: None,
            retry: None,
            publisher: None,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache<T>> {
        &self.cache
    }

    /// Fetch the list described by `descriptor`
    pub async fn fetch(&self, descriptor: &RequestDescriptor) -> FetchOutcome<T> {
        let key = descriptor.cache_key();
        match self.fetch_live(descriptor).await {
            Ok(items) => self.settle_fresh(&key, items).await,
            Err(error) => self.fall_back(&key, error).await,
        }
    }

    /// Like [`CacheOrchestrator::fetch`], but abandons the work when `cancel`
    /// fires.
    ///
    /// Returns `None` if cancelled before the outcome is settled. A cancelled
    /// fetch never writes the cache.
    pub async fn fetch_cancellable(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancelToken,
    ) -> Option<FetchOutcome<T>> {
        let key = descriptor.cache_key();

        let live = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.fetch_live(descriptor) => Some(result),
        };

        let outcome = match live {
            Some(Ok(items)) if !cancel.is_cancelled() => self.settle_fresh(&key, items).await,
            Some(Err(error)) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return cancelled(&key),
                    outcome = self.fall_back(&key, error) => outcome,
                }
            }
            _ => return cancelled(&key),
        };

        Some(outcome)
    }

    async fn fetch_live(&self, descriptor: &RequestDescriptor) -> Result<Vec<T>, ClassifiedError> {
        if !self.gate.is_reachable() {
            debug!(key = %descriptor.cache_key(), "Network unreachable, skipping request");
            return Err(ClassifiedError::Unreachable);
        }

        self.retry
            .execute(|| async move {
                self.executor
                    .execute::<Listing<T>>(descriptor)
                    .await
                    .map(Listing::into_items)
            })
            .await
    }

    async fn settle_fresh(&self, key: &CacheKey, items: Vec<T>) -> FetchOutcome<T> {
        if let Err(e) = self.cache.put(key, &items).await {
            handle_cache_error(e, "put");
        }
        self.publish(&items).await;

        info!(key = %key, items = items.len(), "Fetched fresh data");
        FetchOutcome::Fresh(items)
    }

    async fn fall_back(&self, key: &CacheKey, error: ClassifiedError) -> FetchOutcome<T> {
        let cached = match self.cache.get(key).await {
            Ok(cached) => cached,
            Err(e) => {
                handle_cache_error(e, "get");
                None
            }
        };

        match cached {
            Some(record) => {
                info!(
                    key = %key,
                    error = %error,
                    items = record.items.len(),
                    fetched_at = %record.fetched_at,
                    "Serving cached data"
                );
                FetchOutcome::Fallback {
                    items: record.items,
                    fetched_at: record.fetched_at,
                    error,
                }
            }
            None => {
                warn!(key = %key, error = %error, "Fetch failed with nothing cached");
                FetchOutcome::Failed(error)
            }
        }
    }

    async fn publish(&self, items: &[T]) {
        let Some(publisher) = &self.publisher else {
            return;
        };

        let snapshot = SharedSnapshot::new(
            items
                .iter()
                .take(publisher.limit)
                .map(|item| (publisher.mapper)(item))
                .collect(),
        );

        if let Err(e) = publisher.bridge.write_snapshot(&snapshot).await {
            warn!(error = %e, "Failed to publish shared snapshot");
        }
    }
}

fn cancelled<U>(key: &CacheKey) -> Option<U> {
    debug!(key = %key, "Fetch cancelled");
    None
}

/// Builder for [`CacheOrchestrator`]
pub struct CacheOrchestratorBuilder<T> {
    executor: RequestExecutor,
    cache: Arc<ResultCache<T>>,
    gate: Option<Arc<dyn ReachabilityGate>>,
    retry: Option<RetryPolicy>,
    publisher: Option<SnapshotPublisher<T>>,
}

impl<T> CacheOrchestratorBuilder<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Defaults to [`AlwaysReachable`]
    pub fn reachability(mut self, gate: Arc<dyn ReachabilityGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Defaults to a single attempt
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Publish the first `limit` items of every fresh result through `bridge`
    pub fn publish_snapshots<F>(
        mut self,
        bridge: Arc<SnapshotBridge>,
        limit: usize,
        mapper: F,
    ) -> Self
    where
        F: Fn(&T) -> SnapshotItem + Send + Sync + 'static,
    {
        self.publisher = Some(SnapshotPublisher {
            bridge,
            limit,
            mapper: Box::new(mapper),
        });
        self
    }

    pub fn build(self) -> CacheOrchestrator<T> {
        CacheOrchestrator {
            executor: self.executor,
            cache: self.cache,
            gate: self.gate.unwrap_or_else(|| Arc::new(AlwaysReachable)),
            retry: self.retry.unwrap_or_default(),
            publisher: self.publisher,
        }
    }
}
