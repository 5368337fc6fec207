//! Common utilities for integration tests

use crate::*;
use async_trait::async_trait;
use netcache_client::{HttpTransport, TransportRequest, TransportResponse};
use netcache_core::{FailureKind, TransportFailure};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use url::Url;

/// Item type used across the tests, shaped like a game list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub rating: Option<f32>,
}

/// One scripted reaction of [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub enum Step {
    Respond(TransportResponse),
    Fail(TransportFailure),
    /// Never completes; used to exercise cancellation
    Hang,
}

impl Step {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Step::Respond(TransportResponse::new(200, body))
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Step::Respond(TransportResponse::new(status, body))
    }

    pub fn refused() -> Self {
        Step::Fail(TransportFailure::new(FailureKind::Connect, "connection refused"))
    }
}

/// Transport that replays a fixed script and records every request it sees
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.url.to_string())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn issue(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportFailure> {
        self.seen.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(failure)) => Err(failure),
            Some(Step::Hang) => std::future::pending().await,
            None => panic!("transport script exhausted"),
        }
    }
}

pub const BASE_URL: &str = "https://api.rawg.io/api/";

/// A page of three games in the paginated envelope
pub fn three_games_page() -> String {
    json!({
        "count": 3,
        "next": "https://api.rawg.io/api/games?page=2",
        "previous": null,
        "results": [
            {"id": 3498, "name": "Grand Theft Auto V", "rating": 4.47},
            {"id": 3328, "name": "The Witcher 3: Wild Hunt", "rating": 4.66},
            {"id": 4200, "name": "Portal 2", "rating": 4.61}
        ]
    })
    .to_string()
}

pub fn games_page(page: u32) -> RequestDescriptor {
    RequestDescriptor::get("games")
        .query("page", page)
        .tagged("games")
}

pub fn executor(transport: Arc<ScriptedTransport>) -> RequestExecutor {
    RequestExecutor::new(transport, Url::parse(BASE_URL).unwrap())
}

pub fn memory_cache() -> Arc<ResultCache<Game>> {
    Arc::new(ResultCache::new(Arc::new(MemoryStore::new(64, 1))))
}
