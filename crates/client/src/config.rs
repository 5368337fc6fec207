use netcache_core::constants::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Settings for the HTTP side of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Every descriptor path is resolved against this URL
    pub base_url: Url,
    /// Overall timeout of one request, body included
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Headers sent with every request, e.g. an API key
    pub default_headers: BTreeMap<String, String>,
    pub pool_max_idle_per_host: usize,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: format!("netcache/{}", env!("CARGO_PKG_VERSION")),
            default_headers: BTreeMap::new(),
            pool_max_idle_per_host: 8,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_pool_max_idle_per_host(mut self, max_idle: usize) -> Self {
        self.pool_max_idle_per_host = max_idle;
        self
    }
}
