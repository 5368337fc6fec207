use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info};

/// Best-effort view of whether the network is usable right now.
///
/// `is_reachable` must answer immediately from cached state; it is checked on
/// every fetch before any I/O happens.
pub trait ReachabilityGate: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Gate that never blocks a request
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReachable;

impl ReachabilityGate for AlwaysReachable {
    fn is_reachable(&self) -> bool {
        true
    }
}

/// Gate driven by the host application, e.g. from platform connectivity events
#[derive(Debug)]
pub struct ManualReachability {
    reachable: AtomicBool,
}

impl ManualReachability {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        let previous = self.reachable.swap(reachable, Ordering::Release);
        if previous != reachable {
            debug!(reachable, "Reachability changed");
        }
    }
}

impl Default for ManualReachability {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ReachabilityGate for ManualReachability {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }
}

/// Settings for [`ProbeReachability`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// `host:port` to open a TCP connection to
    pub address: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Gate refreshed by a background task that periodically opens a TCP
/// connection to a probe address.
///
/// Starts out optimistic. The task is aborted when the gate is dropped.
#[derive(Debug)]
pub struct ProbeReachability {
    reachable: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ProbeReachability {
    /// Start probing; must be called from within a tokio runtime
    pub fn spawn(config: ProbeConfig) -> Self {
        let reachable = Arc::new(AtomicBool::new(true));
        let state = Arc::clone(&reachable);

        let task = tokio::spawn(async move {
            loop {
                let now = probe_once(&config.address, config.timeout).await;
                let before = state.swap(now, Ordering::Release);
                if before != now {
                    info!(address = %config.address, reachable = now, "Reachability changed");
                }
                tokio::time::sleep(config.interval).await;
            }
        });

        Self { reachable, task }
    }
}

impl ReachabilityGate for ProbeReachability {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }
}

impl Drop for ProbeReachability {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Try a single TCP connect to `address` within `limit`
pub async fn probe_once(address: &str, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect(address)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(address, error = %e, "Reachability probe failed");
            false
        }
        Err(_) => {
            debug!(address, "Reachability probe timed out");
            false
        }
    }
}
