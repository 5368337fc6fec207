pub mod cancel;
pub mod config;
pub(crate) mod error_handling;
pub mod executor;
pub mod orchestrator;
pub mod reachability;
pub mod retry;
pub mod transport;

pub use cancel::CancelToken;
pub use config::ClientConfig;
pub use executor::RequestExecutor;
pub use orchestrator::{CacheOrchestrator, CacheOrchestratorBuilder, FetchOutcome};
pub use reachability::{
    probe_once, AlwaysReachable, ManualReachability, ProbeConfig, ProbeReachability,
    ReachabilityGate,
};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
