pub mod app;
pub mod config;
pub mod logging;

pub use app::{App, AppOptions};
pub use config::{Config, LogFormat, ReachabilityMode};
pub use logging::init_logging;
