mod cache;
mod classified;
mod config;

pub use cache::CacheError;
pub use classified::ClassifiedError;
pub use config::ConfigError;

use thiserror::Error;

/// Umbrella error for store, snapshot and configuration failures.
///
/// Request-level failures are reported as [`ClassifiedError`] instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_transparent() {
        let err: Error = CacheError::disk_error("/tmp/netcache/store", "permission denied").into();
        assert_eq!(
            err.to_string(),
            "Disk store error: /tmp/netcache/store - permission denied"
        );

        let err: Error = ConfigError::missing_field("client.base_url").into();
        assert!(matches!(err, Error::Config(ConfigError::MissingField { .. })));
        assert_eq!(
            err.to_string(),
            "Missing required configuration: client.base_url"
        );
    }
}
