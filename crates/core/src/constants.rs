/// Schema version written by this build of the result cache.
///
/// Bump this whenever the serialized layout of `CacheRecord` or `CacheMeta`
/// changes. Stores written with any other version are wiped on open.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Inclusive lower bound of accepted HTTP status codes
pub const SUCCESS_STATUS_MIN: u16 = 200;

/// Exclusive upper bound of accepted HTTP status codes
pub const SUCCESS_STATUS_MAX: u16 = 300;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default number of items published to the shared snapshot
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 10;

/// Default capacity of the in-memory record store
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;
