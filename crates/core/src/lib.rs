pub mod classify;
pub mod constants;
pub mod error;
pub mod models;

pub use classify::{decode_body, DecodeFailure, ErrorClassifier, FailureKind, TransportFailure};
pub use error::{CacheError, ClassifiedError, ConfigError, Error, Result};

// Re-export commonly used models for convenience
pub use models::{
    listing::{Listing, Paginated},
    record::{CacheMeta, CacheRecord},
    request::{CacheKey, HttpMethod, RequestDescriptor},
    snapshot::{SharedSnapshot, SnapshotItem},
};
