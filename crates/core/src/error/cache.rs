use thiserror::Error;

/// Result cache and persistent store errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Disk store error: {path} - {reason}")]
    DiskError { path: String, reason: String },

    #[error("Snapshot error: {path} - {reason}")]
    Snapshot { path: String, reason: String },

    #[error("Cache serialization failed")]
    SerializationError(#[from] serde_json::Error),
}

impl CacheError {
    pub fn disk_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DiskError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn snapshot(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Snapshot {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
