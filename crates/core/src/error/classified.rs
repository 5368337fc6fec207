use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of request failures surfaced to callers.
///
/// Every failure of a live request resolves to exactly one of these kinds.
/// Only `ServerStatus` with a 5xx code and `Unreachable` are considered
/// transient; everything else is terminal for the current attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ClassifiedError {
    #[error("The request endpoint could not be built")]
    InvalidEndpoint,

    #[error("The server returned an invalid response")]
    InvalidResponseShape,

    #[error("The server returned no data")]
    NoData,

    #[error("The response could not be decoded")]
    DecodingFailed,

    #[error("Too many requests, please try again later")]
    RateLimited,

    #[error("The requested resource was not found")]
    NotFound,

    #[error("The server responded with status {0}")]
    ServerStatus(u16),

    #[error("{0}")]
    ServerMessage(String),

    #[error("The network is unreachable")]
    Unreachable,

    #[error("An unknown error occurred")]
    Unknown,
}

impl ClassifiedError {
    /// Whether another attempt of the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClassifiedError::ServerStatus(code) => *code >= 500,
            ClassifiedError::Unreachable => true,
            _ => false,
        }
    }

    /// Localization key for the user-facing message of this error
    pub fn message_key(&self) -> &'static str {
        match self {
            ClassifiedError::InvalidEndpoint => "error.invalid_endpoint",
            ClassifiedError::InvalidResponseShape => "error.invalid_response",
            ClassifiedError::NoData => "error.no_data",
            ClassifiedError::DecodingFailed => "error.decoding_failed",
            ClassifiedError::RateLimited => "error.rate_limited",
            ClassifiedError::NotFound => "error.not_found",
            ClassifiedError::ServerStatus(_) => "error.server_status",
            ClassifiedError::ServerMessage(_) => "error.server_message",
            ClassifiedError::Unreachable => "error.unreachable",
            ClassifiedError::Unknown => "error.unknown",
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClassifiedError::NotFound => Some(404),
            ClassifiedError::RateLimited => Some(429),
            ClassifiedError::ServerStatus(code) => Some(*code),
            _ => None,
        }
    }
}
