//! Mapping of transport outcomes onto [`ClassifiedError`].
//!
//! Everything in here is a pure function of its inputs. Logging the raw
//! status or transport message is left to the caller.

use crate::constants::{SUCCESS_STATUS_MAX, SUCCESS_STATUS_MIN};
use crate::ClassifiedError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// JSON fields that commonly carry a human-readable error in API bodies
const MESSAGE_FIELDS: &[&str] = &["message", "error", "detail", "error_description"];

/// Coarse reason a transport call produced no usable HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection could not be established (DNS, refused, no route)
    Connect,
    /// The request or connect phase timed out
    Timeout,
    /// Something arrived, but it could not be read as an HTTP response
    MalformedResponse,
    /// Any other transport failure
    Other,
}

/// A transport failure with an optional body captured before the failure
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
    pub body: Option<Vec<u8>>,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Why a successful response body could not be turned into the expected type
#[derive(Debug)]
pub enum DecodeFailure {
    Empty,
    Invalid(serde_json::Error),
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeFailure::Empty => write!(f, "response body is empty"),
            DecodeFailure::Invalid(e) => write!(f, "response body is not valid: {e}"),
        }
    }
}

/// Decode a JSON body, treating a blank body as missing data
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeFailure> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeFailure::Empty);
    }
    serde_json::from_slice(body).map_err(DecodeFailure::Invalid)
}

/// Maps transport outcomes onto the closed [`ClassifiedError`] set.
///
/// The status table defaults to 404 → `NotFound`, 429 → `RateLimited` and
/// 5xx → `ServerStatus`. Individual codes can be remapped per instance with
/// [`ErrorClassifier::map_status`].
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    status_overrides: BTreeMap<u16, ClassifiedError>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `status` as `kind` regardless of the default table
    pub fn map_status(mut self, status: u16, kind: ClassifiedError) -> Self {
        self.status_overrides.insert(status, kind);
        self
    }

    /// Whether `status` falls in the accepted success range
    pub fn is_success(status: u16) -> bool {
        (SUCCESS_STATUS_MIN..SUCCESS_STATUS_MAX).contains(&status)
    }

    /// Classify a response whose status is outside the success range
    pub fn classify_status(&self, status: u16, body: Option<&[u8]>) -> ClassifiedError {
        if let Some(kind) = self.status_overrides.get(&status) {
            return kind.clone();
        }

        match status {
            404 => ClassifiedError::NotFound,
            429 => ClassifiedError::RateLimited,
            500..=599 => ClassifiedError::ServerStatus(status),
            _ => body
                .and_then(server_message)
                .map(ClassifiedError::ServerMessage)
                .unwrap_or(ClassifiedError::Unknown),
        }
    }

    /// Classify a body that failed to decode under a success status
    pub fn classify_decode(&self, failure: &DecodeFailure) -> ClassifiedError {
        match failure {
            DecodeFailure::Empty => ClassifiedError::NoData,
            DecodeFailure::Invalid(_) => ClassifiedError::DecodingFailed,
        }
    }

    /// Classify a transport call that never produced a usable response
    pub fn classify_failure(&self, failure: &TransportFailure) -> ClassifiedError {
        match failure.kind {
            FailureKind::Connect | FailureKind::Timeout => ClassifiedError::Unreachable,
            FailureKind::MalformedResponse => ClassifiedError::InvalidResponseShape,
            FailureKind::Other => failure
                .body
                .as_deref()
                .and_then(server_message)
                .map(ClassifiedError::ServerMessage)
                .unwrap_or(ClassifiedError::Unknown),
        }
    }
}

/// Extract displayable text from an error body.
///
/// Prefers a well-known message field of a JSON object, then falls back to the
/// whole body when it is non-empty UTF-8.
fn server_message(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        for field in MESSAGE_FIELDS {
            if let Some(Value::String(message)) = map.get(*field) {
                let message = message.trim();
                if !message.is_empty() {
                    return Some(message.to_string());
                }
            }
        }
    }

    Some(text.to_string())
}
