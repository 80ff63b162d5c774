//! Domain-error parsers for non-2xx responses.
//!
//! A parser turns an error response body into a service-specific error. It
//! is consulted only when the status is outside `[200, 300)`; returning
//! `None` falls back to a generic [`RestError::HttpStatus`].
//!
//! [`RestError::HttpStatus`]: crate::error::RestError::HttpStatus

use restkit_core::HttpMetadata;
use serde_json::Value;
use thiserror::Error;

use crate::error::BoxError;

/// Turns a non-2xx response into a domain error.
pub trait ErrorParser: Send + Sync {
    /// Returns the domain error, or `None` to decline.
    fn parse_error(&self, metadata: &HttpMetadata, body: Option<&[u8]>) -> Option<BoxError>;
}

impl<F> ErrorParser for F
where
    F: Fn(&HttpMetadata, Option<&[u8]>) -> Option<BoxError> + Send + Sync,
{
    fn parse_error(&self, metadata: &HttpMetadata, body: Option<&[u8]>) -> Option<BoxError> {
        self(metadata, body)
    }
}

// ============================================================================
// Service Error
// ============================================================================

/// Error reported in a service's JSON error body.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (HTTP {code})")]
pub struct ServiceError {
    /// HTTP status code.
    pub code: u16,
    /// Message from the body.
    pub message: String,
    /// The parsed body, for fields beyond the message.
    pub details: Value,
}

// ============================================================================
// JSON Error Parser
// ============================================================================

/// Extracts a [`ServiceError`] from common JSON error layouts.
///
/// Recognized, in order:
/// - `{"error": "..."}`
/// - `{"error": {"message": "..."}}`
/// - `{"errors": [{"message": "..."}]}`
/// - `{"message": "..."}`
/// - `{"errorMessage": "..."}`
/// - `{"description": "..."}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorParser;

impl JsonErrorParser {
    fn message(body: &Value) -> Option<String> {
        let candidates = [
            body.get("error").and_then(Value::as_str),
            body.pointer("/error/message").and_then(Value::as_str),
            body.pointer("/errors/0/message").and_then(Value::as_str),
            body.get("message").and_then(Value::as_str),
            body.get("errorMessage").and_then(Value::as_str),
            body.get("description").and_then(Value::as_str),
        ];
        candidates.into_iter().flatten().next().map(str::to_string)
    }
}

impl ErrorParser for JsonErrorParser {
    fn parse_error(&self, metadata: &HttpMetadata, body: Option<&[u8]>) -> Option<BoxError> {
        let details: Value = serde_json::from_slice(body?).ok()?;
        let message = Self::message(&details)?;
        Some(Box::new(ServiceError {
            code: metadata.status.as_u16(),
            message,
            details,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
