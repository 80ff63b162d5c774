//! Core error types for `RestKit`.

use thiserror::Error;

// ============================================================================
// Core Error
// ============================================================================

/// Error raised while building or materializing a request.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The URL could not be parsed as an absolute locator.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP method is not a valid token.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A header name or value cannot be sent on the wire.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Serialization of a request body failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// Decode Error
// ============================================================================

/// Error raised while turning a response body into a typed shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not syntactically valid JSON.
    #[error("Malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The JSON is valid but does not match the target type.
    #[error("JSON does not match the expected shape: {0}")]
    Schema(#[source] serde_json::Error),

    /// A path segment or object field was not present.
    #[error("Key not found: {key}")]
    KeyNotFound {
        /// The offending key or index.
        key: String,
    },

    /// A node had a different JSON type than expected.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The expected JSON type.
        expected: &'static str,
        /// The JSON type that was found.
        found: &'static str,
    },

    /// One element of an array failed to decode.
    #[error("Element {index} failed to decode: {source}")]
    Element {
        /// Position of the element in the array.
        index: usize,
        /// Why the element failed.
        source: Box<DecodeError>,
    },

    /// The body is not valid UTF-8 text.
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl DecodeError {
    /// Classifies a `serde_json` error into a syntax or shape failure.
    pub fn from_serde(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Data => Self::Schema(err),
            _ => Self::Malformed(err),
        }
    }

    /// Creates a key-not-found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }
}

// ============================================================================
// Auth Error
// ============================================================================

/// Error raised by a credential strategy.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required credential was not supplied.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// A credential was supplied but cannot be used.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Exchanging a credential for a token failed.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
