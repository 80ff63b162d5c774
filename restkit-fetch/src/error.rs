//! Fetch error types.

use std::fmt;

use restkit_core::{AuthError, CoreError, DecodeError, StatusCode};
use thiserror::Error;

/// Boxed error produced by domain-error parsers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Main Rest Error
// ============================================================================

/// Error type for a single REST call. Every variant is terminal: nothing is
/// retried.
#[derive(Debug, Error)]
pub enum RestError {
    /// The credential strategy rejected the request. No network call was made.
    #[error("Credential error: {0}")]
    Credential(#[from] AuthError),

    /// The request could not be materialized. No network call was made.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    /// Network-layer failure (DNS, TLS, connection, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Dispatch completed without a valid HTTP response.
    #[error("No valid HTTP response")]
    NoResponse,

    /// Status outside `[200, 300)` with no domain error available.
    #[error("HTTP {code}: {message}")]
    HttpStatus {
        /// Status code.
        code: u16,
        /// Standard reason phrase.
        message: String,
    },

    /// Service-specific error produced by a caller-supplied parser.
    #[error("{0}")]
    Domain(BoxError),

    /// Success status but the body was empty where one was required.
    #[error("Response contained no data")]
    NoData,

    /// The body could not be decoded into the requested shape.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Moving a downloaded file into place failed.
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    /// A downloaded temporary file was missing.
    #[error("Invalid file: {0}")]
    InvalidFile(String),
}

impl RestError {
    /// Builds an [`RestError::HttpStatus`] with the standard reason phrase.
    pub fn http_status(status: StatusCode) -> Self {
        Self::HttpStatus {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown status").to_string(),
        }
    }

    /// Status code of an [`RestError::HttpStatus`] error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for network-layer failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Downcasts a domain error to the parser's concrete type.
    pub fn domain_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Domain(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// Category of a network-layer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not connect (DNS, refused, TLS handshake).
    Connect,
    /// The request or a read timed out.
    Timeout,
    /// Too many redirects or a redirect loop.
    Redirect,
    /// Reading the response body failed.
    Body,
    /// The request could not be built or sent.
    Request,
    /// Anything else.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Redirect => "redirect",
            Self::Body => "body",
            Self::Request => "request",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A network-layer failure with the underlying message kept verbatim.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Message from the HTTP stack.
    pub message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// Creates a transport error without an underlying source.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_redirect() {
            TransportErrorKind::Redirect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_request() || err.is_builder() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };

        Self {
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
