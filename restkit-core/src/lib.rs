// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RestKit` Core
//!
//! Core types, decoding contracts, and credential traits for `RestKit`.
//!
//! This crate holds everything about a REST exchange that does not touch the
//! network:
//!
//! - Request construction and wire materialization (query encoding,
//!   header merging, `User-Agent` injection)
//! - JSON path navigation and the [`FromJson`] decoding contract
//! - The six decode strategies used by the fetch layer
//! - Multipart form-data bodies
//! - The [`Authenticator`] trait plus the static credential strategies
//!
//! ## Key Types
//!
//! ### Requests
//! - [`Request`] / [`RequestBuilder`] - Immutable request description
//! - [`WireRequest`] - Fully materialized request ready for dispatch
//! - [`QueryItem`] - Ordered query parameter
//! - [`MultipartFormData`] - `multipart/form-data` body builder
//!
//! ### Responses
//! - [`HttpMetadata`] - Status, final URL and headers of a response
//! - [`DecodeStrategy`] - Byte to shape conversion
//! - [`JsonPath`] - Path into a parsed JSON tree
//!
//! ### Credentials
//! - [`Authenticator`] - Attaches credentials to a request
//! - [`NoAuth`], [`BasicAuth`], [`BearerToken`], [`ApiKey`]

pub mod auth;
pub mod decode;
pub mod error;
pub mod json;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::{AuthError, CoreError, DecodeError};

// Re-export model types
pub use models::{
    // Request types
    QueryItem,
    Request,
    RequestBuilder,
    WireRequest,
    // Response types
    HttpMetadata,
    // Bodies
    MultipartFormData,
};

// Re-export decoding
pub use decode::{DecodeStrategy, DynamicJson, JsonArray, RawBytes, TypedJson, Utf8String, Void};
pub use json::{FromJson, JsonPath, PathSegment};

// Re-export credentials
pub use auth::{ApiKey, ApiKeyLocation, BasicAuth, BearerToken, NoAuth};
pub use traits::Authenticator;

// Re-export so implementors and transports share our types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use serde_json::Value;
