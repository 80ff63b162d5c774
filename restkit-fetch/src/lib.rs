// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RestKit` Fetch
//!
//! HTTP execution, response decoding and downloads for `RestKit`.
//!
//! ## Executor
//!
//! [`RestClient`] is a single-shot request executor. For every call it
//! authenticates the [`Request`](restkit_core::Request), dispatches it, and
//! classifies the outcome into a [`RestError`] or a success. The decoder
//! entry points layer one [`DecodeStrategy`](restkit_core::DecodeStrategy)
//! on top:
//!
//! - [`RestClient::response_data`] - raw bytes
//! - [`RestClient::response_object`] - JSON node at a path, via `FromJson`
//! - [`RestClient::response_decodable`] - serde-typed body
//! - [`RestClient::response_array`] - JSON array at a path
//! - [`RestClient::response_string`] - UTF-8 text
//! - [`RestClient::response_void`] - status only
//! - [`RestClient::download`] - stream the body to a file
//!
//! ## Host APIs
//!
//! - [`host::http`] - [`HttpTransport`] seam and the `reqwest` client
//! - [`host::platform`] - `User-Agent` construction
//!
//! ## Credentials & Errors
//!
//! - [`IamAuthenticator`] - API key to bearer token exchange
//! - [`ErrorParser`] / [`JsonErrorParser`] - domain errors from non-2xx bodies
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use restkit_core::{JsonPath, Request};
//! use restkit_fetch::{IamAuthenticator, JsonErrorParser, RestClient};
//!
//! let client = RestClient::builder().sdk("visual-recognition", "1.0.0").build()?;
//! let auth = Arc::new(IamAuthenticator::new(api_key));
//!
//! let request = Request::builder("GET", format!("{base}/v3/classifiers"), auth)
//!     .accept("application/json")
//!     .query("version", "2018-03-19")
//!     .build();
//!
//! let response = client
//!     .response_array::<Classifier>(&request, ["classifiers"], Some(&JsonErrorParser))
//!     .await;
//! let classifiers = response.into_result()?;
//! ```

// Core modules
mod download;
pub mod error;
pub mod executor;
pub mod host;
pub mod iam;
pub mod parser;
pub mod settings;

// Re-export key types at crate root

// Errors
pub use error::{BoxError, RestError, TransportError, TransportErrorKind};

// Host APIs
pub use host::{
    http::{BodyStream, Exchange, HttpClient, HttpTransport, StreamingResponse},
    platform::user_agent,
};

// Executor
pub use executor::{DownloadResponse, RestClient, RestClientBuilder, RestResponse};
pub use settings::ClientSettings;

// Credentials & parsers
pub use iam::{IamAuthenticator, IamToken};
pub use parser::{ErrorParser, JsonErrorParser, ServiceError};
