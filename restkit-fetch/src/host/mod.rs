//! Host APIs for `RestKit`.
//!
//! - [`http`] - The [`HttpTransport`] seam and its `reqwest` implementation
//! - [`platform`] - Operating system identification for the `User-Agent`

pub mod http;
pub mod platform;

// Re-export key types
pub use http::{BodyStream, Exchange, HttpClient, HttpTransport, StreamingResponse};
pub use platform::user_agent;
