//! Request and response models.

mod multipart;
mod request;
mod response;

pub use multipart::MultipartFormData;
pub use request::{QueryItem, Request, RequestBuilder, WireRequest, encode_query};
pub use response::HttpMetadata;
