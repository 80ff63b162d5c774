//! Response metadata.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// Status line and headers of an HTTP response.
///
/// Returned alongside every decode outcome so callers can inspect the
/// response even when decoding failed. Header values are kept as received,
/// including repeated and non-UTF-8 values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMetadata {
    /// HTTP status code.
    pub status: StatusCode,
    /// Final URL after redirects.
    pub url: String,
    /// Response headers.
    pub headers: HeaderMap,
}

impl HttpMetadata {
    /// Creates metadata with no headers.
    pub fn new(status: StatusCode, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Appends a header value, keeping earlier values under the same name.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns true for status codes in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the first value of a header if it is valid UTF-8.
    ///
    /// Use [`HttpMetadata::headers`] for raw bytes and repeated values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;

    fn status(code: u16) -> HttpMetadata {
        HttpMetadata::new(StatusCode::from_u16(code).unwrap(), "")
    }

    #[test]
    fn test_success_range() {
        assert!(!status(199).is_success());
        assert!(status(200).is_success());
        assert!(status(204).is_success());
        assert!(status(299).is_success());
        assert!(!status(300).is_success());
        assert!(!status(404).is_success());
    }

    #[test]
    fn test_repeated_and_opaque_headers() {
        let metadata = HttpMetadata::new(StatusCode::OK, "https://api.example.com")
            .with_header(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"))
            .with_header(SET_COOKIE, HeaderValue::from_static("b=2; Expires=Wed, 21 Oct 2015"))
            .with_header(
                HeaderName::from_static("x-filename"),
                HeaderValue::from_bytes(b"caf\xe9.jpg").unwrap(),
            );

        let cookies: Vec<_> = metadata.headers.get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(metadata.header("set-cookie"), Some("a=1; Path=/"));

        assert_eq!(metadata.header("x-filename"), None);
        assert_eq!(metadata.headers["x-filename"].as_bytes(), b"caf\xe9.jpg");
    }
}
