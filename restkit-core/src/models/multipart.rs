//! `multipart/form-data` request bodies.
//!
//! Image classification endpoints take the image file and a JSON parameters
//! document as separate parts of one form.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone)]
struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

/// A `multipart/form-data` body (RFC 7578).
#[derive(Debug, Clone)]
pub struct MultipartFormData {
    boundary: String,
    parts: Vec<Part>,
}

/// Escapes a value used inside a quoted `Content-Disposition` parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl MultipartFormData {
    /// Creates an empty form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("restkit.boundary.{}", Uuid::new_v4().simple()))
    }

    /// Creates an empty form with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Appends a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        });
        self
    }

    /// Appends a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        });
        self
    }

    /// The boundary separating parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the form has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The `Content-Type` header value for this form.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encodes the form body.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(CRLF);

            let mut disposition =
                format!("Content-Disposition: form-data; name=\"{}\"", escape_quoted(&part.name));
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
            }
            buf.put_slice(disposition.as_bytes());
            buf.put_slice(CRLF);

            if let Some(content_type) = &part.content_type {
                buf.put_slice(format!("Content-Type: {content_type}").as_bytes());
                buf.put_slice(CRLF);
            }
            buf.put_slice(CRLF);
            buf.put_slice(&part.data);
            buf.put_slice(CRLF);
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--");
        buf.put_slice(CRLF);
        buf.freeze()
    }
}

impl Default for MultipartFormData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_layout() {
        let form = MultipartFormData::with_boundary("XyZ")
            .text("parameters", r#"{"threshold":0.6}"#)
            .file("images_file", "cat.jpg", "image/jpeg", &b"\xff\xd8"[..]);

        let expected: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"parameters\"\r\n\
\r\n\
{\"threshold\":0.6}\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"images_file\"; filename=\"cat.jpg\"\r\n\
Content-Type: image/jpeg\r\n\
\r\n\
\xff\xd8\r\n\
--XyZ--\r\n";

        assert_eq!(form.to_bytes().as_ref(), expected);
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XyZ");
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn test_quotes_are_escaped() {
        let form = MultipartFormData::with_boundary("b").text("we\"ird", "v");
        let body = String::from_utf8(form.to_bytes().to_vec()).unwrap();
        assert!(body.contains("name=\"we%22ird\""));
    }

    #[test]
    fn test_random_boundaries_differ() {
        assert_ne!(MultipartFormData::new().boundary(), MultipartFormData::new().boundary());
    }
}
