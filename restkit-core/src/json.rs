//! JSON path navigation and the [`FromJson`] decoding contract.
//!
//! Dynamic decoding works on a parsed [`serde_json::Value`] tree: a
//! [`JsonPath`] locates a sub-node, and [`FromJson`] turns that node into a
//! Rust value. Paths have no depth limit.
//!
//! ```
//! use restkit_core::json::{self, FromJson, JsonPath};
//! use restkit_core::DecodeError;
//! use serde_json::{Value, json};
//!
//! struct Class {
//!     name: String,
//!     score: f64,
//! }
//!
//! impl FromJson for Class {
//!     fn from_json(json: &Value) -> Result<Self, DecodeError> {
//!         Ok(Self {
//!             name: json::field(json, "class")?,
//!             score: json::field(json, "score")?,
//!         })
//!     }
//! }
//!
//! let body = json!({"images": [{"classes": [{"class": "cat", "score": 0.9}]}]});
//! let path = JsonPath::new().key("images").index(0).key("classes").index(0);
//! let class: Class = json::decode_at(&body, &path).unwrap();
//! assert_eq!(class.name, "cat");
//! ```

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::error::DecodeError;

// ============================================================================
// Path
// ============================================================================

/// One step of a [`JsonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member name.
    Key(String),
    /// Array position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        Self::Index(idx)
    }
}

/// Ordered sequence of keys and indices into a JSON tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// The empty path, pointing at the root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an object key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Appends an array index.
    #[must_use]
    pub fn index(mut self, idx: usize) -> Self {
        self.segments.push(PathSegment::Index(idx));
        self
    }

    /// The segments in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true for the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Follows the path from `root`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::KeyNotFound`] naming the first segment that
    /// does not resolve: a missing key, an out-of-range index, or a step
    /// into a node of the wrong kind.
    pub fn navigate<'a>(&self, root: &'a Value) -> Result<&'a Value, DecodeError> {
        self.segments.iter().try_fold(root, |node, segment| {
            let next = match (segment, node) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(idx), Value::Array(items)) => items.get(*idx),
                _ => None,
            };
            next.ok_or_else(|| DecodeError::key_not_found(segment.to_string()))
        })
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for JsonPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<PathSegment>, const N: usize> From<[S; N]> for JsonPath {
    fn from(segments: [S; N]) -> Self {
        segments.into_iter().collect()
    }
}

impl From<Vec<PathSegment>> for JsonPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

// ============================================================================
// FromJson
// ============================================================================

/// Decodes a value from a node of a parsed JSON tree.
pub trait FromJson: Sized {
    /// Builds `Self` from `json`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the node has the wrong shape.
    fn from_json(json: &Value) -> Result<Self, DecodeError>;
}

/// Name of the JSON type of `value`, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &'static str, found: &Value) -> DecodeError {
    DecodeError::TypeMismatch {
        expected,
        found: kind_of(found),
    }
}

/// Decodes the member `key` of an object.
///
/// # Errors
///
/// Returns [`DecodeError::KeyNotFound`] if the member is absent, or the
/// member's own decode error.
pub fn field<T: FromJson>(json: &Value, key: &str) -> Result<T, DecodeError> {
    match json.get(key) {
        Some(value) => T::from_json(value),
        None => Err(DecodeError::key_not_found(key)),
    }
}

/// Decodes the member `key`, treating absent and `null` as `None`.
///
/// # Errors
///
/// Returns the member's decode error if it is present and malformed.
pub fn optional_field<T: FromJson>(json: &Value, key: &str) -> Result<Option<T>, DecodeError> {
    match json.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::from_json(value).map(Some),
    }
}

/// Navigates `path` from `root` and decodes the node found there.
///
/// # Errors
///
/// Returns the navigation or decode error.
pub fn decode_at<T: FromJson>(root: &Value, path: &JsonPath) -> Result<T, DecodeError> {
    T::from_json(path.navigate(root)?)
}

impl FromJson for Value {
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        Ok(json.clone())
    }
}

impl FromJson for String {
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        json.as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", json))
    }
}

impl FromJson for bool {
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        json.as_bool().ok_or_else(|| mismatch("boolean", json))
    }
}

macro_rules! impl_from_json_int {
    ($accessor:ident => $($ty:ty),*) => {
        $(
            impl FromJson for $ty {
                fn from_json(json: &Value) -> Result<Self, DecodeError> {
                    json.$accessor()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| mismatch(stringify!($ty), json))
                }
            }
        )*
    };
}

impl_from_json_int!(as_i64 => i8, i16, i32, i64, isize);
impl_from_json_int!(as_u64 => u8, u16, u32, u64, usize);

impl FromJson for f64 {
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        json.as_f64().ok_or_else(|| mismatch("number", json))
    }
}

impl FromJson for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        f64::from_json(json).map(|n| n as f32)
    }
}

impl<T: FromJson> FromJson for Option<T> {
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        match json {
            Value::Null => Ok(None),
            other => T::from_json(other).map(Some),
        }
    }
}

impl<T: FromJson> FromJson for Vec<T> {
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        let items = json.as_array().ok_or_else(|| mismatch("array", json))?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                T::from_json(item).map_err(|e| DecodeError::Element {
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }
}

impl<T: FromJson> FromJson for HashMap<String, T> {
    fn from_json(json: &Value) -> Result<Self, DecodeError> {
        let map = json.as_object().ok_or_else(|| mismatch("object", json))?;
        map.iter()
            .map(|(key, value)| Ok((key.clone(), T::from_json(value)?)))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
