//! Decode strategies: the byte to shape step of every response variant.
//!
//! The fetch layer runs one shared control flow for all variants and hands
//! the successful body to a [`DecodeStrategy`]:
//!
//! | Strategy          | Output            | Body required |
//! |-------------------|-------------------|---------------|
//! | [`RawBytes`]      | [`Bytes`]         | yes           |
//! | [`DynamicJson`]   | `T: FromJson`     | yes           |
//! | [`TypedJson`]     | `T: Deserialize`  | yes           |
//! | [`JsonArray`]     | `Vec<T: FromJson>`| yes           |
//! | [`Utf8String`]    | [`String`]        | yes           |
//! | [`Void`]          | `()`              | no            |

use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;
use crate::json::{FromJson, JsonPath, kind_of};

/// Converts a successful response body into a typed shape.
pub trait DecodeStrategy: Send + Sync {
    /// The decoded shape.
    type Output: Send;

    /// Whether an empty or absent body is a failure for this strategy.
    fn requires_body(&self) -> bool {
        true
    }

    /// Decodes `body`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the body does not have the expected shape.
    fn decode(&self, body: &Bytes) -> Result<Self::Output, DecodeError>;
}

fn parse_tree(body: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(body).map_err(DecodeError::Malformed)
}

// ============================================================================
// Raw Bytes
// ============================================================================

/// Returns the body unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytes;

impl DecodeStrategy for RawBytes {
    type Output = Bytes;

    fn decode(&self, body: &Bytes) -> Result<Bytes, DecodeError> {
        Ok(body.clone())
    }
}

// ============================================================================
// Dynamic JSON
// ============================================================================

/// Parses JSON, follows a path, and decodes the node with [`FromJson`].
#[derive(Debug, Clone)]
pub struct DynamicJson<T> {
    path: JsonPath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DynamicJson<T> {
    /// Decodes the node at `path`.
    pub fn at(path: impl Into<JsonPath>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Decodes the root node.
    pub fn root() -> Self {
        Self::at(JsonPath::new())
    }

    /// The navigation path.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }
}

impl<T: FromJson + Send> DecodeStrategy for DynamicJson<T> {
    type Output = T;

    fn decode(&self, body: &Bytes) -> Result<T, DecodeError> {
        let tree = parse_tree(body)?;
        T::from_json(self.path.navigate(&tree)?)
    }
}

// ============================================================================
// Typed JSON
// ============================================================================

/// Deserializes the whole body with serde. No path navigation.
#[derive(Debug, Clone)]
pub struct TypedJson<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedJson<T> {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedJson<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned + Send> DecodeStrategy for TypedJson<T> {
    type Output = T;

    fn decode(&self, body: &Bytes) -> Result<T, DecodeError> {
        serde_json::from_slice(body).map_err(DecodeError::from_serde)
    }
}

// ============================================================================
// JSON Array
// ============================================================================

/// Parses JSON, follows a path to an array, and decodes every element.
///
/// The first element that fails fails the whole decode.
#[derive(Debug, Clone)]
pub struct JsonArray<T> {
    path: JsonPath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonArray<T> {
    /// Decodes the array at `path`.
    pub fn at(path: impl Into<JsonPath>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Decodes a top-level array.
    pub fn root() -> Self {
        Self::at(JsonPath::new())
    }

    /// The navigation path.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }
}

impl<T: FromJson + Send> DecodeStrategy for JsonArray<T> {
    type Output = Vec<T>;

    fn decode(&self, body: &Bytes) -> Result<Vec<T>, DecodeError> {
        let tree = parse_tree(body)?;
        let node = self.path.navigate(&tree)?;
        if !node.is_array() {
            return Err(DecodeError::TypeMismatch {
                expected: "array",
                found: kind_of(node),
            });
        }
        Vec::<T>::from_json(node)
    }
}

// ============================================================================
// UTF-8 String
// ============================================================================

/// Interprets the body as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8String;

impl DecodeStrategy for Utf8String {
    type Output = String;

    fn decode(&self, body: &Bytes) -> Result<String, DecodeError> {
        Ok(std::str::from_utf8(body)?.to_string())
    }
}

// ============================================================================
// Void
// ============================================================================

/// Ignores the body entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Void;

impl DecodeStrategy for Void {
    type Output = ();

    fn requires_body(&self) -> bool {
        false
    }

    fn decode(&self, _body: &Bytes) -> Result<(), DecodeError> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
