//! Request construction and wire materialization.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use url::{Url, form_urlencoded};

use super::multipart::MultipartFormData;
use crate::error::CoreError;
use crate::traits::Authenticator;

// ============================================================================
// Query Item
// ============================================================================

/// A single query parameter. Order of items is preserved on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    /// Parameter name.
    pub name: String,
    /// Parameter value. `None` emits the bare name.
    pub value: Option<String>,
}

impl QueryItem {
    /// Creates a `name=value` item.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Creates a valueless item.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// Percent-encodes one query component.
///
/// A literal `+` is always written as `%2B` and a space as `%20`, so
/// neither can be confused with the form-encoding convention on the server.
fn encode_component(raw: &str) -> String {
    // byte_serialize already emits `%2B` for `+`; the only `+` left is a space
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Encodes query items into a query string without the leading `?`.
pub fn encode_query(items: &[QueryItem]) -> String {
    items
        .iter()
        .map(|item| match &item.value {
            Some(value) => format!("{}={}", encode_component(&item.name), encode_component(value)),
            None => encode_component(&item.name),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Builder input that could not be turned into wire types.
///
/// Building never fails; the first rejection is reported by
/// [`Request::materialize`].
#[derive(Debug, Clone)]
enum Rejected {
    Method(String),
    Header(String),
}

impl From<Rejected> for CoreError {
    fn from(rejected: Rejected) -> Self {
        match rejected {
            Rejected::Method(msg) => Self::InvalidMethod(msg),
            Rejected::Header(msg) => Self::InvalidHeader(msg),
        }
    }
}

/// Parses and inserts one header, replacing any value under the same name.
fn insert_header<K, V>(
    headers: &mut HeaderMap,
    rejected: &mut Option<Rejected>,
    name: K,
    value: V,
) where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
{
    let name = HeaderName::try_from(name).map_err(Into::<http::Error>::into);
    let value = HeaderValue::try_from(value).map_err(Into::<http::Error>::into);
    match (name, value) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        (Err(e), _) | (_, Err(e)) => {
            rejected.get_or_insert(Rejected::Header(e.to_string()));
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// Immutable description of a REST call.
///
/// Built once per call site with [`Request::builder`]. Credential strategies
/// derive authenticated copies through [`Request::with_header`] and
/// [`Request::with_query_item`]; the original is never mutated.
#[derive(Clone)]
pub struct Request {
    method: Method,
    url: String,
    auth: Arc<dyn Authenticator>,
    headers: HeaderMap,
    query_items: Vec<QueryItem>,
    body: Option<Bytes>,
    rejected: Option<Rejected>,
}

impl Request {
    /// Starts building a request.
    ///
    /// `method` may be a [`Method`] or its name. A name that is not a valid
    /// token is reported by [`Request::materialize`].
    pub fn builder<M>(
        method: M,
        url: impl Into<String>,
        auth: Arc<dyn Authenticator>,
    ) -> RequestBuilder
    where
        Method: TryFrom<M>,
        <Method as TryFrom<M>>::Error: Into<http::Error>,
    {
        let (method, rejected) = match Method::try_from(method) {
            Ok(method) => (method, None),
            Err(e) => {
                let e: http::Error = e.into();
                (Method::GET, Some(Rejected::Method(e.to_string())))
            }
        };

        RequestBuilder {
            method,
            url: url.into(),
            auth,
            headers: HeaderMap::new(),
            accept: None,
            content_type: None,
            query_items: Vec::new(),
            body: None,
            rejected,
        }
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URL without the query items.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The credential strategy for this request.
    pub fn auth(&self) -> &Arc<dyn Authenticator> {
        &self.auth
    }

    /// Request headers, including merged `Accept`/`Content-Type`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Query items in wire order.
    pub fn query_items(&self) -> &[QueryItem] {
        &self.query_items
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns a copy with an extra header (replacing any same-named one).
    #[must_use]
    pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        insert_header(&mut self.headers, &mut self.rejected, name, value);
        self
    }

    /// Returns a copy with an extra query item appended.
    #[must_use]
    pub fn with_query_item(mut self, item: QueryItem) -> Self {
        self.query_items.push(item);
        self
    }

    /// Produces the wire request: encoded URL, validated method and headers,
    /// and the fixed `User-Agent` written last.
    ///
    /// Every `+` left in the final query is sent as `%2B`, including one
    /// that was already part of the URL.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUrl`] if the URL is not an absolute
    /// locator with a host, [`CoreError::InvalidMethod`] for a malformed
    /// method and [`CoreError::InvalidHeader`] for headers that cannot be
    /// sent.
    pub fn materialize(&self, user_agent: &str) -> Result<WireRequest, CoreError> {
        if let Some(rejected) = &self.rejected {
            return Err(rejected.clone().into());
        }

        let mut url = Url::parse(&self.url)
            .map_err(|e| CoreError::InvalidUrl(format!("{}: {e}", self.url)))?;
        if !url.has_host() {
            return Err(CoreError::InvalidUrl(format!("{}: missing host", self.url)));
        }

        let mut query = url.query().unwrap_or_default().to_string();
        if !self.query_items.is_empty() {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&encode_query(&self.query_items));
        }
        if !query.is_empty() {
            url.set_query(Some(&query.replace('+', "%2B")));
        }

        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| CoreError::InvalidHeader(format!("{USER_AGENT}: {e}")))?;
        let mut headers = self.headers.clone();
        headers.remove(USER_AGENT);
        headers.insert(USER_AGENT, user_agent);

        Ok(WireRequest {
            method: self.method.clone(),
            url,
            headers,
            body: self.body.clone(),
        })
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("auth", &self.auth.name())
            .field("headers", &self.headers)
            .field("query_items", &self.query_items)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .finish()
    }
}

// ============================================================================
// Request Builder
// ============================================================================

/// Builder for [`Request`].
pub struct RequestBuilder {
    method: Method,
    url: String,
    auth: Arc<dyn Authenticator>,
    headers: HeaderMap,
    accept: Option<String>,
    content_type: Option<String>,
    query_items: Vec<QueryItem>,
    body: Option<Bytes>,
    rejected: Option<Rejected>,
}

impl RequestBuilder {
    /// Adds a header, replacing any earlier value under the same name.
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        insert_header(&mut self.headers, &mut self.rejected, name, value);
        self
    }

    /// Adds several headers.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        for (name, value) in headers {
            insert_header(&mut self.headers, &mut self.rejected, name, value);
        }
        self
    }

    /// Sets the `Accept` header. Overrides any `Accept` passed via `header`.
    #[must_use]
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Sets the `Content-Type` header. Overrides any passed via `header`.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Appends a `name=value` query item.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_items.push(QueryItem::new(name, value));
        self
    }

    /// Appends several query items.
    #[must_use]
    pub fn query_items(mut self, items: impl IntoIterator<Item = QueryItem>) -> Self {
        self.query_items.extend(items);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body and sets `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, CoreError> {
        self.body = Some(Bytes::from(serde_json::to_vec(value)?));
        self.content_type = Some("application/json".to_string());
        Ok(self)
    }

    /// Uses a multipart form as the body and sets `Content-Type` with its boundary.
    #[must_use]
    pub fn multipart(mut self, form: &MultipartFormData) -> Self {
        self.body = Some(form.to_bytes());
        self.content_type = Some(form.content_type());
        self
    }

    /// Builds the request, merging `accept`/`content_type` into the headers.
    pub fn build(self) -> Request {
        let mut headers = self.headers;
        let mut rejected = self.rejected;
        if let Some(accept) = self.accept {
            insert_header(&mut headers, &mut rejected, ACCEPT, accept);
        }
        if let Some(content_type) = self.content_type {
            insert_header(&mut headers, &mut rejected, CONTENT_TYPE, content_type);
        }

        Request {
            method: self.method,
            url: self.url,
            auth: self.auth,
            headers,
            query_items: self.query_items,
            body: self.body,
            rejected,
        }
    }
}

// ============================================================================
// Wire Request
// ============================================================================

/// A fully materialized request ready for network dispatch.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// HTTP method.
    pub method: Method,
    /// Final URL including the encoded query.
    pub url: Url,
    /// Final headers, `User-Agent` included.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoAuth;

    const UA: &str = "restkit/0.1.0 Linux/6.1";

    fn get(url: &str) -> RequestBuilder {
        Request::builder(Method::GET, url, Arc::new(NoAuth))
    }

    #[test]
    fn test_plus_is_escaped_in_query() {
        let request = get("https://api.example.com/v3/classify")
            .query("text", "1+1 = 2")
            .build();

        let wire = request.materialize(UA).unwrap();
        assert_eq!(wire.url.query(), Some("text=1%2B1%20%3D%202"));
        assert!(!wire.url.as_str().contains('+'));
    }

    #[test]
    fn test_plus_in_url_query_is_escaped() {
        let wire = get("https://api.example.com/classify?text=1+1")
            .query("extra", "x")
            .build()
            .materialize(UA)
            .unwrap();
        assert_eq!(wire.url.query(), Some("text=1%2B1&extra=x"));

        let wire = get("https://api.example.com/classify?text=a+b")
            .build()
            .materialize(UA)
            .unwrap();
        assert_eq!(wire.url.as_str(), "https://api.example.com/classify?text=a%2Bb");
    }

    #[test]
    fn test_query_items_append_to_existing_query() {
        let request = get("https://api.example.com/v3/classify?version=2018-03-19")
            .query("classifier_ids", "food,default")
            .query_items([QueryItem::flag("verbose")])
            .build();

        let wire = request.materialize(UA).unwrap();
        assert_eq!(
            wire.url.query(),
            Some("version=2018-03-19&classifier_ids=food%2Cdefault&verbose")
        );
    }

    #[test]
    fn test_no_query_items_leaves_url_untouched() {
        let wire = get("https://api.example.com/a/b").build().materialize(UA).unwrap();
        assert_eq!(wire.url.as_str(), "https://api.example.com/a/b");
    }

    #[test]
    fn test_accept_and_content_type_override_headers() {
        let request = get("https://api.example.com")
            .accept("application/json")
            .header("accept", "text/html")
            .header("Content-Type", "text/plain")
            .content_type("image/jpeg")
            .build();

        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert_eq!(request.headers()["content-type"], "image/jpeg");
        assert_eq!(request.headers().len(), 2);
    }

    #[test]
    fn test_user_agent_cannot_be_overridden() {
        let request = get("https://api.example.com")
            .header("user-agent", "curl/8.0")
            .header("X-Watson-Learning-Opt-Out", "true")
            .build();

        let wire = request.materialize(UA).unwrap();
        assert_eq!(wire.headers[USER_AGENT], UA);
        assert_eq!(wire.headers.get_all(USER_AGENT).iter().count(), 1);
        assert_eq!(wire.headers["x-watson-learning-opt-out"], "true");
        assert_eq!(wire.headers.len(), 2);
    }

    #[test]
    fn test_invalid_url() {
        let err = get("not a url").build().materialize(UA).unwrap_err();
        assert!(matches!(err, CoreError::InvalidUrl(_)));

        let err = get("mailto:someone@example.com").build().materialize(UA).unwrap_err();
        assert!(matches!(err, CoreError::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_method_and_header() {
        let err = Request::builder("GE T", "https://example.com", Arc::new(NoAuth))
            .build()
            .materialize(UA)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidMethod(_)));

        let err = get("https://example.com")
            .header("X-Bad", "a\r\nInjected: 1")
            .build()
            .materialize(UA)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidHeader(_)));

        let err = get("https://example.com")
            .header("Bad Name", "v")
            .build()
            .materialize(UA)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidHeader(_)));
    }

    #[test]
    fn test_method_by_name() {
        let request = Request::builder("PATCH", "https://example.com", Arc::new(NoAuth)).build();
        assert_eq!(request.method(), Method::PATCH);
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = Request::builder(Method::POST, "https://example.com", Arc::new(NoAuth))
            .json(&serde_json::json!({"name": "dogs"}))
            .unwrap()
            .build();

        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body().unwrap().as_ref(), br#"{"name":"dogs"}"#);
    }

    #[test]
    fn test_with_header_returns_new_value() {
        let request = get("https://example.com").build();
        let authed = request.clone().with_header("Authorization", "Bearer t");

        assert!(request.headers().get("Authorization").is_none());
        assert_eq!(authed.headers()["authorization"], "Bearer t");
    }
}
