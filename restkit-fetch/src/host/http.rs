//! HTTP transport with tracing.
//!
//! [`HttpTransport`] is the only seam through which requests reach the
//! network. [`HttpClient`] implements it over a single shared
//! [`reqwest::Client`], which is safe for concurrent dispatch: clone the
//! transport (or the `RestClient` holding it) freely across tasks.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use restkit_core::{HttpMetadata, WireRequest};
use tracing::{debug, instrument, warn};

use crate::error::{RestError, TransportError};
use crate::settings::ClientSettings;

/// Response body delivered chunk by chunk.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

// ============================================================================
// Exchange
// ============================================================================

/// Raw result of a buffered dispatch.
///
/// Any combination of fields may be present: a body read can fail after the
/// status line arrived, in which case `metadata` and `error` are both set.
#[derive(Debug, Default)]
pub struct Exchange {
    /// Status and headers, if a response arrived.
    pub metadata: Option<HttpMetadata>,
    /// Body bytes read so far.
    pub body: Option<Bytes>,
    /// Network-layer failure, if any.
    pub error: Option<TransportError>,
}

impl Exchange {
    /// A complete response.
    pub fn response(metadata: HttpMetadata, body: Bytes) -> Self {
        Self {
            metadata: Some(metadata),
            body: Some(body),
            error: None,
        }
    }

    /// A failure before any response arrived.
    pub fn failed(error: TransportError) -> Self {
        Self {
            metadata: None,
            body: None,
            error: Some(error),
        }
    }
}

/// A response whose body has not been read yet.
pub struct StreamingResponse {
    /// Status and headers.
    pub metadata: HttpMetadata,
    /// Body chunks.
    pub body: BodyStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Dispatches materialized requests.
///
/// Implementations must tolerate concurrent calls from many tasks.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and buffers the whole body.
    async fn send(&self, request: WireRequest) -> Exchange;

    /// Sends the request and returns the body as a stream.
    ///
    /// `Ok(None)` means the exchange completed without a usable response.
    async fn open(&self, request: WireRequest) -> Result<Option<StreamingResponse>, TransportError>;
}

// ============================================================================
// HTTP Client
// ============================================================================

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a client configured from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Transport`] if the TLS backend cannot be
    /// initialized.
    pub fn new(settings: &ClientSettings) -> Result<Self, RestError> {
        let mut builder = Client::builder()
            .timeout(settings.timeout())
            .connect_timeout(settings.connect_timeout());

        if settings.allow_insecure_connections {
            warn!(
                "TLS certificate verification disabled - connections are open to \
                interception. DO NOT USE IN PRODUCTION."
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(TransportError::from)?;
        Ok(Self { inner: client })
    }

    /// Wraps an existing `reqwest` client.
    pub fn from_client(client: Client) -> Self {
        Self { inner: client }
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    fn to_reqwest(&self, request: WireRequest) -> reqwest::RequestBuilder {
        let builder = self
            .inner
            .request(request.method, request.url)
            .headers(request.headers);
        match request.body {
            Some(body) => builder.body(body),
            None => builder,
        }
    }
}

/// Extracts status, final URL and headers as received.
fn metadata(response: &Response) -> HttpMetadata {
    HttpMetadata {
        status: response.status(),
        url: response.url().to_string(),
        headers: response.headers().clone(),
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: WireRequest) -> Exchange {
        debug!("Sending request");
        let response = match self.to_reqwest(request).send().await {
            Ok(response) => response,
            Err(e) => return Exchange::failed(e.into()),
        };

        let metadata = metadata(&response);
        debug!(status = %metadata.status, "Response received");

        match response.bytes().await {
            Ok(body) => Exchange::response(metadata, body),
            Err(e) => Exchange {
                metadata: Some(metadata),
                body: None,
                error: Some(e.into()),
            },
        }
    }

    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn open(&self, request: WireRequest) -> Result<Option<StreamingResponse>, TransportError> {
        debug!("Opening streaming request");
        let response = self.to_reqwest(request).send().await?;
        let metadata = metadata(&response);
        debug!(status = %metadata.status, "Response headers received");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from));

        Ok(Some(StreamingResponse {
            metadata,
            body: Box::pin(body),
        }))
    }
}
