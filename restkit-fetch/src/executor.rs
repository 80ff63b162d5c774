//! Transport executor and response decoder entry points.
//!
//! Every buffered call runs the same skeleton:
//!
//! 1. authenticate the request with its credential strategy
//! 2. materialize the wire request
//! 3. dispatch through the shared [`HttpTransport`]
//! 4. classify the outcome (transport failure, no response, non-2xx, success)
//! 5. hand a successful body to a [`DecodeStrategy`]
//!
//! Only steps 1-4 ([`RestClient::execute`]) touch the network; the decoder
//! variants differ solely in the strategy passed to [`RestClient::response`].

use std::sync::Arc;

use bytes::Bytes;
use restkit_core::{
    DecodeStrategy, DynamicJson, FromJson, HttpMetadata, JsonArray, JsonPath, RawBytes, Request,
    TypedJson, Utf8String, Void, WireRequest,
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::RestError;
use crate::host::http::{Exchange, HttpClient, HttpTransport};
use crate::host::platform::user_agent;
use crate::parser::ErrorParser;
use crate::settings::ClientSettings;

// ============================================================================
// Rest Response
// ============================================================================

/// Outcome of a call, bundled with whatever response data is available.
///
/// Metadata and raw body are kept even when `result` is an error, so callers
/// can inspect status and headers regardless of how decoding went.
#[derive(Debug)]
pub struct RestResponse<T> {
    /// Status, URL and headers, when a response arrived.
    pub metadata: Option<HttpMetadata>,
    /// Raw body bytes, when available.
    pub data: Option<Bytes>,
    /// Decoded value or the error that ended the call.
    pub result: Result<T, RestError>,
}

impl<T> RestResponse<T> {
    fn failure(metadata: Option<HttpMetadata>, data: Option<Bytes>, error: RestError) -> Self {
        Self {
            metadata,
            data,
            result: Err(error),
        }
    }

    /// HTTP status code, when a response arrived.
    pub fn status(&self) -> Option<u16> {
        self.metadata.as_ref().map(|m| m.status.as_u16())
    }

    /// Returns true if the call succeeded and decoded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The decoded value, if any.
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&RestError> {
        self.result.as_ref().err()
    }

    /// Discards metadata and body.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub fn into_result(self) -> Result<T, RestError> {
        self.result
    }
}

/// Outcome of a download.
#[derive(Debug)]
pub struct DownloadResponse {
    /// Status, URL and headers, when a response arrived.
    pub metadata: Option<HttpMetadata>,
    /// Final path of the file or the error that ended the download.
    pub result: Result<std::path::PathBuf, RestError>,
}

// ============================================================================
// Rest Client
// ============================================================================

/// Single-shot REST executor.
///
/// Cheap to clone; clones share one transport. Requests are independent: the
/// client holds no per-request state.
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    settings: Arc<ClientSettings>,
    user_agent: Arc<str>,
}

impl RestClient {
    /// Creates a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, RestError> {
        Self::builder().build()
    }

    /// Creates a builder for customizing the client.
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }

    /// The settings the client was built with.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// The `User-Agent` sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Authenticates and materializes a request without sending it.
    pub(crate) async fn prepare(&self, request: &Request) -> Result<WireRequest, RestError> {
        let authenticated = request
            .auth()
            .authenticate(request.clone())
            .await
            .inspect_err(|e| warn!(error = %e, "Authentication failed"))?;
        Ok(authenticated.materialize(&self.user_agent)?)
    }

    pub(crate) fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// Authenticates, dispatches and classifies a request.
    ///
    /// On success the body is returned undecoded in `data` (possibly empty).
    /// For a status outside `[200, 300)` the optional `parser` may supply a
    /// domain error; otherwise the error is [`RestError::HttpStatus`].
    #[instrument(
        skip_all,
        fields(method = %request.method(), url = %request.url(), auth = request.auth().name())
    )]
    pub async fn execute(
        &self,
        request: &Request,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<()> {
        let wire = match self.prepare(request).await {
            Ok(wire) => wire,
            Err(e) => return RestResponse::failure(None, None, e),
        };

        let Exchange {
            metadata,
            body,
            error,
        } = self.transport.send(wire).await;

        if let Some(error) = error {
            warn!(error = %error, "Request failed");
            return RestResponse::failure(metadata, body, error.into());
        }

        let Some(metadata) = metadata else {
            warn!("Exchange completed without a response");
            return RestResponse::failure(None, body, RestError::NoResponse);
        };

        if !metadata.is_success() {
            let error = parser
                .and_then(|parser| parser.parse_error(&metadata, body.as_deref()))
                .map_or_else(|| RestError::http_status(metadata.status), RestError::Domain);
            debug!(status = %metadata.status, error = %error, "Unsuccessful status");
            return RestResponse::failure(Some(metadata), body, error);
        }

        debug!(
            status = %metadata.status,
            bytes = body.as_ref().map_or(0, Bytes::len),
            "Request succeeded"
        );
        RestResponse {
            metadata: Some(metadata),
            data: body,
            result: Ok(()),
        }
    }

    /// Executes a request and decodes the body with `strategy`.
    pub async fn response<D: DecodeStrategy>(
        &self,
        request: &Request,
        strategy: D,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<D::Output> {
        let RestResponse {
            metadata,
            data,
            result,
        } = self.execute(request, parser).await;

        if let Err(error) = result {
            return RestResponse::failure(metadata, data, error);
        }

        let result = match &data {
            Some(body) if !body.is_empty() => strategy.decode(body).map_err(RestError::from),
            _ if strategy.requires_body() => Err(RestError::NoData),
            _ => strategy.decode(&Bytes::new()).map_err(RestError::from),
        };

        if let Err(e) = &result {
            warn!(url = %request.url(), error = %e, "Failed to decode response");
        }

        RestResponse {
            metadata,
            data,
            result,
        }
    }

    /// Returns the raw body.
    pub async fn response_data(
        &self,
        request: &Request,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<Bytes> {
        self.response(request, RawBytes, parser).await
    }

    /// Parses JSON, follows `path` and decodes the node with [`FromJson`].
    pub async fn response_object<T: FromJson + Send>(
        &self,
        request: &Request,
        path: impl Into<JsonPath>,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<T> {
        self.response(request, DynamicJson::<T>::at(path), parser).await
    }

    /// Deserializes the whole body with serde.
    pub async fn response_decodable<T: DeserializeOwned + Send>(
        &self,
        request: &Request,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<T> {
        self.response(request, TypedJson::<T>::new(), parser).await
    }

    /// Parses JSON, follows `path` to an array and decodes every element.
    pub async fn response_array<T: FromJson + Send>(
        &self,
        request: &Request,
        path: impl Into<JsonPath>,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<Vec<T>> {
        self.response(request, JsonArray::<T>::at(path), parser).await
    }

    /// Returns the body as UTF-8 text.
    pub async fn response_string(
        &self,
        request: &Request,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<String> {
        self.response(request, Utf8String, parser).await
    }

    /// Succeeds on any 2xx status, ignoring the body.
    pub async fn response_void(
        &self,
        request: &Request,
        parser: Option<&dyn ErrorParser>,
    ) -> RestResponse<()> {
        self.response(request, Void, parser).await
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("settings", &self.settings)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Rest Client Builder
// ============================================================================

/// Builder for constructing a [`RestClient`].
pub struct RestClientBuilder {
    settings: ClientSettings,
    transport: Option<Arc<dyn HttpTransport>>,
    http: Option<reqwest::Client>,
}

impl RestClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            settings: ClientSettings::default(),
            transport: None,
            http: None,
        }
    }

    /// Sets the client settings.
    #[must_use]
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the SDK name and version reported in the `User-Agent`.
    #[must_use]
    pub fn sdk(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.settings = self.settings.with_sdk(name, version);
        self
    }

    /// Uses a custom transport instead of the `reqwest` one.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses an existing `reqwest` client. Timeout settings are then ignored.
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn build(self) -> Result<RestClient, RestError> {
        let transport: Arc<dyn HttpTransport> = match (self.transport, self.http) {
            (Some(transport), _) => transport,
            (None, Some(client)) => Arc::new(HttpClient::from_client(client)),
            (None, None) => Arc::new(HttpClient::new(&self.settings)?),
        };

        let user_agent: Arc<str> =
            user_agent(&self.settings.sdk_name, &self.settings.sdk_version).into();

        Ok(RestClient {
            transport,
            settings: Arc::new(self.settings),
            user_agent,
        })
    }
}

impl Default for RestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
