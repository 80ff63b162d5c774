//! Executor classification against a scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use restkit_core::{
    BasicAuth, BearerToken, HttpMetadata, JsonPath, NoAuth, Request, StatusCode, WireRequest,
};
use restkit_fetch::{
    Exchange, HttpTransport, RestClient, RestError, StreamingResponse, TransportError,
    TransportErrorKind,
};

enum Scripted {
    Exchange(Exchange),
    Stream(Result<Option<StreamingResponse>, TransportError>),
}

/// Replays scripted outcomes in order and records what was sent.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
    fn with(outcomes: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn next(&self) -> Scripted {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more often than scripted")
    }

    fn sent(&self) -> Vec<WireRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: WireRequest) -> Exchange {
        self.sent.lock().unwrap().push(request);
        match self.next() {
            Scripted::Exchange(exchange) => exchange,
            Scripted::Stream(_) => panic!("expected a buffered exchange"),
        }
    }

    async fn open(
        &self,
        request: WireRequest,
    ) -> Result<Option<StreamingResponse>, TransportError> {
        self.sent.lock().unwrap().push(request);
        match self.next() {
            Scripted::Stream(outcome) => outcome,
            Scripted::Exchange(_) => panic!("expected a streaming exchange"),
        }
    }
}

fn client(transport: Arc<ScriptedTransport>) -> RestClient {
    RestClient::builder()
        .sdk("scripted", "1.2.3")
        .transport(transport)
        .build()
        .unwrap()
}

fn request() -> Request {
    Request::builder("GET", "https://api.example.com/v3/classifiers", Arc::new(NoAuth))
        .query("verbose", "true")
        .build()
}

fn ok(body: &'static str) -> Scripted {
    Scripted::Exchange(Exchange::response(
        HttpMetadata::new(StatusCode::OK, "https://api.example.com/v3/classifiers"),
        Bytes::from_static(body.as_bytes()),
    ))
}

#[tokio::test]
async fn test_missing_metadata_is_no_response() {
    let transport = ScriptedTransport::with([Scripted::Exchange(Exchange::default())]);
    let response = client(transport).response_string(&request(), None).await;

    assert!(matches!(response.result, Err(RestError::NoResponse)));
    assert!(response.metadata.is_none());
}

#[tokio::test]
async fn test_transport_error_keeps_partial_response() {
    let transport = ScriptedTransport::with([Scripted::Exchange(Exchange {
        metadata: Some(HttpMetadata::new(StatusCode::OK, "https://api.example.com/v3/classifiers")),
        body: Some(Bytes::from_static(b"{\"classif")),
        error: Some(TransportError::new(TransportErrorKind::Body, "connection reset")),
    })]);

    let response = client(transport).response_data(&request(), None).await;

    match &response.result {
        Err(RestError::Transport(e)) => assert_eq!(e.kind, TransportErrorKind::Body),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(response.status(), Some(200));
    assert_eq!(response.data.as_deref(), Some(&b"{\"classif"[..]));
}

#[tokio::test]
async fn test_wire_request_shape() {
    let transport = ScriptedTransport::with([ok("{}")]);
    let client = client(transport.clone());

    let request = Request::builder(
        "POST",
        "https://api.example.com/v3/classify?version=2018-03-19",
        Arc::new(BearerToken::new("abc")),
    )
    .query("text", "a+b c")
    .json(&serde_json::json!({"threshold": 0.5}))
    .unwrap()
    .build();

    let response = client.response_data(&request, None).await;
    assert!(response.is_success());

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let wire = &sent[0];
    assert_eq!(wire.method, "POST");
    assert_eq!(wire.url.query(), Some("version=2018-03-19&text=a%2Bb%20c"));
    assert_eq!(wire.headers["authorization"], "Bearer abc");
    assert!(wire.headers["authorization"].is_sensitive());
    assert_eq!(wire.headers["content-type"], "application/json");
    assert_eq!(wire.headers["user-agent"], client.user_agent());
    assert_eq!(wire.headers.get_all("user-agent").iter().count(), 1);
    assert!(client.user_agent().starts_with("scripted/1.2.3 "));
    assert_eq!(wire.body.as_deref(), Some(&b"{\"threshold\":0.5}"[..]));
}

#[tokio::test]
async fn test_plus_already_in_url_is_escaped() {
    let transport = ScriptedTransport::with([ok("{}")]);
    let request = Request::builder(
        "GET",
        "https://api.example.com/v3/classify?text=1+1",
        Arc::new(NoAuth),
    )
    .build();

    let response = client(transport.clone()).response_void(&request, None).await;
    assert!(response.is_success());

    let sent = transport.sent();
    assert_eq!(sent[0].url.query(), Some("text=1%2B1"));
}

#[tokio::test]
async fn test_caller_user_agent_is_replaced() {
    let transport = ScriptedTransport::with([ok("{}")]);
    let client = client(transport.clone());
    let request = Request::builder("GET", "https://api.example.com/", Arc::new(NoAuth))
        .header("User-Agent", "spoofed/1.0")
        .header("user-agent", "spoofed/2.0")
        .build();

    let response = client.response_void(&request, None).await;
    assert!(response.is_success());

    let sent = transport.sent();
    let agents: Vec<_> = sent[0].headers.get_all("user-agent").iter().collect();
    assert_eq!(agents, vec![client.user_agent()]);
}

#[tokio::test]
async fn test_credential_failure_never_dispatches() {
    let transport = Arc::new(ScriptedTransport::default());
    let request = Request::builder(
        "GET",
        "https://api.example.com/v3/classifiers",
        Arc::new(BasicAuth::new("", "secret")),
    )
    .build();

    let response = client(transport.clone()).response_void(&request, None).await;

    assert!(matches!(response.result, Err(RestError::Credential(_))));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_header_never_dispatches() {
    let transport = Arc::new(ScriptedTransport::default());
    let request = Request::builder("GET", "https://api.example.com/", Arc::new(NoAuth))
        .header("X-Bad", "line\r\nInjected: yes")
        .build();

    let response = client(transport.clone()).response_void(&request, None).await;

    assert!(matches!(response.result, Err(RestError::InvalidRequest(_))));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_method_never_dispatches() {
    let transport = Arc::new(ScriptedTransport::default());
    let request = Request::builder("GE T", "https://api.example.com/", Arc::new(NoAuth)).build();

    let response = client(transport.clone()).response_void(&request, None).await;

    assert!(matches!(response.result, Err(RestError::InvalidRequest(_))));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_deep_path_decodes() {
    let body = r#"{"a":{"b":[{"c":{"d":{"e":"deep"}}}]}}"#;
    let transport = ScriptedTransport::with([ok(body)]);

    let path = JsonPath::new().key("a").key("b").index(0).key("c").key("d").key("e");
    let response = client(transport)
        .response_object::<String>(&request(), path, None)
        .await;

    assert_eq!(response.result.unwrap(), "deep");
}

#[tokio::test]
async fn test_requests_are_independent() {
    let transport = ScriptedTransport::with([ok("first"), ok("second")]);
    let client = client(transport.clone());

    let (a, b) = (request(), request());
    let (first, second) = tokio::join!(
        client.response_string(&a, None),
        client.response_string(&b, None),
    );

    let mut bodies = vec![first.result.unwrap(), second.result.unwrap()];
    bodies.sort();
    assert_eq!(bodies, vec!["first", "second"]);
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn test_download_without_response() {
    let transport = ScriptedTransport::with([Scripted::Stream(Ok(None))]);
    let dir = tempfile::tempdir().unwrap();

    let response = client(transport)
        .download(&request(), &dir.path().join("out.bin"), None)
        .await;

    assert!(matches!(response.result, Err(RestError::NoResponse)));
    assert!(response.metadata.is_none());
}

#[tokio::test]
async fn test_download_stream_failure_leaves_nothing_behind() {
    let body = stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(TransportError::new(TransportErrorKind::Body, "connection reset")),
    ]);
    let transport = ScriptedTransport::with([Scripted::Stream(Ok(Some(StreamingResponse {
        metadata: HttpMetadata::new(StatusCode::OK, "https://api.example.com/file"),
        body: Box::pin(body),
    })))]);
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("out.bin");

    let response = client(transport).download(&request(), &destination, None).await;

    assert!(response.result.as_ref().is_err_and(RestError::is_transport));
    assert_eq!(response.metadata.unwrap().status.as_u16(), 200);
    assert!(!destination.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
