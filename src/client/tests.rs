use super::*;
use crate::config::ClientConfig;
use crate::conversation::ConversationStore;
use crate::driver::{SendOutcome, StreamDriver, StreamEnd};
use axum::http::{HeaderMap, StatusCode};
use axum::{routing::post, Router};
use futures::{stream, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

// How the mock endpoint answers
#[derive(Clone)]
enum MockReply {
    Stream(Vec<&'static str>),
    Status(StatusCode, &'static str),
    NoContent,
}

// Requests as seen by the mock endpoint
#[derive(Clone, Default)]
struct RequestLog {
    entries: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl RequestLog {
    fn get_entries(&self) -> Vec<(Option<String>, Value)> {
        self.entries.lock().unwrap().clone()
    }
}

async fn create_mock_server(reply: MockReply, log: RequestLog) -> String {
    let app = Router::new().route(
        "/api/v1/chat/send",
        post(move |headers: HeaderMap, body: axum::Json<Value>| {
            let reply = reply.clone();
            let log = log.clone();
            async move {
                let accept = headers
                    .get("accept")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                log.entries.lock().unwrap().push((accept, body.0));

                match reply {
                    MockReply::Stream(chunks) => {
                        let stream = stream::iter(
                            chunks
                                .into_iter()
                                .map(|chunk| Ok::<_, std::io::Error>(bytes::Bytes::from(chunk))),
                        );
                        axum::response::Response::builder()
                            .status(StatusCode::OK)
                            .header("content-type", "text/event-stream")
                            .body(axum::body::Body::from_stream(stream))
                            .unwrap()
                    }
                    MockReply::Status(status, text) => axum::response::Response::builder()
                        .status(status)
                        .body(axum::body::Body::from(text))
                        .unwrap(),
                    MockReply::NoContent => axum::response::Response::builder()
                        .status(StatusCode::NO_CONTENT)
                        .body(axum::body::Body::empty())
                        .unwrap(),
                }
            }
        }),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", server_addr)
}

fn transport_for(base_url: &str) -> HttpTransport {
    let config = ClientConfig {
        server_url: base_url.to_string(),
        ..ClientConfig::default()
    };
    HttpTransport::from_config(&config).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest {
        prompt: "hi".to_string(),
        user_id: "1234".to_string(),
    }
}

#[tokio::test]
async fn test_streams_body_chunks() {
    let log = RequestLog::default();
    let base_url = create_mock_server(
        MockReply::Stream(vec![
            "data: {\"type\": \"token\", \"content\": \"Hi\"}\n\n",
            "data: [DONE]\n\n",
        ]),
        log.clone(),
    )
    .await;
    let transport = transport_for(&base_url);

    let body = transport.open_stream(&request()).await.unwrap().unwrap();
    let chunks: Vec<_> = body.collect().await;
    let text: String = chunks
        .into_iter()
        .map(|chunk| String::from_utf8(chunk.unwrap().to_vec()).unwrap())
        .collect();

    assert_eq!(
        text,
        "data: {\"type\": \"token\", \"content\": \"Hi\"}\n\ndata: [DONE]\n\n"
    );
    assert_eq!(
        log.get_entries(),
        vec![(
            Some("text/event-stream".to_string()),
            serde_json::json!({"prompt": "hi", "user_id": "1234"})
        )]
    );
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let base_url = create_mock_server(
        MockReply::Status(StatusCode::INTERNAL_SERVER_ERROR, "agent crashed"),
        RequestLog::default(),
    )
    .await;
    let transport = transport_for(&base_url);

    match transport.open_stream(&request()).await {
        Err(StreamError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "agent crashed");
        }
        other => panic!("unexpected result: {:?}", other.map(|body| body.is_some())),
    }
}

#[tokio::test]
async fn test_no_content_means_no_body() {
    let base_url = create_mock_server(MockReply::NoContent, RequestLog::default()).await;
    let transport = transport_for(&base_url);

    let body = transport.open_stream(&request()).await.unwrap();
    assert!(body.is_none());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind and immediately release a port so nothing is listening on it
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(
        Url::parse(&format!("http://{}/api/v1/chat/send", addr)).unwrap(),
    );
    let result = transport.open_stream(&request()).await;
    assert!(matches!(result, Err(StreamError::Http(_))));
}

#[tokio::test]
async fn test_driver_over_http() {
    let base_url = create_mock_server(
        MockReply::Stream(vec![
            "data: {\"type\": \"thinking\", \"content\": \"Accessing Tool: web_search...\"}\n\n",
            "data: {\"type\": \"thinking\", \"content\": \"Tool Result: sunny...\"}\n\n",
            "data: {\"type\": \"token\", \"content\": \"It is\"}\n\n",
            "data: {\"type\": \"token\", \"content\": \" sunny.\"}\n\n",
            "data: [DONE]\n\n",
        ]),
        RequestLog::default(),
    )
    .await;
    let store = ConversationStore::new();
    let driver = StreamDriver::new(store.clone(), Box::new(transport_for(&base_url)), "1234");

    let outcome = driver.send("weather?", Vec::new()).await.unwrap();

    let snapshot = store.snapshot();
    let assistant = snapshot.last().unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Completed {
            message: assistant.id,
            end: StreamEnd::Terminator,
        }
    );
    assert_eq!(assistant.content, "It is sunny.");
    assert_eq!(
        assistant.logs,
        vec!["Accessing Tool: web_search...", "Tool Result: sunny..."]
    );
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn test_driver_over_http_records_status_failure() {
    let base_url = create_mock_server(
        MockReply::Status(StatusCode::BAD_GATEWAY, "ollama unreachable"),
        RequestLog::default(),
    )
    .await;
    let store = ConversationStore::new();
    let driver = StreamDriver::new(store.clone(), Box::new(transport_for(&base_url)), "1234");

    let outcome = driver.send("hi", Vec::new()).await.unwrap();

    assert!(matches!(outcome, SendOutcome::Failed { .. }));
    let snapshot = store.snapshot();
    let assistant = snapshot.last().unwrap();
    assert!(assistant.error);
    assert_eq!(
        assistant.logs,
        vec!["Request failed with status 502: ollama unreachable"]
    );
    assert!(!snapshot.loading);
}
