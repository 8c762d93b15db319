//! Local axum server for exercising the HTTP clients

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{OriginalUri, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// Method and target (path plus query) of a received request
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub target: String,
}

type Handler = Arc<dyn Fn(&Received) -> Response + Send + Sync>;

#[derive(Clone)]
struct ServerState {
    handler: Handler,
    received: Arc<Mutex<Vec<Received>>>,
}

pub struct TestServer {
    pub base: Url,
    pub received: Arc<Mutex<Vec<Received>>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Answer every request with `handler`, recording what was asked
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Received) -> Response + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));

        let state = ServerState {
            handler: Arc::new(handler),
            received: received.clone(),
        };
        let app = Router::new().fallback(dispatch).with_state(state);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base,
            received,
            task,
        }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).unwrap()
    }

    pub async fn received(&self) -> Vec<Received> {
        self.received.lock().await.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn dispatch(
    State(state): State<ServerState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let request = Received {
        method: method.to_string(),
        target: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
    };
    let response = (state.handler)(&request);
    state.received.lock().await.push(request);
    response
}

/// A complete response with `body`
pub fn response(status: StatusCode, content_type: &'static str, body: impl Into<String>) -> Response {
    (status, [(header::CONTENT_TYPE, content_type)], body.into()).into_response()
}

/// A body-less response to a HEAD request
///
/// Without a length the body is a stream, so no Content-Length is sent.
pub fn head_response(status: StatusCode, content_length: Option<u64>) -> Response {
    match content_length {
        Some(len) => (status, [(header::CONTENT_LENGTH, len.to_string())]).into_response(),
        None => {
            let body = Body::from_stream(futures::stream::empty::<Result<Bytes, std::io::Error>>());
            (status, body).into_response()
        }
    }
}

pub fn not_found() -> Response {
    response(StatusCode::NOT_FOUND, "text/plain", "not found")
}
