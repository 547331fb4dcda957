use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type Responder = dyn Fn(&Value) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct StubState {
    responder: Arc<Responder>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// HTTP server standing in for the metrics bridge.
///
/// Each request body is recorded and answered with whatever the responder returns as
/// `(http status, body)`.
pub struct StubBridge {
    pub url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl StubBridge {
    pub async fn spawn<F>(responder: F) -> Self
    where
        F: Fn(&Value) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/jolokia", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/jolokia", post(handle_read))
            .with_state(StubState { responder: Arc::new(responder), requests: Arc::clone(&requests) });
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, requests, task }
    }

    /// Responds to every read with `{"status":200,"value":<value>}`.
    pub async fn constant(value: f64) -> Self {
        Self::spawn(move |_| (200, serde_json::json!({ "status": 200, "value": value }).to_string())).await
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Drop for StubBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_read(State(state): State<StubState>, Json(body): Json<Value>) -> (StatusCode, String) {
    let (status, reply) = (state.responder)(&body);
    state.requests.lock().push(body);
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), reply)
}
