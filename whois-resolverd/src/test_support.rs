//! Stand-in HTTP peers for tests

use std::sync::{Arc, Mutex};
use std::time::Duration;
use axum::{extract::{Path, State}, http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Base URL of a local port nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Records every path hit under its base URL
pub struct WebhookRecorder {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl WebhookRecorder {
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct RecorderState {
    hits: Arc<Mutex<Vec<String>>>,
    status: StatusCode,
}

async fn record_hit(State(state): State<RecorderState>, Path(rest): Path<String>) -> StatusCode {
    state.hits.lock().unwrap().push(rest);
    state.status
}

/// Webhook endpoint answering every call with `status`
pub async fn spawn_webhook(status: StatusCode) -> WebhookRecorder {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/hook/*rest", get(record_hit))
        .with_state(RecorderState { hits: hits.clone(), status });

    let base_url = format!("{}/hook/", serve(app).await);
    WebhookRecorder { base_url, hits }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
