//! Mock exchange endpoint for integration tests.
//!
//! Serves `POST /exchange`, records every request body and answers with a
//! queued reply (status code + JSON), falling back to `{"status":"ok"}`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<Value>>>,
    replies: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
}

pub struct MockExchange {
    addr: SocketAddr,
    state: MockState,
}

impl MockExchange {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/exchange", post(handle_exchange))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue the reply for the next request.
    pub async fn reply_with(&self, status: StatusCode, body: Value) {
        self.state.replies.lock().await.push_back((status, body));
    }

    pub async fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().await.clone()
    }
}

async fn handle_exchange(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().await.push(body);
    let (status, reply) = state
        .replies
        .lock()
        .await
        .pop_front()
        .unwrap_or((StatusCode::OK, json!({"status": "ok", "response": {"type": "default"}})));
    (status, Json(reply))
}
