//! Mock WebSocket server for application-level tests.
//!
//! Records received frames and broadcasts pushed frames to every client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub struct MockWsServer {
    addr: SocketAddr,
    push_tx: broadcast::Sender<String>,
    received: Arc<Mutex<Vec<Value>>>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (push_tx, _) = broadcast::channel::<String>(64);
        let received = Arc::new(Mutex::new(Vec::new()));

        let accept_push = push_tx.clone();
        let accept_received = Arc::clone(&received);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut pushes = accept_push.subscribe();
                let received = Arc::clone(&accept_received);
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    if let Ok(value) = serde_json::from_str(&text) {
                                        received.lock().await.push(value);
                                    }
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                _ => {}
                            },
                            Ok(frame) = pushes.recv() => {
                                if write.send(Message::Text(frame)).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            push_tx,
            received,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn push(&self, frame: &str) {
        let _ = self.push_tx.send(frame.to_string());
    }

    pub async fn subscriptions(&self) -> Vec<Value> {
        self.received
            .lock()
            .await
            .iter()
            .filter(|m| m["method"] == "subscribe")
            .map(|m| m["subscription"].clone())
            .collect()
    }
}
