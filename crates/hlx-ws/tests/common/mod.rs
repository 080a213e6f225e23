//! Mock WebSocket server for integration tests.
//!
//! Accepts connections, records every text frame it receives, acknowledges
//! subscriptions and answers `{"method":"ping"}`. Frames handed to
//! [`MockWsServer::push`] are broadcast to every open connection.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum ServerCommand {
    Push(String),
    Close,
}

pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    command_tx: broadcast::Sender<ServerCommand>,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    client_closes: Arc<Mutex<u32>>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(0));
        let client_closes = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (command_tx, _) = broadcast::channel(64);

        let state = (
            Arc::clone(&messages),
            Arc::clone(&connections),
            Arc::clone(&client_closes),
            command_tx.clone(),
        );
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let (messages, connections, closes, commands) = state.clone();
                        tokio::spawn(handle_connection(
                            stream,
                            messages,
                            connections,
                            closes,
                            commands.subscribe(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            command_tx,
            messages,
            connections,
            client_closes,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Close frames received from clients.
    pub async fn client_close_count(&self) -> u32 {
        *self.client_closes.lock().await
    }

    pub async fn received_messages(&self) -> Vec<Value> {
        self.messages
            .lock()
            .await
            .iter()
            .filter_map(|m| serde_json::from_str(m).ok())
            .collect()
    }

    /// Received frames with the given `method`.
    pub async fn received_with_method(&self, method: &str) -> Vec<Value> {
        self.received_messages()
            .await
            .into_iter()
            .filter(|m| m["method"] == method)
            .collect()
    }

    /// Send `frame` to every open connection.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.command_tx.send(ServerCommand::Push(frame.into()));
    }

    /// Close every open connection from the server side.
    pub fn close_connections(&self) {
        let _ = self.command_tx.send(ServerCommand::Close);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    client_closes: Arc<Mutex<u32>>,
    mut commands: broadcast::Receiver<ServerCommand>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {e}");
            return;
        }
    };
    *connections.lock().await += 1;

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    messages.lock().await.push(text.clone());

                    let Ok(parsed) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    let reply = match parsed["method"].as_str() {
                        Some("ping") => Some(json!({"channel": "pong"})),
                        Some(method @ ("subscribe" | "unsubscribe")) => Some(json!({
                            "channel": "subscriptionResponse",
                            "data": {"method": method, "subscription": parsed["subscription"]},
                        })),
                        _ => None,
                    };
                    if let Some(reply) = reply {
                        let _ = write.send(Message::Text(reply.to_string())).await;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    *client_closes.lock().await += 1;
                    break;
                }
                Some(Err(_)) | None => break,
                _ => {}
            },
            command = commands.recv() => match command {
                Ok(ServerCommand::Push(frame)) => {
                    let _ = write.send(Message::Text(frame)).await;
                }
                Ok(ServerCommand::Close) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                Err(_) => break,
            },
        }
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
