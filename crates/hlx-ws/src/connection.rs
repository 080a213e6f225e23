//! WebSocket connection manager.
//!
//! Owns one physical socket, multiplexes typed subscriptions over it and
//! dispatches inbound frames to registered listeners. There is no automatic
//! reconnect: after a close the manager stays disconnected and registrations
//! stay in memory without being replayed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hlx_core::Network;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{WsError, WsResult};
use crate::message::{ChannelPayload, Subscription, WsMessage, WsRequest};
use crate::registry::{Listener, ListenerId, SubscriptionRegistry};

/// Placeholder account watched until a real one is set.
pub const PLACEHOLDER_ACCOUNT: &str = "0x0000000000000000000000000000000000000000";

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Application-level ping interval.
    pub heartbeat_interval_ms: u64,
    /// Account for the auto-subscribed `webData2` feed.
    pub default_watched_account: String,
    /// Outbound queue capacity.
    pub outbound_buffer: usize,
}

impl ConnectionConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            url: network.ws_url().to_string(),
            ..Self::default()
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: Network::Mainnet.ws_url().to_string(),
            heartbeat_interval_ms: 50_000,
            default_watched_account: PLACEHOLDER_ACCOUNT.to_string(),
            outbound_buffer: 100,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

static GLOBAL: OnceCell<Arc<ConnectionManager>> = OnceCell::new();

/// WebSocket connection manager.
///
/// One instance per process by convention; use [`ConnectionManager::global`]
/// for the shared one or [`ConnectionManager::new`] to inject your own.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: RwLock<ConnectionState>,
    registry: RwLock<SubscriptionRegistry>,
    /// Listener-requested feeds open on the current socket. Owned feeds are
    /// not tracked here.
    open_feeds: Mutex<HashSet<Subscription>>,
    watched_account: Mutex<String>,
    /// Outbound text frames, drained by the connection loop.
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: Arc<TokioMutex<mpsc::Receiver<String>>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer.max(1));
        Self {
            watched_account: Mutex::new(config.default_watched_account.clone()),
            config,
            state: RwLock::new(ConnectionState::Disconnected),
            registry: RwLock::new(SubscriptionRegistry::new()),
            open_feeds: Mutex::new(HashSet::new()),
            outbound_tx,
            outbound_rx: Arc::new(TokioMutex::new(outbound_rx)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Process-wide instance, created on first call.
    ///
    /// The first call also spawns the connection task on the current tokio
    /// runtime; later calls ignore `config`.
    pub fn global(config: ConnectionConfig) -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| {
            let manager = Arc::new(Self::new(config));
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let task = Arc::clone(&manager);
                    handle.spawn(async move {
                        if let Err(e) = task.connect().await {
                            error!(error = %e, "Global WebSocket connection ended with error");
                        }
                    });
                }
                Err(_) => {
                    warn!("No tokio runtime; global ConnectionManager created without connecting");
                }
            }
            manager
        }))
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn watched_account(&self) -> String {
        self.watched_account.lock().clone()
    }

    /// Signal graceful shutdown: the loop sends a Close frame and returns.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Register `listener` for `subscription`'s channel and open the feed.
    ///
    /// Returns `WsError::NotConnected` without registering anything when the
    /// socket is not open.
    pub fn subscribe(&self, subscription: Subscription, listener: Listener) -> WsResult<ListenerId> {
        if !self.is_connected() {
            debug!(?subscription, "Subscribe ignored while disconnected");
            return Err(WsError::NotConnected);
        }

        let mut registry = self.registry.write();
        if !self.is_owned(&subscription) {
            let mut open = self.open_feeds.lock();
            if !open.contains(&subscription) {
                self.send_request(&WsRequest::subscribe(subscription.clone()))?;
                open.insert(subscription.clone());
            }
        }
        let channel = subscription.channel();
        let id = registry.add(channel, Some(subscription), listener);
        debug!(channel, %id, "Listener subscribed");
        Ok(id)
    }

    /// Drop `listener` (or every listener on the channel when `None`) and
    /// close any open feed no remaining listener holds.
    pub fn unsubscribe(&self, subscription: &Subscription, listener: Option<ListenerId>) -> WsResult<()> {
        let channel = subscription.channel();
        let mut registry = self.registry.write();

        let mut released = match listener {
            Some(id) => match registry.remove(channel, id) {
                Some(Some(held)) => vec![held],
                _ => Vec::new(),
            },
            None => registry.clear(channel),
        };
        if !released.contains(subscription) {
            released.push(subscription.clone());
        }

        if !self.is_connected() {
            return Ok(());
        }
        let mut open = self.open_feeds.lock();
        for sub in released {
            if open.contains(&sub) && !registry.holds(&sub) && !self.is_owned(&sub) {
                self.send_request(&WsRequest::unsubscribe(sub.clone()))?;
                open.remove(&sub);
            }
        }
        Ok(())
    }

    /// Observe a channel without wire traffic.
    pub fn add_listener(&self, channel: &str, listener: Listener) -> ListenerId {
        self.registry.write().add(channel, None, listener)
    }

    /// Returns false if the listener was not registered on `channel`.
    ///
    /// A feed held only by this listener stays open until `unsubscribe`.
    pub fn remove_listener(&self, channel: &str, id: ListenerId) -> bool {
        self.registry.write().remove(channel, id).is_some()
    }

    /// Switch the auto-subscribed account feed to `account`.
    pub fn update_watched_account(&self, account: &str) -> WsResult<()> {
        let previous = {
            let mut watched = self.watched_account.lock();
            if watched.as_str() == account {
                return Ok(());
            }
            std::mem::replace(&mut *watched, account.to_string())
        };
        info!(from = %previous, to = %account, "Watched account changed");

        if !self.is_connected() {
            return Ok(());
        }
        let registry = self.registry.read();
        let mut open = self.open_feeds.lock();
        let old = Subscription::web_data2(previous);
        if registry.holds(&old) {
            // Still wanted by a listener; it stays open as a regular feed.
            open.insert(old);
        } else if !open.contains(&old) {
            self.send_request(&WsRequest::unsubscribe(old))?;
        }
        let new = Subscription::web_data2(account);
        if !open.remove(&new) {
            self.send_request(&WsRequest::subscribe(new))?;
        }
        Ok(())
    }

    /// Feeds currently open on the wire: manager-owned plus listener-requested.
    ///
    /// A feed stays here after `remove_listener` drops its last holder, until
    /// `unsubscribe` closes it or the socket ends.
    pub fn active_subscriptions(&self) -> Vec<Subscription> {
        let mut subs: Vec<Subscription> = self.owned_subscriptions();
        for sub in self.open_feeds.lock().iter() {
            if !subs.contains(sub) {
                subs.push(sub.clone());
            }
        }
        subs
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.registry.read().listener_count(channel)
    }

    fn owned_subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::AllMids,
            Subscription::web_data2(self.watched_account()),
        ]
    }

    fn is_owned(&self, subscription: &Subscription) -> bool {
        match subscription {
            Subscription::AllMids => true,
            Subscription::WebData2 { user } => *user == *self.watched_account.lock(),
            _ => false,
        }
    }

    fn send_request(&self, request: &WsRequest) -> WsResult<()> {
        let text = request.to_text()?;
        self.outbound_tx
            .try_send(text)
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Invoke every listener on `channel`, in registration order.
    ///
    /// Listeners run outside the registry lock and may add or remove
    /// listeners themselves. Returns the number invoked.
    pub fn dispatch(&self, channel: &str, payload: &ChannelPayload) -> usize {
        let listeners = self.registry.read().snapshot(channel);
        for listener in &listeners {
            listener(payload);
        }
        listeners.len()
    }

    fn handle_text_message(&self, text: &str) {
        match WsMessage::parse(text) {
            Ok(WsMessage::Pong) => debug!("Received application-level pong"),
            Ok(WsMessage::SubscriptionResponse(data)) => {
                debug!(?data, "Received subscription response");
            }
            Ok(WsMessage::Channel { channel, payload }) => {
                if let ChannelPayload::Error(message) = &payload {
                    warn!(%message, "Received error channel message");
                }
                self.dispatch(&channel, &payload);
            }
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping malformed message");
            }
        }
    }

    // ------------------------------------------------------------------
    // Connection loop
    // ------------------------------------------------------------------

    /// Open the socket and run the message loop until close or shutdown.
    pub async fn connect(&self) -> WsResult<()> {
        if self.is_shutdown() {
            return Ok(());
        }
        *self.state.write() = ConnectionState::Connecting;
        let result = self.run().await;
        *self.state.write() = ConnectionState::Disconnected;
        self.open_feeds.lock().clear();
        info!("WebSocket disconnected");
        result
    }

    async fn run(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async_tls_with_config(&self.config.url, None, true, None)
            .await
            .map_err(|e| {
                error!(error = %e, "WebSocket connect failed");
                WsError::ConnectionFailed(e.to_string())
            })?;
        let (mut write, mut read) = ws_stream.split();

        let mut outbound_rx = self.outbound_rx.lock().await;
        // Frames queued for an earlier socket are stale.
        while outbound_rx.try_recv().is_ok() {}

        *self.state.write() = ConnectionState::Connected;
        info!("WebSocket connected");

        for sub in self.owned_subscriptions() {
            write
                .send(Message::Text(WsRequest::subscribe(sub).to_text()?))
                .await?;
        }

        let period = Duration::from_millis(self.config.heartbeat_interval_ms.max(1));
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_text_message(&text),
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                warn!(?e, "Failed to answer ping");
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Ok(());
                        }
                        Some(Err(
                            tungstenite::Error::ConnectionClosed
                            | tungstenite::Error::AlreadyClosed
                            | tungstenite::Error::Io(_),
                        )) => {
                            warn!("WebSocket transport closed");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            // Transport errors are not fatal; the close, if any, follows.
                            error!(?e, "WebSocket read error");
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                    }
                }

                Some(text) = outbound_rx.recv() => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        error!(?e, "WebSocket send failed");
                    }
                }

                _ = heartbeat.tick() => {
                    match write.send(Message::Text(WsRequest::ping().to_text()?)).await {
                        Ok(()) => debug!("Sent heartbeat ping"),
                        Err(e) => warn!(?e, "Failed to send heartbeat ping"),
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    #[cfg(test)]
    pub(crate) async fn drain_outbound(&self) -> Vec<String> {
        let mut rx = self.outbound_rx.lock().await;
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(text);
        }
        out
    }
}
