//! WebSocket market-data connection for Hyperliquid.
//!
//! One socket per process carries every feed:
//! - `allMids` and `webData2` for the watched account are opened on connect
//! - other feeds are opened by the first listener that needs them and closed
//!   when the last one leaves
//! - application-level `ping` every 50s
//!
//! Inbound frames are decoded into [`ChannelPayload`] and handed to the
//! listeners registered on their channel.

pub mod connection;
pub mod error;
pub mod message;
pub mod registry;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, PLACEHOLDER_ACCOUNT};
pub use error::{WsError, WsResult};
pub use message::{
    ActiveAssetCtx, AllMids, Candle, ChannelPayload, ClearinghouseState, Fill, L2Book, L2Level,
    MarginSummary, OrderInfo, OrderUpdate, Subscription, Trade, UserFills, WebData2, WsMessage,
    WsRequest,
};
pub use registry::{Listener, ListenerId, SubscriptionRegistry};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Install the TLS crypto provider.
/// Call once before opening `wss://` connections.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
