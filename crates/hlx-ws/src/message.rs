//! WebSocket message types.
//!
//! Outbound: [`WsRequest`] carrying a typed [`Subscription`].
//! Inbound: `{"channel": ..., "data": ...}` decoded once into [`WsMessage`],
//! with data frames turned into a [`ChannelPayload`] variant per channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WsError, WsResult};

// ============================================================================
// Subscriptions (Outgoing)
// ============================================================================

/// Feed subscription, serialized as `{"type": <channel>, ...params}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Subscription {
    /// Global mid-price feed.
    AllMids,
    /// Per-account snapshot.
    WebData2 { user: String },
    Trades { coin: String },
    L2Book { coin: String },
    ActiveAssetCtx { coin: String },
    UserFills { user: String },
    OrderUpdates { user: String },
    Candle { coin: String, interval: String },
}

impl Subscription {
    pub fn all_mids() -> Self {
        Self::AllMids
    }

    pub fn web_data2(user: impl Into<String>) -> Self {
        Self::WebData2 { user: user.into() }
    }

    pub fn trades(coin: impl Into<String>) -> Self {
        Self::Trades { coin: coin.into() }
    }

    pub fn l2_book(coin: impl Into<String>) -> Self {
        Self::L2Book { coin: coin.into() }
    }

    /// Inbound channel name for this subscription's data.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::AllMids => "allMids",
            Self::WebData2 { .. } => "webData2",
            Self::Trades { .. } => "trades",
            Self::L2Book { .. } => "l2Book",
            Self::ActiveAssetCtx { .. } => "activeAssetCtx",
            Self::UserFills { .. } => "userFills",
            Self::OrderUpdates { .. } => "orderUpdates",
            Self::Candle { .. } => "candle",
        }
    }
}

/// Outgoing request to WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsRequest {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

impl WsRequest {
    /// Application-level ping; the server answers `{"channel":"pong"}`.
    pub fn ping() -> Self {
        Self {
            method: "ping".to_string(),
            subscription: None,
        }
    }

    pub fn subscribe(subscription: Subscription) -> Self {
        Self {
            method: "subscribe".to_string(),
            subscription: Some(subscription),
        }
    }

    pub fn unsubscribe(subscription: Subscription) -> Self {
        Self {
            method: "unsubscribe".to_string(),
            subscription: Some(subscription),
        }
    }

    pub fn to_text(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Inbound envelope
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawMessage {
    channel: String,
    #[serde(default)]
    data: Value,
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    /// `{"channel":"pong"}`
    Pong,
    /// Server acknowledgement of a subscribe/unsubscribe.
    SubscriptionResponse(Value),
    /// Feed data for `channel`.
    Channel {
        channel: String,
        payload: ChannelPayload,
    },
}

impl WsMessage {
    /// Parse a text frame.
    ///
    /// Fails on invalid JSON, a missing `channel`, or data that does not
    /// match the channel's payload shape.
    pub fn parse(text: &str) -> WsResult<Self> {
        let raw: RawMessage = serde_json::from_str(text)?;
        match raw.channel.as_str() {
            "pong" => Ok(Self::Pong),
            "subscriptionResponse" => Ok(Self::SubscriptionResponse(raw.data)),
            _ => {
                let payload = ChannelPayload::decode(&raw.channel, raw.data)?;
                Ok(Self::Channel {
                    channel: raw.channel,
                    payload,
                })
            }
        }
    }
}

// ============================================================================
// Channel payloads
// ============================================================================

/// Typed payload per channel. Unknown channels pass through as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelPayload {
    AllMids(AllMids),
    WebData2(WebData2),
    Trades(Vec<Trade>),
    L2Book(L2Book),
    ActiveAssetCtx(ActiveAssetCtx),
    UserFills(UserFills),
    OrderUpdates(Vec<OrderUpdate>),
    Candle(Candle),
    /// Server-reported error string.
    Error(String),
    Unknown { channel: String, data: Value },
}

impl ChannelPayload {
    pub fn decode(channel: &str, data: Value) -> WsResult<Self> {
        let payload = match channel {
            "allMids" => Self::AllMids(serde_json::from_value(data)?),
            "webData2" => Self::WebData2(serde_json::from_value(data)?),
            "trades" => Self::Trades(serde_json::from_value(data)?),
            "l2Book" => Self::L2Book(serde_json::from_value(data)?),
            "activeAssetCtx" => Self::ActiveAssetCtx(serde_json::from_value(data)?),
            "userFills" => Self::UserFills(serde_json::from_value(data)?),
            "orderUpdates" => Self::OrderUpdates(serde_json::from_value(data)?),
            "candle" => Self::Candle(serde_json::from_value(data)?),
            "error" => match data {
                Value::String(message) => Self::Error(message),
                other => Self::Error(other.to_string()),
            },
            "" => return Err(WsError::ParseError("empty channel".to_string())),
            _ => Self::Unknown {
                channel: channel.to_string(),
                data,
            },
        };
        Ok(payload)
    }
}

/// `{"mids": {"BTC": "50000.5", ...}}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AllMids {
    pub mids: std::collections::HashMap<String, String>,
}

/// Per-account snapshot. Only the margin summary is modeled; the rest of the
/// frame is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebData2 {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(rename = "clearinghouseState", default)]
    pub clearinghouse_state: Option<ClearinghouseState>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClearinghouseState {
    #[serde(rename = "marginSummary")]
    pub margin_summary: MarginSummary,
    #[serde(default)]
    pub withdrawable: Option<String>,
    #[serde(default)]
    pub time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: String,
    #[serde(default)]
    pub total_ntl_pos: Option<String>,
    #[serde(default)]
    pub total_margin_used: Option<String>,
}

/// One public trade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trade {
    #[serde(default)]
    pub coin: String,
    /// "B" (buy aggressor) or "A" (sell aggressor).
    pub side: String,
    pub px: String,
    pub sz: String,
    /// Milliseconds.
    pub time: u64,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub tid: Option<u64>,
}

impl Trade {
    pub fn side(&self) -> Option<hlx_core::OrderSide> {
        hlx_core::OrderSide::from_feed_letter(&self.side)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2Book {
    pub coin: String,
    pub time: u64,
    /// `[bids, asks]`
    pub levels: Vec<Vec<L2Level>>,
}

impl L2Book {
    pub fn best_bid(&self) -> Option<&L2Level> {
        self.levels.first().and_then(|side| side.first())
    }

    pub fn best_ask(&self) -> Option<&L2Level> {
        self.levels.get(1).and_then(|side| side.first())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2Level {
    pub px: String,
    pub sz: String,
    /// Number of orders at this level.
    pub n: u32,
}

/// Asset context is forwarded as raw JSON; perp and spot shapes differ.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActiveAssetCtx {
    pub coin: String,
    pub ctx: Value,
}

/// `{ "isSnapshot"?: bool, "user": string, "fills": [...] }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserFills {
    /// Present (true) only on the initial snapshot.
    #[serde(rename = "isSnapshot", default)]
    pub is_snapshot: bool,
    pub user: String,
    pub fills: Vec<Fill>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fill {
    pub coin: String,
    pub side: String,
    pub px: String,
    pub sz: String,
    pub time: u64,
    #[serde(default)]
    pub oid: Option<u64>,
    #[serde(default)]
    pub tid: Option<u64>,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(default)]
    pub cloid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderUpdate {
    pub order: OrderInfo,
    /// "open", "filled", "canceled", "rejected", ...
    pub status: String,
    #[serde(rename = "statusTimestamp")]
    pub status_timestamp: u64,
}

impl OrderUpdate {
    /// No further updates follow a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status.as_str(), "open" | "triggered")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderInfo {
    pub coin: String,
    pub side: String,
    #[serde(rename = "limitPx", alias = "px")]
    pub limit_px: String,
    pub sz: String,
    pub oid: u64,
    #[serde(default)]
    pub cloid: Option<String>,
    #[serde(rename = "origSz", default)]
    pub orig_sz: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Candle with the exchange's single-letter keys.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candle {
    #[serde(rename = "t")]
    pub open_time: u64,
    #[serde(rename = "T")]
    pub close_time: u64,
    #[serde(rename = "s")]
    pub coin: String,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "v")]
    pub volume: String,
    #[serde(rename = "n")]
    pub trades: u64,
}
