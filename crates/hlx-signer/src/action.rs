//! Exchange action wire types.
//!
//! Two families:
//! - [`L1Action`]: order-class actions. Their msgpack encoding is hashed and the
//!   hash is signed through a phantom agent.
//! - [`UserAction`]: administrative actions signed directly as EIP-712 typed
//!   data (withdraw, agent approval, builder-fee approval).
//!
//! IMPORTANT: struct field order is the msgpack/JSON key order. The exchange
//! recomputes the action hash from the JSON it receives, so reordering a field
//! here silently changes every signature.

use alloy::primitives::Address;
use hlx_core::{ClientOrderId, Network, OrderSide, TimeInForce};
use rust_decimal::Decimal;
use serde::Serialize;

// =============================================================================
// L1 actions
// =============================================================================

/// Order-class action, tagged by `type`.
///
/// `Option<T>` fields use `skip_serializing_if` so that absent keys are
/// omitted from msgpack instead of being encoded as `nil`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum L1Action {
    Order(OrderAction),
    Cancel(CancelAction),
    CancelByCloid(CancelByCloidAction),
    UpdateLeverage(UpdateLeverageAction),
}

impl L1Action {
    /// Wire tag, as it appears in the `type` key.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Order(_) => "order",
            Self::Cancel(_) => "cancel",
            Self::CancelByCloid(_) => "cancelByCloid",
            Self::UpdateLeverage(_) => "updateLeverage",
        }
    }
}

/// `{"type":"order","orders":[...],"grouping":"na","builder":{...}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderAction {
    pub orders: Vec<OrderWire>,
    /// "na", "normalTpsl" or "positionTpsl".
    pub grouping: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<BuilderInfo>,
}

impl OrderAction {
    /// Ungrouped orders.
    pub fn new(orders: Vec<OrderWire>) -> Self {
        Self {
            orders,
            grouping: "na".to_string(),
            builder: None,
        }
    }

    pub fn with_builder(mut self, builder: BuilderInfo) -> Self {
        self.builder = Some(builder);
        self
    }
}

/// Builder fee attached to an order action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuilderInfo {
    /// Builder address, lowercase hex.
    #[serde(rename = "b")]
    pub address: String,
    /// Fee in tenths of a basis point.
    #[serde(rename = "f")]
    pub fee: u64,
}

/// Order wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWire {
    /// Asset index
    #[serde(rename = "a")]
    pub asset: u32,

    /// Buy (true) or Sell (false)
    #[serde(rename = "b")]
    pub is_buy: bool,

    /// Limit price as string
    #[serde(rename = "p")]
    pub limit_px: String,

    /// Size as string
    #[serde(rename = "s")]
    pub sz: String,

    /// Reduce-only flag
    #[serde(rename = "r")]
    pub reduce_only: bool,

    /// Order type
    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,

    /// Client order ID (optional)
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub cloid: Option<String>,
}

/// Caller-facing order description, converted to [`OrderWire`] for signing.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub asset: u32,
    pub side: OrderSide,
    pub limit_px: Decimal,
    pub sz: Decimal,
    pub reduce_only: bool,
    pub order_type: OrderTypeWire,
    pub cloid: Option<ClientOrderId>,
}

impl OrderRequest {
    /// Limit order with the given time-in-force and a fresh cloid.
    pub fn limit(asset: u32, side: OrderSide, limit_px: Decimal, sz: Decimal, tif: TimeInForce) -> Self {
        Self {
            asset,
            side,
            limit_px,
            sz,
            reduce_only: false,
            order_type: OrderTypeWire::limit(tif),
            cloid: Some(ClientOrderId::new()),
        }
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    pub fn to_wire(&self) -> OrderWire {
        OrderWire {
            asset: self.asset,
            is_buy: self.side.is_buy(),
            limit_px: decimal_to_wire(self.limit_px),
            sz: decimal_to_wire(self.sz),
            reduce_only: self.reduce_only,
            order_type: self.order_type.clone(),
            cloid: self.cloid.as_ref().map(|c| c.to_string()),
        }
    }
}

/// Canonical decimal string: at most 8 decimals, no trailing zeros, no "-0".
pub fn decimal_to_wire(value: Decimal) -> String {
    let normalized = value.round_dp(8).normalize();
    if normalized.is_zero() {
        "0".to_string()
    } else {
        normalized.to_string()
    }
}

/// Order type wire format.
///
/// - Limit: {"limit": {"tif": "Gtc"|"Ioc"|"Alo"}}
/// - Trigger: {"trigger": {"isMarket": true, "triggerPx": "...", "tpsl": "tp"}}
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderTypeWire {
    Limit { limit: LimitOrderType },
    Trigger { trigger: TriggerOrderType },
}

impl OrderTypeWire {
    pub fn limit(tif: TimeInForce) -> Self {
        Self::Limit {
            limit: LimitOrderType {
                tif: tif.as_wire().to_string(),
            },
        }
    }

    /// IOC (Immediate or Cancel) order.
    pub fn ioc() -> Self {
        Self::limit(TimeInForce::ImmediateOrCancel)
    }

    /// GTC (Good Till Cancel) order.
    pub fn gtc() -> Self {
        Self::limit(TimeInForce::GoodTilCancelled)
    }
}

/// Limit order type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitOrderType {
    /// Time in force: "Gtc", "Ioc", "Alo"
    pub tif: String,
}

/// Trigger order type. Key order: isMarket -> triggerPx -> tpsl.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerOrderType {
    #[serde(rename = "isMarket")]
    pub is_market: bool,

    #[serde(rename = "triggerPx")]
    pub trigger_px: String,

    /// "tp" or "sl"
    pub tpsl: String,
}

/// `{"type":"cancel","cancels":[{"a":5,"o":123}]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelAction {
    pub cancels: Vec<CancelWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelWire {
    /// Asset index
    #[serde(rename = "a")]
    pub asset: u32,

    /// Exchange order ID
    #[serde(rename = "o")]
    pub oid: u64,
}

/// `{"type":"cancelByCloid","cancels":[{"asset":5,"cloid":"0x..."}]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelByCloidAction {
    pub cancels: Vec<CancelByCloidWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: String,
}

/// `{"type":"updateLeverage","asset":0,"isCross":true,"leverage":10}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeverageAction {
    pub asset: u32,
    pub is_cross: bool,
    pub leverage: u32,
}

// =============================================================================
// User-signed actions
// =============================================================================

/// Administrative action signed directly as typed data.
///
/// Every variant carries `signatureChainId` and `hyperliquidChain`; the exchange
/// rebuilds the typed-data message from the posted JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum UserAction {
    #[serde(rename = "withdraw3")]
    Withdraw(WithdrawAction),
    #[serde(rename = "approveAgent")]
    ApproveAgent(ApproveAgentAction),
    #[serde(rename = "approveBuilderFee")]
    ApproveBuilderFee(ApproveBuilderFeeAction),
}

impl UserAction {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Withdraw(_) => "withdraw3",
            Self::ApproveAgent(_) => "approveAgent",
            Self::ApproveBuilderFee(_) => "approveBuilderFee",
        }
    }

    /// Nonce embedded in the action (`time` for withdrawals).
    pub fn nonce(&self) -> u64 {
        match self {
            Self::Withdraw(a) => a.time,
            Self::ApproveAgent(a) => a.nonce,
            Self::ApproveBuilderFee(a) => a.nonce,
        }
    }

    /// Typed-data message for this action.
    ///
    /// An unnamed agent is posted without `agentName` but signed with `""`.
    pub fn typed_message(&self) -> serde_json::Value {
        let mut message = match self {
            Self::Withdraw(a) => serde_json::to_value(a),
            Self::ApproveAgent(a) => serde_json::to_value(a),
            Self::ApproveBuilderFee(a) => serde_json::to_value(a),
        }
        .unwrap_or(serde_json::Value::Null);

        if let (Self::ApproveAgent(_), Some(map)) = (self, message.as_object_mut()) {
            map.entry("agentName")
                .or_insert_with(|| serde_json::Value::String(String::new()));
        }
        message
    }
}

/// `signatureChainId` rendered the way the exchange expects ("0x66eee").
pub fn signature_chain_id_hex(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawAction {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    pub amount: String,
    pub time: u64,
}

impl WithdrawAction {
    pub fn new(network: Network, chain_id: u64, destination: Address, amount: &str, nonce: u64) -> Self {
        Self {
            signature_chain_id: signature_chain_id_hex(chain_id),
            hyperliquid_chain: network.hyperliquid_chain().to_string(),
            destination: address_to_wire(&destination),
            amount: amount.to_string(),
            time: nonce,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveAgentAction {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub agent_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub nonce: u64,
}

impl ApproveAgentAction {
    pub fn new(
        network: Network,
        chain_id: u64,
        agent: Address,
        agent_name: Option<String>,
        nonce: u64,
    ) -> Self {
        Self {
            signature_chain_id: signature_chain_id_hex(chain_id),
            hyperliquid_chain: network.hyperliquid_chain().to_string(),
            agent_address: address_to_wire(&agent),
            agent_name,
            nonce,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBuilderFeeAction {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    /// Percentage string, e.g. "0.001%".
    pub max_fee_rate: String,
    pub builder: String,
    pub nonce: u64,
}

impl ApproveBuilderFeeAction {
    pub fn new(network: Network, chain_id: u64, builder: Address, max_fee_rate: &str, nonce: u64) -> Self {
        Self {
            signature_chain_id: signature_chain_id_hex(chain_id),
            hyperliquid_chain: network.hyperliquid_chain().to_string(),
            max_fee_rate: max_fee_rate.to_string(),
            builder: address_to_wire(&builder),
            nonce,
        }
    }
}

// =============================================================================
// Deposit permit
// =============================================================================

/// EIP-2612 permit letting the bridge pull USDC from `owner`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositPermit {
    pub owner: String,
    pub spender: String,
    /// Raw token units (6 decimals), decimal string.
    pub value: String,
    /// Token permit nonce (from the USDC contract, not a timestamp).
    pub nonce: String,
    /// Unix seconds.
    pub deadline: String,
}

impl DepositPermit {
    pub fn new(owner: Address, spender: Address, value: u64, nonce: u64, deadline: u64) -> Self {
        Self {
            owner: address_to_wire(&owner),
            spender: address_to_wire(&spender),
            value: value.to_string(),
            nonce: nonce.to_string(),
            deadline: deadline.to_string(),
        }
    }
}

/// Lowercase `0x` hex, the form the exchange compares against.
pub fn address_to_wire(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_type_wire_serialization() {
        let json = serde_json::to_string(&OrderTypeWire::ioc()).unwrap();
        assert_eq!(json, r#"{"limit":{"tif":"Ioc"}}"#);

        let json = serde_json::to_string(&OrderTypeWire::gtc()).unwrap();
        assert_eq!(json, r#"{"limit":{"tif":"Gtc"}}"#);
    }

    #[test]
    fn test_order_action_json_starts_with_type() {
        let action = L1Action::Order(OrderAction::new(vec![]));
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"order","orders":[],"grouping":"na"}"#);
    }

    #[test]
    fn test_cancel_by_cloid_tag() {
        let action = L1Action::CancelByCloid(CancelByCloidAction {
            cancels: vec![CancelByCloidWire {
                asset: 3,
                cloid: "0x0de3e244a8f44fc28a6b7bc852d66d19".to_string(),
            }],
        });
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.starts_with(r#"{"type":"cancelByCloid""#));
        assert_eq!(action.tag(), "cancelByCloid");
    }

    #[test]
    fn test_update_leverage_camel_case() {
        let action = L1Action::UpdateLeverage(UpdateLeverageAction {
            asset: 0,
            is_cross: true,
            leverage: 10,
        });
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"type":"updateLeverage","asset":0,"isCross":true,"leverage":10}"#
        );
    }

    #[test]
    fn test_decimal_to_wire() {
        assert_eq!(decimal_to_wire(dec!(105.00)), "105");
        assert_eq!(decimal_to_wire(dec!(0.20)), "0.2");
        assert_eq!(decimal_to_wire(dec!(-0.0)), "0");
        assert_eq!(decimal_to_wire(dec!(1.123456789)), "1.12345679");
    }

    #[test]
    fn test_order_request_to_wire() {
        let mut request = OrderRequest::limit(
            4,
            OrderSide::Sell,
            dec!(50000.50),
            dec!(0.010),
            TimeInForce::AddLiquidityOnly,
        )
        .reduce_only();
        request.cloid = None;

        let wire = request.to_wire();
        assert_eq!(wire.asset, 4);
        assert!(!wire.is_buy);
        assert_eq!(wire.limit_px, "50000.5");
        assert_eq!(wire.sz, "0.01");
        assert!(wire.reduce_only);
        assert_eq!(wire.order_type, OrderTypeWire::limit(TimeInForce::AddLiquidityOnly));
        assert!(wire.cloid.is_none());
    }

    #[test]
    fn test_withdraw_json_shape() {
        let action = UserAction::Withdraw(WithdrawAction::new(
            Network::Testnet,
            421_614,
            Address::repeat_byte(0x11),
            "10",
            1_700_000_000_000,
        ));
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"type":"withdraw3","signatureChainId":"0x66eee","hyperliquidChain":"Testnet","destination":"0x1111111111111111111111111111111111111111","amount":"10","time":1700000000000}"#
        );
        assert_eq!(action.nonce(), 1_700_000_000_000);
    }

    #[test]
    fn test_unnamed_agent_signs_empty_name() {
        let action = UserAction::ApproveAgent(ApproveAgentAction::new(
            Network::Mainnet,
            421_614,
            Address::repeat_byte(0x22),
            None,
            42,
        ));

        let posted = serde_json::to_value(&action).unwrap();
        assert!(posted.get("agentName").is_none());

        let message = action.typed_message();
        assert_eq!(message["agentName"], "");
        assert_eq!(message["nonce"], 42);
    }
}
