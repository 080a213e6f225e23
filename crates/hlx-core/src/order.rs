//! Order-related types and identifiers.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Side letter used by the exchange feeds: "B" (bid) or "A" (ask).
    pub fn from_feed_letter(letter: &str) -> Option<Self> {
        match letter {
            "B" => Some(Self::Buy),
            "A" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled.
    #[default]
    #[serde(rename = "Gtc")]
    GoodTilCancelled,
    /// Immediate-or-cancel.
    #[serde(rename = "Ioc")]
    ImmediateOrCancel,
    /// Add-liquidity-only.
    #[serde(rename = "Alo")]
    AddLiquidityOnly,
}

impl TimeInForce {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::GoodTilCancelled => "Gtc",
            Self::ImmediateOrCancel => "Ioc",
            Self::AddLiquidityOnly => "Alo",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Client order ID: 128 bits rendered as `0x` + 32 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new random client order ID.
    pub fn new() -> Self {
        Self(format!("0x{}", Uuid::new_v4().simple()))
    }

    /// Parse an existing id, validating the 16-byte hex format.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::InvalidClientOrderId(s.to_string()))?;
        if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidClientOrderId(s.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_order_id_unique() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_client_order_id_format() {
        let id = ClientOrderId::new();
        assert!(id.as_str().starts_with("0x"));
        assert_eq!(id.as_str().len(), 34);
        assert!(ClientOrderId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_client_order_id_parse_rejects_bad_input() {
        assert!(ClientOrderId::parse("0x1234").is_err());
        assert!(ClientOrderId::parse("0de3e244a8f44fc28a6b7bc852d66d19").is_err());
        assert!(ClientOrderId::parse("0xzze3e244a8f44fc28a6b7bc852d66d19").is_err());
    }

    #[test]
    fn test_client_order_id_parse_lowercases() {
        let id = ClientOrderId::parse("0x0DE3E244A8F44FC28A6B7BC852D66D19").unwrap();
        assert_eq!(id.as_str(), "0x0de3e244a8f44fc28a6b7bc852d66d19");
    }

    #[test]
    fn test_side_feed_letter() {
        assert_eq!(OrderSide::from_feed_letter("B"), Some(OrderSide::Buy));
        assert_eq!(OrderSide::from_feed_letter("A"), Some(OrderSide::Sell));
        assert_eq!(OrderSide::from_feed_letter("X"), None);
    }

    #[test]
    fn test_tif_wire() {
        assert_eq!(TimeInForce::ImmediateOrCancel.as_wire(), "Ioc");
        assert_eq!(TimeInForce::default().as_wire(), "Gtc");
    }
}
