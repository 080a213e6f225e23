//! Successful exchange responses.
//!
//! `{"status":"ok","response":{"type":"order","data":{"statuses":[...]}}}`
//! or, for actions without per-item results, `{"status":"ok","response":{"type":"default"}}`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Body of an `ok` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeResponse {
    /// "order", "cancel", "default", ...
    #[serde(rename = "type", default)]
    pub response_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Per-item outcome in `data.statuses`.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Resting { oid: u64 },
    Filled { oid: u64, total_sz: Decimal, avg_px: Decimal },
    /// Cancels report a bare `"success"`.
    Success,
    /// The action was accepted but this item was rejected.
    Error(String),
}

impl ExchangeResponse {
    /// Parse `data.statuses`. Entries of unknown shape are skipped.
    pub fn statuses(&self) -> Vec<OrderStatus> {
        let Some(entries) = self.data.get("statuses").and_then(Value::as_array) else {
            return Vec::new();
        };
        entries.iter().filter_map(parse_status).collect()
    }

    /// First per-item error, if any.
    pub fn first_error(&self) -> Option<String> {
        self.statuses().into_iter().find_map(|s| match s {
            OrderStatus::Error(message) => Some(message),
            _ => None,
        })
    }
}

fn parse_status(status: &Value) -> Option<OrderStatus> {
    if status.as_str() == Some("success") {
        return Some(OrderStatus::Success);
    }
    if let Some(oid) = status.pointer("/resting/oid").and_then(Value::as_u64) {
        return Some(OrderStatus::Resting { oid });
    }
    if let Some(filled) = status.get("filled") {
        let decimal = |key: &str| {
            filled
                .get(key)
                .and_then(Value::as_str)
                .and_then(|s| Decimal::from_str(s).ok())
                .unwrap_or_default()
        };
        return Some(OrderStatus::Filled {
            oid: filled.get("oid").and_then(Value::as_u64).unwrap_or_default(),
            total_sz: decimal("totalSz"),
            avg_px: decimal("avgPx"),
        });
    }
    if let Some(error) = status.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        return Some(OrderStatus::Error(message));
    }
    warn!(?status, "Unknown status format in exchange response");
    None
}
