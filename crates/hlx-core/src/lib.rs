//! Core types shared by the hlx crates.
//!
//! - [`Network`]: mainnet/testnet endpoints and the chain identifiers that
//!   end up inside signed payloads
//! - [`OrderSide`], [`TimeInForce`], [`ClientOrderId`]: order vocabulary

pub mod error;
pub mod network;
pub mod order;

pub use error::{CoreError, Result};
pub use network::{Network, DEFAULT_SIGNATURE_CHAIN_ID};
pub use order::{ClientOrderId, OrderSide, TimeInForce};
