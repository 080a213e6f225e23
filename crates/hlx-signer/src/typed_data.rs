//! EIP-712 typed data: schemas, domains and hashing.
//!
//! Each action kind maps to one `(domain, schema)` pair via
//! [`ActionKind::typed_data_params`]. Hashing follows EIP-712:
//!
//! ```text
//! type_hash   = keccak256("Primary(type1 name1,type2 name2,...)")
//! struct_hash = keccak256(type_hash ++ enc(field1) ++ enc(field2) ...)
//! signing     = keccak256(0x19 0x01 ++ domain_separator ++ struct_hash)
//! ```
//!
//! Hyperliquid's primary types contain a colon
//! (`HyperliquidTransaction:Withdraw`), which `sol!` cannot express, so the
//! schemas are plain data and encoded here.

use std::str::FromStr;

use alloy::primitives::{address, keccak256, Address, B256, U256};
use alloy::sol_types::{eip712_domain, Eip712Domain};
use hlx_core::Network;
use serde_json::Value;

use crate::error::{SignerError, SignerResult};

/// Agent domain constants (order-class actions).
pub const EXCHANGE_DOMAIN_NAME: &str = "Exchange";
pub const EXCHANGE_DOMAIN_VERSION: &str = "1";
pub const EXCHANGE_CHAIN_ID: u64 = 1337;

/// User-signed domain name (administrative actions).
pub const USER_SIGNED_DOMAIN_NAME: &str = "HyperliquidSignTransaction";
pub const USER_SIGNED_DOMAIN_VERSION: &str = "1";

/// Solidity field types used by the exchange schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Address,
    Uint64,
    Uint256,
    Bytes32,
}

impl FieldType {
    pub fn sol_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Address => "address",
            Self::Uint64 => "uint64",
            Self::Uint256 => "uint256",
            Self::Bytes32 => "bytes32",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedField {
    pub name: &'static str,
    pub ty: FieldType,
}

const fn field(name: &'static str, ty: FieldType) -> TypedField {
    TypedField { name, ty }
}

/// A flat EIP-712 struct definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedDataSchema {
    pub primary_type: &'static str,
    pub fields: &'static [TypedField],
}

pub const AGENT: TypedDataSchema = TypedDataSchema {
    primary_type: "Agent",
    fields: &[
        field("source", FieldType::String),
        field("connectionId", FieldType::Bytes32),
    ],
};

pub const WITHDRAW: TypedDataSchema = TypedDataSchema {
    primary_type: "HyperliquidTransaction:Withdraw",
    fields: &[
        field("hyperliquidChain", FieldType::String),
        field("destination", FieldType::String),
        field("amount", FieldType::String),
        field("time", FieldType::Uint64),
    ],
};

pub const APPROVE_AGENT: TypedDataSchema = TypedDataSchema {
    primary_type: "HyperliquidTransaction:ApproveAgent",
    fields: &[
        field("hyperliquidChain", FieldType::String),
        field("agentAddress", FieldType::Address),
        field("agentName", FieldType::String),
        field("nonce", FieldType::Uint64),
    ],
};

pub const APPROVE_BUILDER_FEE: TypedDataSchema = TypedDataSchema {
    primary_type: "HyperliquidTransaction:ApproveBuilderFee",
    fields: &[
        field("hyperliquidChain", FieldType::String),
        field("maxFeeRate", FieldType::String),
        field("builder", FieldType::Address),
        field("nonce", FieldType::Uint64),
    ],
};

pub const PERMIT: TypedDataSchema = TypedDataSchema {
    primary_type: "Permit",
    fields: &[
        field("owner", FieldType::Address),
        field("spender", FieldType::Address),
        field("value", FieldType::Uint256),
        field("nonce", FieldType::Uint256),
        field("deadline", FieldType::Uint256),
    ],
};

impl TypedDataSchema {
    /// `Primary(type name,...)`
    pub fn encode_type(&self) -> String {
        let members: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.ty.sol_name(), f.name))
            .collect();
        format!("{}({})", self.primary_type, members.join(","))
    }

    pub fn type_hash(&self) -> B256 {
        keccak256(self.encode_type().as_bytes())
    }

    /// `hashStruct(message)`. Keys not in the schema are ignored.
    pub fn hash_struct(&self, message: &Value) -> SignerResult<B256> {
        let mut data = Vec::with_capacity(32 * (self.fields.len() + 1));
        data.extend_from_slice(self.type_hash().as_slice());
        for f in self.fields {
            data.extend_from_slice(&encode_field(f, message.get(f.name))?);
        }
        Ok(keccak256(&data))
    }

    /// Final digest to sign under `domain`.
    pub fn signing_hash(&self, domain: &Eip712Domain, message: &Value) -> SignerResult<B256> {
        let struct_hash = self.hash_struct(message)?;
        let mut data = [0u8; 66];
        data[0] = 0x19;
        data[1] = 0x01;
        data[2..34].copy_from_slice(domain.hash_struct().as_slice());
        data[34..66].copy_from_slice(struct_hash.as_slice());
        Ok(keccak256(data))
    }
}

fn encode_field(f: &TypedField, value: Option<&Value>) -> SignerResult<[u8; 32]> {
    let value = value.ok_or_else(|| SignerError::typed_data(f.name, "missing"))?;
    match f.ty {
        FieldType::String => {
            let s = value
                .as_str()
                .ok_or_else(|| SignerError::typed_data(f.name, "expected string"))?;
            Ok(keccak256(s.as_bytes()).0)
        }
        FieldType::Address => {
            let s = value
                .as_str()
                .ok_or_else(|| SignerError::typed_data(f.name, "expected address string"))?;
            let addr = Address::from_str(s)
                .map_err(|e| SignerError::typed_data(f.name, e.to_string()))?;
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr.as_slice());
            Ok(word)
        }
        FieldType::Uint64 => {
            let n = parse_uint(f.name, value)?;
            if n > U256::from(u64::MAX) {
                return Err(SignerError::typed_data(f.name, "exceeds uint64"));
            }
            Ok(n.to_be_bytes::<32>())
        }
        FieldType::Uint256 => Ok(parse_uint(f.name, value)?.to_be_bytes::<32>()),
        FieldType::Bytes32 => {
            let s = value
                .as_str()
                .ok_or_else(|| SignerError::typed_data(f.name, "expected hex string"))?;
            let b = B256::from_str(s).map_err(|e| SignerError::typed_data(f.name, e.to_string()))?;
            Ok(b.0)
        }
    }
}

/// Integers arrive either as JSON numbers or as decimal/0x strings.
fn parse_uint(name: &str, value: &Value) -> SignerResult<U256> {
    if let Some(n) = value.as_u64() {
        return Ok(U256::from(n));
    }
    let s = value
        .as_str()
        .ok_or_else(|| SignerError::typed_data(name, "expected unsigned integer"))?;
    U256::from_str(s).map_err(|e| SignerError::typed_data(name, e.to_string()))
}

// =============================================================================
// Domains
// =============================================================================

/// Domain for phantom agent signatures.
pub fn exchange_domain() -> Eip712Domain {
    eip712_domain! {
        name: EXCHANGE_DOMAIN_NAME,
        version: EXCHANGE_DOMAIN_VERSION,
        chain_id: EXCHANGE_CHAIN_ID,
        verifying_contract: Address::ZERO,
    }
}

/// Domain for administrative (user-signed) actions.
pub fn user_signed_domain(signature_chain_id: u64) -> Eip712Domain {
    eip712_domain! {
        name: USER_SIGNED_DOMAIN_NAME,
        version: USER_SIGNED_DOMAIN_VERSION,
        chain_id: signature_chain_id,
        verifying_contract: Address::ZERO,
    }
}

const USDC_MAINNET: Address = address!("af88d065e77c8cc2239327c5edb3a432268e5831");
const USDC_TESTNET: Address = address!("1baabb04529d43a73232b713c0fe471f7c7334d5");
const BRIDGE_MAINNET: Address = address!("2df1c51e09aecf9cacb7bc98cb1742757f163df7");
const BRIDGE_TESTNET: Address = address!("08cfc1b6b2dcf36a1480b99353a354aa8ac56f89");

/// Bridge contract that consumes deposit permits (the permit spender).
pub fn bridge_address(network: Network) -> Address {
    match network {
        Network::Mainnet => BRIDGE_MAINNET,
        Network::Testnet => BRIDGE_TESTNET,
    }
}

/// USDC token domain on the bridge chain (Arbitrum One / Arbitrum Sepolia).
pub fn usdc_permit_domain(network: Network) -> Eip712Domain {
    match network {
        Network::Mainnet => eip712_domain! {
            name: "USD Coin",
            version: "2",
            chain_id: 42_161,
            verifying_contract: USDC_MAINNET,
        },
        Network::Testnet => eip712_domain! {
            name: "USDC2",
            version: "1",
            chain_id: 421_614,
            verifying_contract: USDC_TESTNET,
        },
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Signable action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Any order-class action, signed through the phantom agent.
    Order,
    Withdraw,
    ApproveAgent,
    ApproveBuilderFee,
    DepositPermit,
}

/// Domain + schema for one action kind.
#[derive(Debug, Clone)]
pub struct TypedDataParams {
    pub domain: Eip712Domain,
    pub schema: &'static TypedDataSchema,
}

impl ActionKind {
    /// Map a wire `type` tag to its kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "order" | "cancel" | "cancelByCloid" | "updateLeverage" => Some(Self::Order),
            "withdraw3" => Some(Self::Withdraw),
            "approveAgent" => Some(Self::ApproveAgent),
            "approveBuilderFee" => Some(Self::ApproveBuilderFee),
            "depositPermit" => Some(Self::DepositPermit),
            _ => None,
        }
    }

    pub fn typed_data_params(&self, network: Network, signature_chain_id: u64) -> TypedDataParams {
        match self {
            Self::Order => TypedDataParams {
                domain: exchange_domain(),
                schema: &AGENT,
            },
            Self::Withdraw => TypedDataParams {
                domain: user_signed_domain(signature_chain_id),
                schema: &WITHDRAW,
            },
            Self::ApproveAgent => TypedDataParams {
                domain: user_signed_domain(signature_chain_id),
                schema: &APPROVE_AGENT,
            },
            Self::ApproveBuilderFee => TypedDataParams {
                domain: user_signed_domain(signature_chain_id),
                schema: &APPROVE_BUILDER_FEE,
            },
            Self::DepositPermit => TypedDataParams {
                domain: usdc_permit_domain(network),
                schema: &PERMIT,
            },
        }
    }
}
