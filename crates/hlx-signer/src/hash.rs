//! Action encoding and hashing.
//!
//! ```text
//! action_hash = keccak256(
//!     msgpack_named(action)
//!     ++ nonce.to_be_bytes()                       // 8 bytes
//!     ++ (0x00 | 0x01 ++ vault_address)            // 1 or 21 bytes
//!     ++ (nothing | 0x00 ++ expires_after BE)      // 0 or 9 bytes
//! )
//! ```

use alloy::primitives::{keccak256, Address, B256};
use serde::Serialize;

use crate::action::L1Action;
use crate::error::{SignerError, SignerResult};

/// Canonical msgpack encoding (map form, declared key order).
pub fn encode_action<T: Serialize>(action: &T) -> SignerResult<Vec<u8>> {
    rmp_serde::to_vec_named(action).map_err(|e| SignerError::SerializationFailed(e.to_string()))
}

/// Hash an action together with its nonce and optional vault/expiry markers.
pub fn action_hash<T: Serialize>(
    action: &T,
    vault_address: Option<Address>,
    nonce: u64,
    expires_after: Option<u64>,
) -> SignerResult<B256> {
    let mut data = encode_action(action)?;

    data.extend_from_slice(&nonce.to_be_bytes());

    // Even "no vault" contributes a byte.
    match vault_address {
        None => data.push(0x00),
        Some(addr) => {
            data.push(0x01);
            data.extend_from_slice(addr.as_slice());
        }
    }

    // Unlike the vault marker, an absent expiry contributes nothing.
    if let Some(expires) = expires_after {
        data.push(0x00);
        data.extend_from_slice(&expires.to_be_bytes());
    }

    Ok(keccak256(&data))
}

/// Everything that goes into an L1 action hash.
#[derive(Debug, Clone)]
pub struct SigningInput {
    pub action: L1Action,
    pub nonce: u64,
    /// None = trading for the signer's own account.
    pub vault_address: Option<Address>,
    pub expires_after: Option<u64>,
}

impl SigningInput {
    pub fn new(action: L1Action, nonce: u64) -> Self {
        Self {
            action,
            nonce,
            vault_address: None,
            expires_after: None,
        }
    }

    pub fn with_vault(mut self, vault_address: Address) -> Self {
        self.vault_address = Some(vault_address);
        self
    }

    pub fn with_expires_after(mut self, expires_after: u64) -> Self {
        self.expires_after = Some(expires_after);
        self
    }

    pub fn action_hash(&self) -> SignerResult<B256> {
        action_hash(&self.action, self.vault_address, self.nonce, self.expires_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{CancelAction, CancelWire, OrderAction, OrderTypeWire, OrderWire};

    fn sample_order(cloid: Option<&str>) -> L1Action {
        L1Action::Order(OrderAction::new(vec![OrderWire {
            asset: 110027,
            is_buy: true,
            limit_px: "105.00".to_string(),
            sz: "0.2".to_string(),
            reduce_only: false,
            order_type: OrderTypeWire::ioc(),
            cloid: cloid.map(str::to_string),
        }]))
    }

    /// Msgpack bytes and hash must match the reference SDK byte-for-byte.
    #[test]
    fn test_msgpack_matches_reference_vector() {
        let action = sample_order(Some("0x0de3e244a8f44fc28a6b7bc852d66d19"));

        let bytes = encode_action(&action).unwrap();
        let expected = "83a474797065a56f72646572a66f72646572739187a161ce0001adcba162c3a170a63130352e3030a173a3302e32a172c2a17481a56c696d697481a3746966a3496f63a163d92230783064653365323434613866343466633238613662376263383532643636643139a867726f7570696e67a26e61";
        assert_eq!(hex::encode(&bytes), expected);

        let hash = action_hash(&action, None, 1769339470576, None).unwrap();
        assert_eq!(
            hex::encode(hash.as_slice()),
            "904c57b8f4b75ac9da005b49298dc39af735ed8c3a89b241f5f1e061e0207868"
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let input = SigningInput::new(sample_order(None), 1234567890)
            .with_vault(Address::repeat_byte(0x42));
        assert_eq!(input.action_hash().unwrap(), input.action_hash().unwrap());
    }

    #[test]
    fn test_vault_changes_hash() {
        let action = L1Action::Cancel(CancelAction {
            cancels: vec![CancelWire { asset: 5, oid: 123 }],
        });

        let none = action_hash(&action, None, 1000, None).unwrap();
        let v1 = action_hash(&action, Some(Address::repeat_byte(0x42)), 1000, None).unwrap();
        let v2 = action_hash(&action, Some(Address::repeat_byte(0x43)), 1000, None).unwrap();

        assert_ne!(none, v1);
        assert_ne!(v1, v2);
        // A zero vault address is still distinguishable from no vault.
        let zero = action_hash(&action, Some(Address::ZERO), 1000, None).unwrap();
        assert_ne!(none, zero);
    }

    #[test]
    fn test_nonce_changes_hash() {
        let action = sample_order(None);
        assert_ne!(
            action_hash(&action, None, 1000, None).unwrap(),
            action_hash(&action, None, 1001, None).unwrap()
        );
    }

    #[test]
    fn test_expires_after_changes_hash() {
        let input = SigningInput::new(sample_order(None), 1000);
        let with_expiry = input.clone().with_expires_after(1_700_000_000);
        assert_ne!(input.action_hash().unwrap(), with_expiry.action_hash().unwrap());
    }

    #[test]
    fn test_every_order_field_changes_hash() {
        let base = OrderWire {
            asset: 1,
            is_buy: true,
            limit_px: "100".to_string(),
            sz: "1".to_string(),
            reduce_only: false,
            order_type: OrderTypeWire::gtc(),
            cloid: None,
        };
        let hash_of = |wire: OrderWire| {
            action_hash(&L1Action::Order(OrderAction::new(vec![wire])), None, 7, None).unwrap()
        };
        let reference = hash_of(base.clone());

        let mutations: Vec<OrderWire> = vec![
            OrderWire { asset: 2, ..base.clone() },
            OrderWire { is_buy: false, ..base.clone() },
            OrderWire { limit_px: "100.1".to_string(), ..base.clone() },
            OrderWire { sz: "2".to_string(), ..base.clone() },
            OrderWire { reduce_only: true, ..base.clone() },
            OrderWire { order_type: OrderTypeWire::ioc(), ..base.clone() },
            OrderWire { cloid: Some("0x00000000000000000000000000000001".to_string()), ..base.clone() },
        ];

        for mutated in mutations {
            assert_ne!(hash_of(mutated.clone()), reference, "mutation {mutated:?} kept hash");
        }
    }

    #[test]
    fn test_absent_optional_is_omitted_not_nil() {
        let bytes = encode_action(&sample_order(None)).unwrap();
        // 0xc0 is msgpack nil; the only optional here is the cloid.
        assert!(!bytes.contains(&0xc0));
        // Order map has 6 keys without a cloid.
        assert!(bytes.windows(2).any(|w| w == [0x91, 0x86]));
    }
}
