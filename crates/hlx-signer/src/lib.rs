//! Exchange action signing.
//!
//! # Key Components
//!
//! - [`L1Action`] / [`UserAction`]: wire types for order-class and
//!   administrative actions
//! - [`action_hash`]: msgpack + nonce + vault marker + expiry, keccak256
//! - [`PhantomAgent`]: `{source, connectionId}` signed in place of L1 actions
//! - [`TypedDataSchema`] / [`ActionKind`]: EIP-712 schema and domain registry
//! - [`ActionSigner`]: signs both families and deposit permits
//! - [`NonceManager`]: strictly increasing millisecond nonces
//! - [`KeyStore`]: opaque key storage with [`MemoryKeyStore`] and [`FileKeyStore`]

pub mod action;
pub mod agent;
pub mod error;
pub mod hash;
pub mod key_store;
pub mod nonce;
pub mod signature;
pub mod signer;
pub mod typed_data;

pub use action::{
    address_to_wire, decimal_to_wire, signature_chain_id_hex, ApproveAgentAction,
    ApproveBuilderFeeAction, BuilderInfo, CancelAction, CancelByCloidAction, CancelByCloidWire,
    CancelWire, DepositPermit, L1Action, OrderAction, OrderRequest, OrderTypeWire, OrderWire,
    UpdateLeverageAction, UserAction, WithdrawAction,
};
pub use agent::PhantomAgent;
pub use error::{KeyError, SignerError, SignerResult};
pub use hash::{action_hash, encode_action, SigningInput};
pub use key_store::{
    load_or_generate, load_signer, validate_key_format, FileKeyStore, KeyStore, MemoryKeyStore,
};
pub use nonce::{Clock, NonceManager, SystemClock};
pub use signature::ActionSignature;
pub use signer::{recover_hash, recover_typed_data, ActionSigner, KeyManager};
pub use typed_data::{bridge_address, ActionKind, TypedDataSchema, TypedDataParams};

// Re-export alloy primitives callers need to build actions.
pub use alloy::primitives::{Address, B256};
