//! Phantom agent construction for order-class actions.
//!
//! The exchange never sees the phantom agent on the wire: it rebuilds
//! `{source, connectionId}` from the posted action and checks the signature
//! against it.

use alloy::primitives::{PrimitiveSignature, B256};
use alloy::signers::Signer as AlloySigner;
use alloy::sol;
use alloy::sol_types::SolStruct;
use hlx_core::Network;

use crate::typed_data::exchange_domain;

sol! {
    #[derive(Debug)]
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

/// Ephemeral `{source, connectionId}` struct signed in place of the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhantomAgent {
    /// "a" (mainnet) or "b" (testnet)
    pub source: String,
    /// Action hash.
    pub connection_id: B256,
}

impl PhantomAgent {
    pub fn new(action_hash: B256, network: Network) -> Self {
        Self {
            source: network.agent_source().to_string(),
            connection_id: action_hash,
        }
    }

    /// `keccak256(0x1901 || exchange_domain || hashStruct(agent))`
    pub fn signing_hash(&self) -> B256 {
        let agent = Agent {
            source: self.source.clone(),
            connectionId: self.connection_id,
        };
        agent.eip712_signing_hash(&exchange_domain())
    }

    pub async fn sign<S: AlloySigner + Send + Sync>(
        &self,
        signer: &S,
    ) -> Result<PrimitiveSignature, alloy::signers::Error> {
        signer.sign_hash(&self.signing_hash()).await
    }

    /// Typed-data message form, for the generic encoder.
    pub fn to_message(&self) -> serde_json::Value {
        serde_json::json!({
            "source": self.source,
            "connectionId": self.connection_id.to_string(),
        })
    }
}
