//! Request signing for exchange authentication.
//!
//! Two paths:
//! 1. Order-class actions: `action_hash` → phantom agent → EIP-712 under the
//!    `Exchange` domain.
//! 2. Administrative actions and deposit permits: the action itself is the
//!    EIP-712 message, signed under its own domain.

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use alloy::sol_types::Eip712Domain;
use hlx_core::{Network, DEFAULT_SIGNATURE_CHAIN_ID};
use serde_json::Value;
use tracing::debug;

use crate::action::{DepositPermit, UserAction};
use crate::agent::PhantomAgent;
use crate::error::{KeyError, SignerError, SignerResult};
use crate::hash::SigningInput;
use crate::key_store::{load_signer, KeyStore};
use crate::signature::ActionSignature;
use crate::typed_data::{ActionKind, TypedDataSchema};

// =============================================================================
// KeyManager
// =============================================================================

/// Holds the signing key.
///
/// Keys are loaded once at startup; there is no runtime rotation.
pub struct KeyManager {
    signer: Option<PrivateKeySigner>,
}

impl KeyManager {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    /// Observation-only: no key.
    pub fn empty() -> Self {
        Self { signer: None }
    }

    /// Load `name` from a key store. Invalid stored keys are purged.
    pub fn load(store: &dyn KeyStore, name: &str) -> Result<Self, KeyError> {
        Ok(Self {
            signer: load_signer(store, name)?,
        })
    }

    pub fn signer(&self) -> Option<&PrivateKeySigner> {
        self.signer.as_ref()
    }

    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}

// =============================================================================
// ActionSigner
// =============================================================================

/// Signs actions for one network.
pub struct ActionSigner {
    key_manager: Arc<KeyManager>,
    network: Network,
    signature_chain_id: u64,
}

impl ActionSigner {
    /// # Errors
    /// Returns `SignerError::NoKey` if the key manager holds no key.
    pub fn new(key_manager: Arc<KeyManager>, network: Network) -> SignerResult<Self> {
        if key_manager.signer().is_none() {
            return Err(SignerError::NoKey);
        }
        Ok(Self {
            key_manager,
            network,
            signature_chain_id: DEFAULT_SIGNATURE_CHAIN_ID,
        })
    }

    /// Chain id for the user-signed domain. Actions must carry the same value
    /// in `signatureChainId`.
    pub fn with_signature_chain_id(mut self, chain_id: u64) -> Self {
        self.signature_chain_id = chain_id;
        self
    }

    fn key(&self) -> SignerResult<&PrivateKeySigner> {
        self.key_manager.signer().ok_or(SignerError::NoKey)
    }

    /// Sign an order-class action through the phantom agent.
    pub async fn sign_l1_action(&self, input: &SigningInput) -> SignerResult<ActionSignature> {
        let key = self.key()?;
        let action_hash = input.action_hash()?;
        let agent = PhantomAgent::new(action_hash, self.network);

        debug!(
            action = input.action.tag(),
            nonce = input.nonce,
            vault = input.vault_address.is_some(),
            "Signing L1 action"
        );

        let signature = agent.sign(key).await?;
        Ok(ActionSignature::from_signature(&signature))
    }

    /// Sign an administrative action as typed data.
    pub async fn sign_user_action(&self, action: &UserAction) -> SignerResult<ActionSignature> {
        let kind = ActionKind::from_tag(action.tag())
            .ok_or_else(|| SignerError::typed_data("type", format!("unknown tag {}", action.tag())))?;
        let params = kind.typed_data_params(self.network, self.signature_chain_id);

        debug!(action = action.tag(), nonce = action.nonce(), "Signing user action");
        self.sign_typed_data(&params.domain, params.schema, &action.typed_message())
            .await
    }

    /// Sign an EIP-2612 permit for the bridge under the USDC domain.
    pub async fn sign_deposit_permit(&self, permit: &DepositPermit) -> SignerResult<ActionSignature> {
        let params = ActionKind::DepositPermit.typed_data_params(self.network, self.signature_chain_id);
        let message = serde_json::to_value(permit)
            .map_err(|e| SignerError::SerializationFailed(e.to_string()))?;

        debug!(spender = %permit.spender, deadline = %permit.deadline, "Signing deposit permit");
        self.sign_typed_data(&params.domain, params.schema, &message).await
    }

    /// Generic EIP-712 signing over `(domain, schema, message)`.
    pub async fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        schema: &TypedDataSchema,
        message: &Value,
    ) -> SignerResult<ActionSignature> {
        let key = self.key()?;
        let hash = schema.signing_hash(domain, message)?;
        let signature = key.sign_hash(&hash).await?;
        Ok(ActionSignature::from_signature(&signature))
    }

    pub fn address(&self) -> Option<Address> {
        self.key_manager.address()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn signature_chain_id(&self) -> u64 {
        self.signature_chain_id
    }
}

/// Recover the signer of `(domain, schema, message)`.
pub fn recover_typed_data(
    domain: &Eip712Domain,
    schema: &TypedDataSchema,
    message: &Value,
    signature: &ActionSignature,
) -> SignerResult<Address> {
    let hash = schema.signing_hash(domain, message)?;
    recover_hash(&hash, signature)
}

/// Recover the signer of an already-computed signing hash.
pub fn recover_hash(hash: &B256, signature: &ActionSignature) -> SignerResult<Address> {
    signature
        .to_primitive()?
        .recover_address_from_prehash(hash)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))
}
