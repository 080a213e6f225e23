//! Signer error types.

use thiserror::Error;

/// Signing errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("No signing key available")]
    NoKey,

    #[error("Signing failed: {0}")]
    SigningFailed(#[from] alloy::signers::Error),

    #[error("Action serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Typed data field `{field}` invalid: {reason}")]
    TypedData { field: String, reason: String },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

impl SignerError {
    pub(crate) fn typed_data(field: &str, reason: impl Into<String>) -> Self {
        Self::TypedData {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type SignerResult<T> = Result<T, SignerError>;

/// Key storage errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Invalid key format: {0}")]
    InvalidFormat(String),

    #[error("Key store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
