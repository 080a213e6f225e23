//! Error types for hlx-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Invalid client order id: {0}")]
    InvalidClientOrderId(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
