//! Exchange error types.

use hlx_signer::SignerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// `{"status":"err"}` from the exchange, carrying its message.
    #[error("Exchange rejected action: {0}")]
    Application(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Signing failed: {0}")]
    Signer(#[from] SignerError),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
