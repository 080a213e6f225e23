//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] hlx_ws::WsError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] hlx_exchange::ExchangeError),

    #[error("Signer error: {0}")]
    Signer(#[from] hlx_signer::SignerError),

    #[error("Key store error: {0}")]
    Key(#[from] hlx_signer::KeyError),

    #[error("No signing key {0:?} in the key store")]
    NoSigningKey(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

pub type AppResult<T> = Result<T, AppError>;
