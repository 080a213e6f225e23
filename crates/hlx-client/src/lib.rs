//! hlx client application.
//!
//! Wires the crates together:
//! - WebSocket connection and feed state for the configured coins
//! - signing exchange client when a key is in the key store
//! - one-shot action commands (order, cancel, withdraw, approvals, permit)

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::{Application, CommandOutput};
pub use cli::{Args, Command};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
