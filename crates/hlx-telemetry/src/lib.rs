//! Structured logging for the hlx crates.
//!
//! `tracing` with an `EnvFilter`; JSON lines in production, pretty output
//! during development.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat, LoggingConfig, DEFAULT_FILTER};
