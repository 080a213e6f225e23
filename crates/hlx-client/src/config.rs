//! Application configuration.
//!
//! Loaded from a TOML file. Every section is optional and falls back to
//! defaults that point at mainnet with no watched account.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use hlx_core::{Network, DEFAULT_SIGNATURE_CHAIN_ID};
use hlx_feed::DEFAULT_TAPE_LEN;
use hlx_signer::Address;
use hlx_telemetry::LoggingConfig;
use hlx_ws::ConnectionConfig;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// `[network]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub name: Network,
    /// Overrides the network's WebSocket URL.
    pub ws_url: Option<String>,
    /// Overrides the network's REST base URL.
    pub api_url: Option<String>,
}

/// `[ws]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WsSection {
    pub heartbeat_interval_ms: u64,
    pub outbound_buffer: usize,
    /// Account for the `webData2` feed. Defaults to the signing key's address.
    pub watched_account: Option<String>,
    /// How long to wait for the socket before giving up.
    pub connect_timeout_ms: u64,
}

impl Default for WsSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            outbound_buffer: 100,
            watched_account: None,
            connect_timeout_ms: 10_000,
        }
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    50_000
}

/// `[exchange]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeSection {
    pub timeout_ms: u64,
    pub signature_chain_id: u64,
    /// Trade order-class actions for this vault.
    pub vault_address: Option<String>,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            signature_chain_id: DEFAULT_SIGNATURE_CHAIN_ID,
            vault_address: None,
        }
    }
}

/// `[feed]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    /// Coins whose trades and book are streamed.
    pub coins: Vec<String>,
    pub tape_len: usize,
    /// Period of the state summary log line.
    pub status_interval_secs: u64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            coins: Vec::new(),
            tape_len: DEFAULT_TAPE_LEN,
            status_interval_secs: 30,
        }
    }
}

/// `[key]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeySection {
    /// Directory of the file key store.
    pub dir: PathBuf,
    pub name: String,
    /// Create and store a fresh key when none exists.
    pub generate: bool,
}

impl Default for KeySection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("keys"),
            name: "trading".to_string(),
            generate: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkSection,
    pub ws: WsSection,
    pub exchange: ExchangeSection,
    pub feed: FeedSection,
    pub key: KeySection,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {e}", path.display())))?;
        content.parse()
    }

    /// Reject values that would only fail later at runtime.
    pub fn validate(&self) -> AppResult<()> {
        if self.ws.heartbeat_interval_ms == 0 {
            return Err(AppError::Config("ws.heartbeat_interval_ms must be > 0".to_string()));
        }
        if self.feed.tape_len == 0 {
            return Err(AppError::Config("feed.tape_len must be > 0".to_string()));
        }
        if let Some(account) = &self.ws.watched_account {
            parse_address("ws.watched_account", account)?;
        }
        self.vault_address()?;
        Ok(())
    }

    pub fn ws_url(&self) -> String {
        self.network
            .ws_url
            .clone()
            .unwrap_or_else(|| self.network.name.ws_url().to_string())
    }

    pub fn api_url(&self) -> String {
        self.network
            .api_url
            .clone()
            .unwrap_or_else(|| self.network.name.api_url().to_string())
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.ws_url(),
            heartbeat_interval_ms: self.ws.heartbeat_interval_ms,
            outbound_buffer: self.ws.outbound_buffer,
            ..ConnectionConfig::default()
        }
    }

    pub fn vault_address(&self) -> AppResult<Option<Address>> {
        self.exchange
            .vault_address
            .as_deref()
            .map(|v| parse_address("exchange.vault_address", v))
            .transpose()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.ws.connect_timeout_ms)
    }
}

impl FromStr for AppConfig {
    type Err = AppError;

    fn from_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

pub fn parse_address(field: &str, value: &str) -> AppResult<Address> {
    Address::from_str(value).map_err(|e| AppError::Config(format!("{field}: {value:?}: {e}")))
}
