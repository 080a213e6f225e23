//! Application wiring.
//!
//! Builds the connection manager, feed state and (when a key is available)
//! the signing exchange client from one [`AppConfig`], then either streams
//! feeds or executes a single action.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hlx_exchange::{Exchange, ExchangeClient, ExchangeResponse};
use hlx_feed::{Attachment, FeedState};
use hlx_signer::{
    address_to_wire, load_or_generate, ActionSignature, ActionSigner, Address, DepositPermit,
    FileKeyStore, KeyManager, KeyStore, OrderRequest,
};
use hlx_ws::{ConnectionManager, WsError, WsResult};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cli::Command;
use crate::config::{parse_address, AppConfig};
use crate::error::{AppError, AppResult};

/// Result of a one-shot command.
#[derive(Debug)]
pub enum CommandOutput {
    Address(Address),
    Response(ExchangeResponse),
    Permit {
        permit: DepositPermit,
        signature: ActionSignature,
    },
}

pub struct Application {
    config: AppConfig,
    manager: Arc<ConnectionManager>,
    feed: Arc<FeedState>,
    exchange: Option<Exchange>,
}

impl Application {
    /// Build with the file key store from `[key]`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let store = FileKeyStore::new(&config.key.dir);
        Self::with_key_store(config, &store)
    }

    pub fn with_key_store(config: AppConfig, store: &dyn KeyStore) -> AppResult<Self> {
        let keys = if config.key.generate {
            KeyManager::new(load_or_generate(store, &config.key.name)?)
        } else {
            KeyManager::load(store, &config.key.name)?
        };

        let exchange = match keys.address() {
            Some(address) => {
                info!(%address, network = %config.network.name, "Signing key loaded");
                let signer = ActionSigner::new(Arc::new(keys), config.network.name)?
                    .with_signature_chain_id(config.exchange.signature_chain_id);
                let client = ExchangeClient::with_timeout(
                    &config.api_url(),
                    Duration::from_millis(config.exchange.timeout_ms),
                )?;
                let mut exchange = Exchange::new(client, Arc::new(signer));
                if let Some(vault) = config.vault_address()? {
                    exchange = exchange.with_vault(vault);
                }
                Some(exchange)
            }
            None => {
                warn!(key = %config.key.name, "No signing key; observation only");
                None
            }
        };

        let manager = Arc::new(ConnectionManager::new(config.connection_config()));
        let watched = match &config.ws.watched_account {
            Some(account) => Some(address_to_wire(&parse_address("ws.watched_account", account)?)),
            None => exchange
                .as_ref()
                .and_then(|e| e.signer().address())
                .map(|a| address_to_wire(&a)),
        };
        if let Some(account) = watched {
            manager.update_watched_account(&account)?;
        }

        let feed = Arc::new(FeedState::new(config.feed.tape_len));

        Ok(Self {
            config,
            manager,
            feed,
            exchange,
        })
    }

    pub fn manager(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.manager)
    }

    pub fn feed(&self) -> Arc<FeedState> {
        Arc::clone(&self.feed)
    }

    pub fn exchange(&self) -> Option<&Exchange> {
        self.exchange.as_ref()
    }

    fn require_exchange(&self) -> AppResult<&Exchange> {
        self.exchange
            .as_ref()
            .ok_or_else(|| AppError::NoSigningKey(self.config.key.name.clone()))
    }

    /// Stream feeds until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
    }

    /// Stream feeds until `shutdown` resolves or the server closes the socket.
    pub async fn run_until<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        info!(url = %self.config.ws_url(), coins = ?self.config.feed.coins, "Starting feed");

        let owned = self.feed.attach(&self.manager);
        let mut connection = self.spawn_connection();

        if let Err(e) = self.wait_connected(&connection).await {
            self.manager.shutdown();
            connection.abort();
            return Err(e);
        }

        let mut attachments: Vec<Attachment> = vec![owned];
        for coin in &self.config.feed.coins {
            attachments.push(self.feed.subscribe_coin(&self.manager, coin)?);
        }

        let period = Duration::from_secs(self.config.feed.status_interval_secs.max(1));
        let mut status = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        tokio::pin!(shutdown);

        let mut closed_by_server = false;
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                result = &mut connection => {
                    match result {
                        Ok(Ok(())) => warn!("Connection closed"),
                        Ok(Err(e)) => error!(error = %e, "Connection failed"),
                        Err(e) => error!(error = %e, "Connection task panicked"),
                    }
                    closed_by_server = true;
                    break;
                }
                _ = status.tick() => self.log_status(),
            }
        }

        for attachment in &attachments {
            self.feed.detach(&self.manager, attachment);
        }
        if !closed_by_server {
            self.manager.shutdown();
            match tokio::time::timeout(Duration::from_secs(5), connection).await {
                Ok(_) => info!("Connection closed cleanly"),
                Err(_) => warn!("Connection did not close within 5s"),
            }
        }
        Ok(())
    }

    fn spawn_connection(&self) -> JoinHandle<WsResult<()>> {
        let manager = Arc::clone(&self.manager);
        tokio::spawn(async move { manager.connect().await })
    }

    async fn wait_connected(&self, connection: &JoinHandle<WsResult<()>>) -> AppResult<()> {
        let deadline = tokio::time::Instant::now() + self.config.connect_timeout();
        while !self.manager.is_connected() {
            if connection.is_finished() {
                return Err(WsError::ConnectionFailed(self.config.ws_url()).into());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::Timeout(format!(
                    "WebSocket connect to {}",
                    self.config.ws_url()
                )));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    fn log_status(&self) {
        let account_value = self.feed.account().map(|a| a.account_value);
        for coin in &self.config.feed.coins {
            let mid = self.feed.mid(coin).map(|m| m.px);
            let last = self.feed.last_trade(coin).map(|t| t.px);
            let spread = self.feed.book_top(coin).and_then(|b| b.spread());
            info!(%coin, ?mid, ?last, ?spread, "Feed status");
        }
        info!(
            mids = self.feed.mid_count(),
            ?account_value,
            subscriptions = self.manager.active_subscriptions().len(),
            "State summary"
        );
    }

    /// Execute a one-shot command. `Watch` is handled by [`Application::run`].
    pub async fn execute(&self, command: Command) -> AppResult<CommandOutput> {
        let output = match command {
            Command::Watch => {
                return Err(AppError::Config("watch is not a one-shot command".to_string()));
            }
            Command::Address => {
                let address = self
                    .require_exchange()?
                    .signer()
                    .address()
                    .ok_or_else(|| AppError::NoSigningKey(self.config.key.name.clone()))?;
                CommandOutput::Address(address)
            }
            Command::Order {
                asset,
                side,
                px,
                sz,
                tif,
                reduce_only,
            } => {
                let mut order = OrderRequest::limit(asset, side.into(), px, sz, tif.into());
                if reduce_only {
                    order = order.reduce_only();
                }
                CommandOutput::Response(self.require_exchange()?.place_order(&[order]).await?)
            }
            Command::Cancel { asset, oid } => {
                CommandOutput::Response(self.require_exchange()?.cancel(asset, oid).await?)
            }
            Command::Leverage {
                asset,
                leverage,
                cross,
            } => CommandOutput::Response(
                self.require_exchange()?
                    .update_leverage(asset, cross, leverage)
                    .await?,
            ),
            Command::Withdraw {
                destination,
                amount,
            } => CommandOutput::Response(
                self.require_exchange()?
                    .withdraw(destination, &amount)
                    .await?,
            ),
            Command::ApproveAgent { agent, name } => CommandOutput::Response(
                self.require_exchange()?.approve_agent(agent, name).await?,
            ),
            Command::ApproveBuilderFee {
                builder,
                max_fee_rate,
            } => CommandOutput::Response(
                self.require_exchange()?
                    .approve_builder_fee(builder, &max_fee_rate)
                    .await?,
            ),
            Command::DepositPermit {
                value,
                nonce,
                deadline,
            } => {
                let (permit, signature) = self
                    .require_exchange()?
                    .sign_deposit_permit(value, nonce, deadline)
                    .await?;
                CommandOutput::Permit { permit, signature }
            }
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlx_signer::MemoryKeyStore;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_observation_only_without_key() {
        let app = Application::with_key_store(AppConfig::default(), &MemoryKeyStore::new()).unwrap();
        assert!(app.exchange().is_none());
        assert_eq!(app.manager().watched_account(), hlx_ws::PLACEHOLDER_ACCOUNT);
    }

    #[test]
    fn test_watches_signer_address_by_default() {
        let store = MemoryKeyStore::new();
        store.save_key("trading", TEST_KEY).unwrap();

        let app = Application::with_key_store(AppConfig::default(), &store).unwrap();
        assert!(app.exchange().is_some());
        assert_eq!(
            app.manager().watched_account(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_generate_key_when_configured() {
        let store = MemoryKeyStore::new();
        let mut config = AppConfig::default();
        config.key.generate = true;

        let app = Application::with_key_store(config, &store).unwrap();
        assert!(app.exchange().is_some());
        assert!(store.get_key("trading").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_action_without_key_fails() {
        let app = Application::with_key_store(AppConfig::default(), &MemoryKeyStore::new()).unwrap();
        let result = app.execute(Command::Cancel { asset: 0, oid: 1 }).await;
        assert!(matches!(result, Err(AppError::NoSigningKey(_))));
    }

    #[tokio::test]
    async fn test_address_command() {
        let store = MemoryKeyStore::new();
        store.save_key("trading", TEST_KEY).unwrap();
        let app = Application::with_key_store(AppConfig::default(), &store).unwrap();

        match app.execute(Command::Address).await.unwrap() {
            CommandOutput::Address(address) => {
                assert_eq!(address_to_wire(&address), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266")
            }
            other => panic!("unexpected output {other:?}"),
        }
    }
}
