//! HTTP client for the exchange action endpoint.

use std::time::Duration;

use hlx_core::Network;
use hlx_signer::{address_to_wire, ActionSignature, Address};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ExchangeError, ExchangeResult};
use crate::response::ExchangeResponse;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for `POST /exchange`.
///
/// Key order matters only for readability here; the exchange hashes the
/// `action` value, not the envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a, A: Serialize> {
    action: &'a A,
    nonce: u64,
    signature: &'a ActionSignature,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_after: Option<u64>,
}

/// JSON body for a signed action.
///
/// `vaultAddress` and `expiresAfter` are omitted when absent.
pub fn build_request_body<A: Serialize>(
    action: &A,
    nonce: u64,
    signature: &ActionSignature,
    vault_address: Option<Address>,
    expires_after: Option<u64>,
) -> ExchangeResult<Value> {
    let request = ExchangeRequest {
        action,
        nonce,
        signature,
        vault_address: vault_address.as_ref().map(address_to_wire),
        expires_after,
    };
    serde_json::to_value(&request).map_err(|e| ExchangeError::Decode(e.to_string()))
}

/// Map an HTTP status and body to a result.
///
/// `{"status":"err"}` is an application error even under HTTP 200.
pub fn interpret_response(status: u16, body: &str) -> ExchangeResult<ExchangeResponse> {
    if !(200..300).contains(&status) {
        return Err(ExchangeError::Http {
            status,
            body: body.to_string(),
        });
    }

    let envelope: Value = serde_json::from_str(body)
        .map_err(|e| ExchangeError::Decode(format!("invalid JSON body: {e}")))?;

    match envelope.get("status").and_then(Value::as_str) {
        Some("ok") => {
            let response = envelope.get("response").cloned().unwrap_or(Value::Null);
            if response.is_null() {
                return Ok(ExchangeResponse {
                    response_type: String::new(),
                    data: Value::Null,
                });
            }
            serde_json::from_value(response)
                .map_err(|e| ExchangeError::Decode(format!("unexpected ok response: {e}")))
        }
        Some("err") => {
            let message = match envelope.get("response") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Err(ExchangeError::Application(message))
        }
        other => Err(ExchangeError::Decode(format!(
            "unexpected status field: {other:?}"
        ))),
    }
}

/// Client for the exchange action endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    /// HTTP client.
    client: Client,
    /// Full `/exchange` URL.
    exchange_url: String,
}

impl ExchangeClient {
    /// Create a client for `base_url` (e.g. "https://api.hyperliquid.xyz").
    pub fn new(base_url: &str) -> ExchangeResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            exchange_url: format!("{}/exchange", base_url.trim_end_matches('/')),
        })
    }

    pub fn for_network(network: Network) -> ExchangeResult<Self> {
        Self::new(network.api_url())
    }

    pub fn exchange_url(&self) -> &str {
        &self.exchange_url
    }

    /// Submit a signed action.
    pub async fn submit<A: Serialize>(
        &self,
        action: &A,
        nonce: u64,
        signature: &ActionSignature,
        vault_address: Option<Address>,
    ) -> ExchangeResult<ExchangeResponse> {
        self.submit_expiring(action, nonce, signature, vault_address, None)
            .await
    }

    /// Submit a signed action that carries `expiresAfter`.
    ///
    /// The expiry must be the one that went into the action hash.
    pub async fn submit_expiring<A: Serialize>(
        &self,
        action: &A,
        nonce: u64,
        signature: &ActionSignature,
        vault_address: Option<Address>,
        expires_after: Option<u64>,
    ) -> ExchangeResult<ExchangeResponse> {
        let body = build_request_body(action, nonce, signature, vault_address, expires_after)?;
        debug!(url = %self.exchange_url, nonce, "Submitting action");

        let response = self
            .client
            .post(&self.exchange_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(format!("Failed to read response: {e}")))?;

        match interpret_response(status, &text) {
            Ok(resp) => {
                info!(nonce, response_type = %resp.response_type, "Action accepted");
                Ok(resp)
            }
            Err(e) => {
                warn!(nonce, error = %e, "Action failed");
                Err(e)
            }
        }
    }
}
