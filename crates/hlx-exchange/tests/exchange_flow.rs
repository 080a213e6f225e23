//! Sign-and-submit flows against a mock exchange endpoint.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::MockExchange;
use hlx_core::{Network, OrderSide, TimeInForce};
use hlx_exchange::{Exchange, ExchangeClient, ExchangeError, OrderStatus};
use hlx_signer::{
    action_hash, recover_hash, recover_typed_data, ActionKind, ActionSignature, ActionSigner,
    Address, KeyManager, KeyStore, MemoryKeyStore, OrderRequest, PhantomAgent,
};
use rust_decimal_macros::dec;
use serde_json::json;

const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn signer() -> Arc<ActionSigner> {
    let store = MemoryKeyStore::new();
    store.save_key("trading", &format!("0x{TEST_PRIVATE_KEY}")).unwrap();
    let keys = KeyManager::load(&store, "trading").unwrap();
    Arc::new(ActionSigner::new(Arc::new(keys), Network::Testnet).unwrap())
}

async fn exchange(mock: &MockExchange) -> Exchange {
    Exchange::new(ExchangeClient::new(&mock.base_url()).unwrap(), signer())
}

#[tokio::test]
async fn test_withdraw_insufficient_balance_is_application_error() {
    let mock = MockExchange::start().await;
    mock.reply_with(
        StatusCode::OK,
        json!({"status": "err", "response": "insufficient balance"}),
    )
    .await;
    let exchange = exchange(&mock).await;

    let result = exchange.withdraw(Address::repeat_byte(0x11), "10").await;
    match result {
        Err(ExchangeError::Application(message)) => assert!(message.contains("insufficient balance")),
        other => panic!("expected application error, got {other:?}"),
    }

    let requests = mock.requests().await;
    assert_eq!(requests.len(), 1);
    let body = &requests[0];
    assert_eq!(body["action"]["type"], "withdraw3");
    assert_eq!(body["action"]["amount"], "10");
    assert_eq!(body["action"]["hyperliquidChain"], "Testnet");
    assert_eq!(body["nonce"], body["action"]["time"]);
    assert!(body.get("vaultAddress").is_none());

    // The posted action alone is enough to recover the signer.
    let signature: ActionSignature = serde_json::from_value(body["signature"].clone()).unwrap();
    let params = ActionKind::Withdraw.typed_data_params(Network::Testnet, exchange.signer().signature_chain_id());
    let recovered = recover_typed_data(&params.domain, params.schema, &body["action"], &signature).unwrap();
    assert_eq!(Some(recovered), exchange.signer().address());
}

#[tokio::test]
async fn test_place_order_signature_verifies_from_posted_json() {
    let mock = MockExchange::start().await;
    mock.reply_with(
        StatusCode::OK,
        json!({"status": "ok", "response": {"type": "order", "data": {"statuses": [{"resting": {"oid": 77738308}}]}}}),
    )
    .await;
    let exchange = exchange(&mock).await;

    let order = OrderRequest::limit(0, OrderSide::Buy, dec!(50000), dec!(0.01), TimeInForce::GoodTilCancelled);
    let response = exchange.place_order(&[order]).await.unwrap();
    assert_eq!(response.statuses(), vec![OrderStatus::Resting { oid: 77738308 }]);

    let body = &mock.requests().await[0];
    assert_eq!(body["action"]["type"], "order");
    assert_eq!(body["action"]["orders"][0]["p"], "50000");
    assert_eq!(body["action"]["orders"][0]["s"], "0.01");

    let nonce = body["nonce"].as_u64().unwrap();
    let hash = action_hash(&body["action"], None, nonce, None).unwrap();
    let agent = PhantomAgent::new(hash, Network::Testnet);
    let signature: ActionSignature = serde_json::from_value(body["signature"].clone()).unwrap();
    assert_eq!(
        Some(recover_hash(&agent.signing_hash(), &signature).unwrap()),
        exchange.signer().address()
    );
}

#[tokio::test]
async fn test_vault_address_is_posted_and_nonces_increase() {
    let mock = MockExchange::start().await;
    let vault = Address::repeat_byte(0x42);
    let exchange = exchange(&mock).await.with_vault(vault);

    exchange.cancel(3, 1001).await.unwrap();
    exchange.update_leverage(3, false, 5).await.unwrap();

    let requests = mock.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["action"], json!({"type": "cancel", "cancels": [{"a": 3, "o": 1001}]}));
    assert_eq!(requests[0]["vaultAddress"], format!("0x{}", "42".repeat(20)));
    assert_eq!(
        requests[1]["action"],
        json!({"type": "updateLeverage", "asset": 3, "isCross": false, "leverage": 5})
    );

    let first = requests[0]["nonce"].as_u64().unwrap();
    let second = requests[1]["nonce"].as_u64().unwrap();
    assert!(second > first);

    // Vault-less hash would not verify.
    let signature: ActionSignature = serde_json::from_value(requests[0]["signature"].clone()).unwrap();
    let with_vault = action_hash(&requests[0]["action"], Some(vault), first, None).unwrap();
    let without_vault = action_hash(&requests[0]["action"], None, first, None).unwrap();
    let address = exchange.signer().address();
    assert_eq!(
        Some(recover_hash(&PhantomAgent::new(with_vault, Network::Testnet).signing_hash(), &signature).unwrap()),
        address
    );
    assert_ne!(
        Some(recover_hash(&PhantomAgent::new(without_vault, Network::Testnet).signing_hash(), &signature).unwrap()),
        address
    );
}

#[tokio::test]
async fn test_user_actions_never_carry_vault() {
    let mock = MockExchange::start().await;
    let exchange = exchange(&mock).await.with_vault(Address::repeat_byte(0x42));

    exchange.approve_agent(Address::repeat_byte(0x22), None).await.unwrap();
    exchange
        .approve_builder_fee(Address::repeat_byte(0x33), "0.001%")
        .await
        .unwrap();

    let requests = mock.requests().await;
    assert_eq!(requests[0]["action"]["type"], "approveAgent");
    assert!(requests[0]["action"].get("agentName").is_none());
    assert_eq!(requests[1]["action"]["maxFeeRate"], "0.001%");
    assert!(requests.iter().all(|r| r.get("vaultAddress").is_none()));
}

#[tokio::test]
async fn test_http_error_status() {
    let mock = MockExchange::start().await;
    mock.reply_with(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}))
        .await;
    let exchange = exchange(&mock).await;

    let result = exchange.cancel(0, 1).await;
    assert!(matches!(result, Err(ExchangeError::Http { status: 500, .. })));
}

#[tokio::test]
async fn test_deposit_permit_is_signed_by_owner() {
    let mock = MockExchange::start().await;
    let exchange = exchange(&mock).await;

    let (permit, signature) = exchange
        .sign_deposit_permit(5_000_000, 0, 1_900_000_000)
        .await
        .unwrap();

    let params = ActionKind::DepositPermit.typed_data_params(Network::Testnet, exchange.signer().signature_chain_id());
    let message = serde_json::to_value(&permit).unwrap();
    let recovered = recover_typed_data(&params.domain, params.schema, &message, &signature).unwrap();
    assert_eq!(Some(recovered), exchange.signer().address());
    assert!(mock.requests().await.is_empty());
}
