//! One-call exchange operations: fresh nonce, sign, submit.

use std::sync::Arc;

use hlx_core::ClientOrderId;
use hlx_signer::{
    bridge_address, ActionSignature, ActionSigner, Address, ApproveAgentAction,
    ApproveBuilderFeeAction, CancelAction, CancelByCloidAction, CancelByCloidWire, CancelWire,
    Clock, DepositPermit, L1Action, NonceManager, OrderAction, OrderRequest, SignerError,
    SigningInput, SystemClock, UpdateLeverageAction, UserAction, WithdrawAction,
};
use tracing::info;

use crate::client::ExchangeClient;
use crate::error::ExchangeResult;
use crate::response::ExchangeResponse;

/// Exchange client bound to a signer and a nonce source.
///
/// Order-class actions are signed through the phantom agent and may trade for
/// a vault; administrative actions are always for the signer's own account.
pub struct Exchange<C: Clock = SystemClock> {
    client: ExchangeClient,
    signer: Arc<ActionSigner>,
    nonces: Arc<NonceManager<C>>,
    vault_address: Option<Address>,
}

impl Exchange<SystemClock> {
    pub fn new(client: ExchangeClient, signer: Arc<ActionSigner>) -> Self {
        Self::with_nonce_manager(client, signer, Arc::new(NonceManager::with_system_clock()))
    }
}

impl<C: Clock> Exchange<C> {
    pub fn with_nonce_manager(
        client: ExchangeClient,
        signer: Arc<ActionSigner>,
        nonces: Arc<NonceManager<C>>,
    ) -> Self {
        Self {
            client,
            signer,
            nonces,
            vault_address: None,
        }
    }

    /// Trade on behalf of `vault` for order-class actions.
    pub fn with_vault(mut self, vault: Address) -> Self {
        self.vault_address = Some(vault);
        self
    }

    pub fn signer(&self) -> &ActionSigner {
        &self.signer
    }

    pub fn vault_address(&self) -> Option<Address> {
        self.vault_address
    }

    async fn submit_l1(&self, action: L1Action) -> ExchangeResult<ExchangeResponse> {
        let nonce = self.nonces.next();
        let mut input = SigningInput::new(action, nonce);
        if let Some(vault) = self.vault_address {
            input = input.with_vault(vault);
        }

        let signature = self.signer.sign_l1_action(&input).await?;
        self.client
            .submit(&input.action, nonce, &signature, input.vault_address)
            .await
    }

    async fn submit_user(&self, action: UserAction) -> ExchangeResult<ExchangeResponse> {
        let signature = self.signer.sign_user_action(&action).await?;
        self.client
            .submit(&action, action.nonce(), &signature, None)
            .await
    }

    pub async fn place_order(&self, orders: &[OrderRequest]) -> ExchangeResult<ExchangeResponse> {
        info!(count = orders.len(), "Placing orders");
        let wires = orders.iter().map(OrderRequest::to_wire).collect();
        self.submit_l1(L1Action::Order(OrderAction::new(wires))).await
    }

    pub async fn cancel(&self, asset: u32, oid: u64) -> ExchangeResult<ExchangeResponse> {
        info!(asset, oid, "Cancelling order");
        self.submit_l1(L1Action::Cancel(CancelAction {
            cancels: vec![CancelWire { asset, oid }],
        }))
        .await
    }

    pub async fn cancel_by_cloid(
        &self,
        asset: u32,
        cloid: &ClientOrderId,
    ) -> ExchangeResult<ExchangeResponse> {
        info!(asset, %cloid, "Cancelling order by cloid");
        self.submit_l1(L1Action::CancelByCloid(CancelByCloidAction {
            cancels: vec![CancelByCloidWire {
                asset,
                cloid: cloid.to_string(),
            }],
        }))
        .await
    }

    pub async fn update_leverage(
        &self,
        asset: u32,
        is_cross: bool,
        leverage: u32,
    ) -> ExchangeResult<ExchangeResponse> {
        info!(asset, is_cross, leverage, "Updating leverage");
        self.submit_l1(L1Action::UpdateLeverage(UpdateLeverageAction {
            asset,
            is_cross,
            leverage,
        }))
        .await
    }

    /// Withdraw `amount` USDC (decimal string) to `destination`.
    pub async fn withdraw(&self, destination: Address, amount: &str) -> ExchangeResult<ExchangeResponse> {
        info!(%destination, amount, "Requesting withdrawal");
        let action = UserAction::Withdraw(WithdrawAction::new(
            self.signer.network(),
            self.signer.signature_chain_id(),
            destination,
            amount,
            self.nonces.next(),
        ));
        self.submit_user(action).await
    }

    pub async fn approve_agent(
        &self,
        agent: Address,
        name: Option<String>,
    ) -> ExchangeResult<ExchangeResponse> {
        info!(%agent, ?name, "Approving agent");
        let action = UserAction::ApproveAgent(ApproveAgentAction::new(
            self.signer.network(),
            self.signer.signature_chain_id(),
            agent,
            name,
            self.nonces.next(),
        ));
        self.submit_user(action).await
    }

    /// `max_fee_rate` is a percentage string such as "0.001%".
    pub async fn approve_builder_fee(
        &self,
        builder: Address,
        max_fee_rate: &str,
    ) -> ExchangeResult<ExchangeResponse> {
        info!(%builder, max_fee_rate, "Approving builder fee");
        let action = UserAction::ApproveBuilderFee(ApproveBuilderFeeAction::new(
            self.signer.network(),
            self.signer.signature_chain_id(),
            builder,
            max_fee_rate,
            self.nonces.next(),
        ));
        self.submit_user(action).await
    }

    /// Sign a USDC permit for the bridge. Nothing is submitted; the permit is
    /// handed to the bridge contract by the caller.
    ///
    /// `permit_nonce` is the token's permit nonce for the signer, not a
    /// timestamp.
    pub async fn sign_deposit_permit(
        &self,
        value: u64,
        permit_nonce: u64,
        deadline: u64,
    ) -> ExchangeResult<(DepositPermit, ActionSignature)> {
        let owner = self.signer.address().ok_or(SignerError::NoKey)?;
        let permit = DepositPermit::new(
            owner,
            bridge_address(self.signer.network()),
            value,
            permit_nonce,
            deadline,
        );
        let signature = self.signer.sign_deposit_permit(&permit).await?;
        Ok((permit, signature))
    }
}
