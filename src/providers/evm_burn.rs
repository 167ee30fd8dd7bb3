// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Approve-then-burn on an EVM source chain.

use alloy_network::Ethereum;
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use super::evm::{broadcast, confirm, send_and_confirm, simulate, EvmPool};
use crate::chain::ChainConfig;
use crate::config::PollingConfig;
use crate::contracts::erc20::Erc20Contract;
use crate::contracts::message_transmitter::extract_message_sent;
use crate::contracts::token_messenger::TokenMessengerContract;
use crate::error::{BridgeError, Result};
use crate::protocol::{DomainId, Recipient, UsdcAmount};
use crate::spans;
use crate::traits::{BurnReceipt, BurnSubmitter};

/// [`BurnSubmitter`] for one EVM chain.
///
/// `signer` must be an account the pool's endpoints can sign for (a wallet
/// filler on the alloy provider). The allowance is topped up only when it
/// falls short of the burn amount.
#[derive(Debug, Clone)]
pub struct EvmBurnSubmitter<P>
where
    P: Provider<Ethereum> + Clone,
{
    chain: ChainConfig,
    signer: Address,
    pool: EvmPool<P>,
    receipt_polling: PollingConfig,
}

impl<P> EvmBurnSubmitter<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    pub fn new(chain: ChainConfig, signer: Address, pool: EvmPool<P>) -> Self {
        Self {
            chain,
            signer,
            pool,
            receipt_polling: PollingConfig::receipt_default(),
        }
    }

    pub fn with_receipt_polling(mut self, polling: PollingConfig) -> Self {
        self.receipt_polling = polling;
        self
    }

    async fn ensure_allowance(&self, amount: UsdcAmount) -> Result<()> {
        let (usdc, owner, spender) = (self.chain.usdc, self.signer, self.chain.token_messenger);

        let allowance = self
            .pool
            .read("allowance", |client| async move {
                Ok(Erc20Contract::new(usdc, client.inner().clone())
                    .allowance(owner, spender)
                    .await?)
            })
            .await?;

        if allowance >= amount.base_units() {
            return Ok(());
        }

        let client = self.pool.primary()?;
        let request = Erc20Contract::new(usdc, client.inner().clone()).approve_transaction(
            owner,
            spender,
            amount.base_units(),
        );

        let receipt = send_and_confirm(&self.pool, "approve", request, self.receipt_polling).await?;
        info!(
            approve_tx_hash = %receipt.transaction_hash,
            amount = %amount,
            event = "usdc_allowance_granted"
        );
        Ok(())
    }

    async fn approve_and_burn(
        &self,
        amount: UsdcAmount,
        destination_domain: DomainId,
        recipient: Recipient,
        cancel: &CancellationToken,
    ) -> Result<BurnReceipt> {
        self.ensure_allowance(amount).await?;

        if cancel.is_cancelled() {
            info!(event = "burn_cancelled_after_approve");
            return Err(BridgeError::Cancelled);
        }

        let client = self.pool.primary()?;
        let request = TokenMessengerContract::new(self.chain.token_messenger, client.inner().clone())
            .deposit_for_burn_transaction(
                self.signer,
                recipient,
                destination_domain,
                self.chain.usdc,
                amount.base_units(),
            );

        simulate(&self.pool, "depositForBurn", &request).await?;
        let burn_tx_hash = broadcast(&self.pool, "depositForBurn", request).await?;
        self.confirm_burn(burn_tx_hash).await
    }

    /// Waits for the burn receipt and pulls the message out of it.
    async fn confirm_burn(&self, burn_tx_hash: TxHash) -> Result<BurnReceipt> {
        let receipt = confirm(&self.pool, "depositForBurn", burn_tx_hash, self.receipt_polling)
            .await
            .map_err(|e| unconfirmed(burn_tx_hash, e))?;

        let message = extract_message_sent(
            burn_tx_hash,
            receipt.inner.logs(),
            self.chain.message_transmitter,
        )
        .map_err(|e| unconfirmed(burn_tx_hash, e))?;

        info!(
            burn_tx_hash = %burn_tx_hash,
            message_hash = %message.hash(),
            event = "burn_confirmed"
        );

        Ok(BurnReceipt {
            burn_tx_hash,
            message,
        })
    }
}

/// A revert means nothing was burned; anything else after the broadcast
/// leaves the burn in doubt and must keep its hash.
fn unconfirmed(tx_hash: TxHash, error: BridgeError) -> BridgeError {
    match error {
        e @ BridgeError::TransactionReverted { .. } => e,
        other => {
            warn!(burn_tx_hash = %tx_hash, error = %other, event = "burn_unconfirmed");
            BridgeError::BurnUnconfirmed {
                tx_hash,
                reason: other.to_string(),
            }
        }
    }
}

#[async_trait]
impl<P> BurnSubmitter for EvmBurnSubmitter<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    async fn burn(
        &self,
        amount: UsdcAmount,
        destination_domain: DomainId,
        recipient: Recipient,
        cancel: &CancellationToken,
    ) -> Result<BurnReceipt> {
        let span = spans::burn(self.chain.cctp_domain, destination_domain, &recipient, &amount);

        async move {
            self.approve_and_burn(amount, destination_domain, recipient, cancel)
                .await
                .inspect_err(spans::record_error)
        }
        .instrument(span)
        .await
    }

    async fn recover(&self, burn_tx_hash: TxHash) -> Result<BurnReceipt> {
        let span = spans::recover_burn(self.chain.cctp_domain, burn_tx_hash);

        async move {
            self.confirm_burn(burn_tx_hash)
                .await
                .inspect_err(spans::record_error)
        }
        .instrument(span)
        .await
    }
}
