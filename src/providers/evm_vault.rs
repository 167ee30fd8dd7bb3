// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Vault ledger reached through an EVM-compatible RPC binding.

use alloy_network::Ethereum;
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use alloy_rpc_types::Filter;
use async_trait::async_trait;
use tracing::{debug, info};

use super::evm::{send_and_confirm, simulate, EvmPool};
use crate::config::PollingConfig;
use crate::contracts::vault::VaultContract;
use crate::error::Result;
use crate::protocol::{Recipient, UsdcAmount};
use crate::traits::{VaultLedger, VaultPosition};
use crate::vault::VaultHistory;

/// [`VaultLedger`] signed by a relayer account.
///
/// Relayer deposits are only attempted when the deployment says the vault
/// accepts them; see [`EvmVault::with_deposit_on_behalf`].
#[derive(Debug, Clone)]
pub struct EvmVault<P>
where
    P: Provider<Ethereum> + Clone,
{
    vault: Address,
    relayer: Address,
    pool: EvmPool<P>,
    deposit_on_behalf: bool,
    receipt_polling: PollingConfig,
}

impl<P> EvmVault<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    pub fn new(vault: Address, relayer: Address, pool: EvmPool<P>) -> Self {
        Self {
            vault,
            relayer,
            pool,
            deposit_on_behalf: false,
            receipt_polling: PollingConfig::receipt_default(),
        }
    }

    pub fn with_deposit_on_behalf(mut self, enabled: bool) -> Self {
        self.deposit_on_behalf = enabled;
        self
    }

    pub fn with_receipt_polling(mut self, polling: PollingConfig) -> Self {
        self.receipt_polling = polling;
        self
    }

    fn contract(&self) -> Result<VaultContract<P>> {
        Ok(VaultContract::new(self.vault, self.pool.primary()?.inner().clone()))
    }

    /// Replays the vault's `Deposited` / `Withdrawn` logs from `from_block`.
    pub async fn history(&self, from_block: u64) -> Result<VaultHistory> {
        let filter = Filter::new().address(self.vault).from_block(from_block);

        let logs = self
            .pool
            .read("eth_getLogs", |client| {
                let filter = filter.clone();
                async move { Ok(client.inner().get_logs(&filter).await?) }
            })
            .await?;

        debug!(vault = %self.vault, from_block, logs = logs.len(), event = "vault_logs_fetched");
        VaultHistory::from_logs(self.vault, &logs)
    }
}

#[async_trait]
impl<P> VaultLedger for EvmVault<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    fn supports_deposit_on_behalf(&self) -> bool {
        self.deposit_on_behalf
    }

    async fn deposit_for(&self, user: Recipient, amount: UsdcAmount) -> Result<TxHash> {
        let request =
            self.contract()?
                .deposit_for_transaction(self.relayer, user.evm_address()?, amount.base_units());

        simulate(&self.pool, "depositFor", &request).await?;
        let receipt = send_and_confirm(&self.pool, "depositFor", request, self.receipt_polling).await?;

        info!(
            vault_tx_hash = %receipt.transaction_hash,
            user = %user,
            amount = %amount,
            event = "vault_deposit_confirmed"
        );
        Ok(receipt.transaction_hash)
    }

    async fn withdraw_to(
        &self,
        owner: Recipient,
        recipient: Recipient,
        amount: UsdcAmount,
    ) -> Result<TxHash> {
        let request = self.contract()?.withdraw_to_transaction(
            self.relayer,
            owner.evm_address()?,
            recipient.evm_address()?,
            amount.base_units(),
        );

        simulate(&self.pool, "withdrawTo", &request).await?;
        let receipt = send_and_confirm(&self.pool, "withdrawTo", request, self.receipt_polling).await?;

        info!(
            vault_tx_hash = %receipt.transaction_hash,
            owner = %owner,
            recipient = %recipient,
            amount = %amount,
            event = "vault_withdrawal_confirmed"
        );
        Ok(receipt.transaction_hash)
    }

    async fn position(&self, user: Recipient) -> Result<VaultPosition> {
        let (vault, user) = (self.vault, user.evm_address()?);

        let (principal, accrued_yield) = self
            .pool
            .read("positionOf", |client| async move {
                Ok(VaultContract::new(vault, client.inner().clone())
                    .position_of(user)
                    .await?)
            })
            .await?;

        Ok(VaultPosition {
            principal: principal.into(),
            accrued_yield: accrued_yield.into(),
        })
    }
}
