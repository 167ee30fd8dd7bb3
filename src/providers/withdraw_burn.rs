// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use alloy_primitives::TxHash;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

use crate::error::Result;
use crate::protocol::{DomainId, Recipient, UsdcAmount};
use crate::spans;
use crate::traits::{
    BurnReceipt, BurnSubmitter, VaultLedger, WithdrawBurnOutcome, WithdrawBurnSubmitter,
};

/// Vault withdrawal into a bridging account, followed by a burn from that
/// account on the vault's ledger.
///
/// A failed burn is reported as [`WithdrawBurnOutcome::WithdrawnOnly`]: the
/// withdrawal already happened and the funds now sit with `bridge_account`.
pub struct VaultWithdrawBurn {
    vault: Arc<dyn VaultLedger>,
    burner: Arc<dyn BurnSubmitter>,
    bridge_account: Recipient,
}

impl VaultWithdrawBurn {
    pub fn new(
        vault: Arc<dyn VaultLedger>,
        burner: Arc<dyn BurnSubmitter>,
        bridge_account: Recipient,
    ) -> Self {
        Self {
            vault,
            burner,
            bridge_account,
        }
    }
}

#[async_trait]
impl WithdrawBurnSubmitter for VaultWithdrawBurn {
    async fn withdraw_and_burn(
        &self,
        owner: Recipient,
        amount: UsdcAmount,
        destination_domain: DomainId,
        recipient: Recipient,
        cancel: &CancellationToken,
    ) -> Result<WithdrawBurnOutcome> {
        let span = spans::withdraw_burn(&owner, destination_domain, &amount);

        async move {
            let withdraw_tx_hash = self
                .vault
                .withdraw_to(owner, self.bridge_account, amount)
                .await
                .inspect_err(spans::record_error)?;

            info!(withdraw_tx_hash = %withdraw_tx_hash, event = "vault_withdrawn_for_bridge");

            match self
                .burner
                .burn(amount, destination_domain, recipient, cancel)
                .await
            {
                Ok(burn) => Ok(WithdrawBurnOutcome::Burned {
                    withdraw_tx_hash,
                    burn,
                }),
                Err(e) => {
                    spans::record_error(&e);
                    error!(
                        withdraw_tx_hash = %withdraw_tx_hash,
                        bridge_account = %self.bridge_account,
                        error = %e,
                        event = "bridge_back_burn_failed"
                    );
                    Ok(WithdrawBurnOutcome::WithdrawnOnly {
                        withdraw_tx_hash,
                        error: e,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn recover_burn(&self, burn_tx_hash: TxHash) -> Result<BurnReceipt> {
        self.burner.recover(burn_tx_hash).await
    }
}
