// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! USDC vault bindings
//!
//! Relayer entry points of the yield vault plus the `Deposited` / `Withdrawn`
//! events it logs for every balance change.

use alloy_network::Ethereum;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::sol;
use tracing::{debug, info};

use UsdcVault::UsdcVaultInstance;

pub use UsdcVault::{Deposited, Withdrawn};

pub struct VaultContract<P: Provider<Ethereum>> {
    instance: UsdcVaultInstance<P>,
}

impl<P: Provider<Ethereum>> VaultContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "vault_contract_initialized"
        );
        Self {
            instance: UsdcVaultInstance::new(address, provider),
        }
    }

    /// Relayer-signed deposit crediting `user`.
    pub fn deposit_for_transaction(
        &self,
        relayer: Address,
        user: Address,
        amount: U256,
    ) -> TransactionRequest {
        info!(
            relayer = %relayer,
            user = %user,
            amount = %amount,
            contract_address = %self.instance.address(),
            event = "vault_deposit_for_transaction_created"
        );

        self.instance
            .depositFor(user, amount)
            .from(relayer)
            .into_transaction_request()
    }

    pub fn withdraw_to_transaction(
        &self,
        relayer: Address,
        owner: Address,
        recipient: Address,
        amount: U256,
    ) -> TransactionRequest {
        info!(
            relayer = %relayer,
            owner = %owner,
            recipient = %recipient,
            amount = %amount,
            contract_address = %self.instance.address(),
            event = "vault_withdraw_to_transaction_created"
        );

        self.instance
            .withdrawTo(owner, recipient, amount)
            .from(relayer)
            .into_transaction_request()
    }

    /// Returns `(principal, accrued_yield)` for `user`.
    pub async fn position_of(&self, user: Address) -> Result<(U256, U256), alloy_contract::Error> {
        let position = self.instance.positionOf(user).call().await?;

        debug!(
            user = %user,
            principal = %position.principal,
            accrued_yield = %position.accruedYield,
            event = "vault_position_retrieved"
        );

        Ok((position.principal, position.accruedYield))
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract UsdcVault {
        event Deposited(uint256 indexed vaultId, address indexed user, uint256 amount);
        event Withdrawn(
            uint256 indexed vaultId,
            address indexed user,
            address recipient,
            uint256 amount
        );

        function depositFor(address user, uint256 amount) external;
        function withdrawTo(address owner, address recipient, uint256 amount) external;
        function positionOf(address user)
            external
            view
            returns (uint256 principal, uint256 accruedYield);
    }
);
