// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use alloy_network::Ethereum;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use async_trait::async_trait;

use super::evm::EvmPool;
use crate::contracts::erc20::Erc20Contract;
use crate::error::Result;
use crate::protocol::Recipient;
use crate::traits::BalanceReader;

/// USDC `balanceOf` on one EVM chain, read through the chain's RPC pool.
#[derive(Debug, Clone)]
pub struct EvmBalanceReader<P>
where
    P: Provider<Ethereum> + Clone,
{
    usdc: Address,
    pool: EvmPool<P>,
}

impl<P> EvmBalanceReader<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    pub fn new(usdc: Address, pool: EvmPool<P>) -> Self {
        Self { usdc, pool }
    }
}

#[async_trait]
impl<P> BalanceReader for EvmBalanceReader<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    async fn balance_of(&self, owner: Recipient) -> Result<U256> {
        let (usdc, owner) = (self.usdc, owner.evm_address()?);

        self.pool
            .read("balanceOf", |client| async move {
                Ok(Erc20Contract::new(usdc, client.inner().clone())
                    .balance_of(owner)
                    .await?)
            })
            .await
    }
}
