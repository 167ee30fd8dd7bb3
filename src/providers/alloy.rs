// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Alloy-based blockchain provider implementation.

use std::marker::PhantomData;

use alloy_network::Network;
use alloy_primitives::TxHash;
use alloy_provider::Provider;
use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::error::{BridgeError, Result};
use crate::traits::BlockchainProvider;

/// Adapts an alloy [`Provider`] to [`BlockchainProvider`].
///
/// One of these wraps each RPC endpoint in an
/// [`RpcPool`](super::RpcPool); contract wrappers reach the underlying
/// provider through [`AlloyProvider::inner`].
///
/// ```rust,no_run
/// use cctp_vault_bridge::providers::AlloyProvider;
/// use alloy_network::Ethereum;
/// use alloy_provider::ProviderBuilder;
///
/// let provider = ProviderBuilder::new().connect_http("https://mainnet.base.org".parse().unwrap());
/// let endpoint: AlloyProvider<Ethereum, _> = AlloyProvider::new(provider);
/// ```
#[derive(Debug, Clone)]
pub struct AlloyProvider<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    provider: P,
    _network: PhantomData<N>,
}

impl<N, P> AlloyProvider<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            _network: PhantomData,
        }
    }

    pub fn inner(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<N, P> BlockchainProvider<N> for AlloyProvider<N, P>
where
    N: Network,
    P: Provider<N> + Clone + Send + Sync,
{
    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<N::ReceiptResponse>> {
        trace!("Fetching transaction receipt");
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| BridgeError::Provider(e.to_string()))?;

        debug!(found = receipt.is_some(), event = "transaction_receipt_fetched");
        Ok(receipt)
    }

    #[instrument(skip(self))]
    async fn get_block_number(&self) -> Result<u64> {
        let block_number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| BridgeError::Provider(e.to_string()))?;

        trace!(block_number, event = "block_number_fetched");
        Ok(block_number)
    }
}
