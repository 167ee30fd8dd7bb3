// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Shared submission path for EVM chains: simulate, send once, wait for
//! the receipt, reject reverts.

use std::sync::Arc;

use alloy_network::{Ethereum, ReceiptResponse};
use alloy_primitives::TxHash;
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use tracing::{debug, info};

use super::{AlloyProvider, RpcPool};
use crate::config::PollingConfig;
use crate::error::{BridgeError, Result};

/// RPC pool of alloy-backed endpoints for one EVM chain.
pub type EvmPool<P> = Arc<RpcPool<AlloyProvider<Ethereum, P>>>;

/// Dry-runs `request` with `eth_call` so a revert surfaces before any gas is spent.
pub(crate) async fn simulate<P>(
    pool: &RpcPool<AlloyProvider<Ethereum, P>>,
    operation: &'static str,
    request: &TransactionRequest,
) -> Result<()>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    pool.read(operation, |client| {
        let request = request.clone();
        async move {
            client.inner().call(request).await?;
            Ok(())
        }
    })
    .await
}

/// Sends `request` exactly once and waits for a successful receipt.
pub(crate) async fn send_and_confirm<P>(
    pool: &RpcPool<AlloyProvider<Ethereum, P>>,
    operation: &'static str,
    request: TransactionRequest,
    polling: PollingConfig,
) -> Result<TransactionReceipt>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    let tx_hash = broadcast(pool, operation, request).await?;
    confirm(pool, operation, tx_hash, polling).await
}

/// Sends `request` exactly once. From here on the transaction may land
/// whatever happens to the caller, so the hash is the only handle on it.
pub(crate) async fn broadcast<P>(
    pool: &RpcPool<AlloyProvider<Ethereum, P>>,
    operation: &'static str,
    request: TransactionRequest,
) -> Result<TxHash>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    let tx_hash = pool
        .submit(operation, |client| async move {
            let pending = client.inner().send_transaction(request).await?;
            Ok(*pending.tx_hash())
        })
        .await?;

    info!(operation, tx_hash = %tx_hash, event = "transaction_submitted");
    Ok(tx_hash)
}

/// Waits for the receipt of an already broadcast transaction and rejects reverts.
pub(crate) async fn confirm<P>(
    pool: &RpcPool<AlloyProvider<Ethereum, P>>,
    operation: &'static str,
    tx_hash: TxHash,
    polling: PollingConfig,
) -> Result<TransactionReceipt>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    let receipt = pool.wait_for_receipt(tx_hash, polling).await?;
    ensure_success(&receipt)?;

    debug!(
        operation,
        tx_hash = %tx_hash,
        block_number = ?receipt.block_number,
        event = "transaction_confirmed"
    );

    Ok(receipt)
}

pub(crate) fn ensure_success(receipt: &TransactionReceipt) -> Result<()> {
    if ReceiptResponse::status(receipt) {
        Ok(())
    } else {
        Err(BridgeError::TransactionReverted {
            tx_hash: receipt.transaction_hash,
            reason: "receipt status 0".to_string(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{mocked_pool, mocked_receipt, quick_receipts};
    use super::*;
    use alloy_transport::mock::Asserter;

    const TX: TxHash = TxHash::repeat_byte(0x77);

    #[tokio::test]
    async fn test_status_zero_receipt_is_a_revert() {
        let asserter = Asserter::new();
        asserter.push_success(&TX);
        asserter.push_success(&mocked_receipt(TX, false, &[]));

        let err = send_and_confirm(
            &mocked_pool(asserter),
            "approve",
            TransactionRequest::default(),
            quick_receipts(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::TransactionReverted { tx_hash, .. } if tx_hash == TX
        ));
    }

    #[tokio::test]
    async fn test_successful_receipt_is_returned() {
        let asserter = Asserter::new();
        asserter.push_success(&TX);
        asserter.push_success(&mocked_receipt(TX, true, &[]));

        let receipt = send_and_confirm(
            &mocked_pool(asserter),
            "approve",
            TransactionRequest::default(),
            quick_receipts(),
        )
        .await
        .unwrap();

        assert_eq!(receipt.transaction_hash, TX);
        assert!(ReceiptResponse::status(&receipt));
    }

    #[tokio::test]
    async fn test_simulate_surfaces_node_revert() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("execution reverted: Invalid attestation length");

        let err = simulate(&mocked_pool(asserter), "receiveMessage", &TransactionRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Rpc(_)));
        assert!(!err.is_transient());
    }
}
