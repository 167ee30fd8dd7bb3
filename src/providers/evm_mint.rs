// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! `receiveMessage` on an EVM destination chain.

use alloy_network::Ethereum;
use alloy_primitives::Address;
use alloy_provider::Provider;
use async_trait::async_trait;
use tracing::{info, warn, Instrument};

use super::evm::{send_and_confirm, simulate, EvmPool};
use crate::chain::ChainConfig;
use crate::config::PollingConfig;
use crate::contracts::message_transmitter::MessageTransmitterContract;
use crate::error::Result;
use crate::protocol::{Attestation, BridgeMessage};
use crate::spans;
use crate::traits::{MintOutcome, MintSubmitter};

/// [`MintSubmitter`] for one EVM chain.
///
/// Reads the transmitter's `usedNonces` mapping first, so a message some
/// other relayer already delivered resolves to
/// [`MintOutcome::AlreadyProcessed`] without sending anything.
#[derive(Debug, Clone)]
pub struct EvmMintSubmitter<P>
where
    P: Provider<Ethereum> + Clone,
{
    chain: ChainConfig,
    signer: Address,
    pool: EvmPool<P>,
    receipt_polling: PollingConfig,
}

impl<P> EvmMintSubmitter<P>
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

    async fn already_received(&self, message: &BridgeMessage) -> Result<bool> {
        // The revert path still catches duplicates when the header can't be read
        let header = match message.header() {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, event = "used_nonce_check_skipped");
                return Ok(false);
            }
        };

        let (transmitter, nonce_key) = (self.chain.message_transmitter, header.used_nonce_key());
        self.pool
            .read("usedNonces", |client| async move {
                MessageTransmitterContract::new(transmitter, client.inner().clone())
                    .is_nonce_used(nonce_key)
                    .await
            })
            .await
    }

    async fn receive(&self, message: &BridgeMessage, attestation: &Attestation) -> Result<MintOutcome> {
        if self.already_received(message).await? {
            info!(message_hash = %message.hash(), event = "mint_already_processed");
            return Ok(MintOutcome::AlreadyProcessed);
        }

        let client = self.pool.primary()?;
        let request = MessageTransmitterContract::new(self.chain.message_transmitter, client.inner().clone())
            .receive_message_transaction(
                message.payload().clone(),
                attestation.signature.clone(),
                self.signer,
            );

        simulate(&self.pool, "receiveMessage", &request).await?;
        let receipt =
            send_and_confirm(&self.pool, "receiveMessage", request, self.receipt_polling).await?;

        info!(
            mint_tx_hash = %receipt.transaction_hash,
            message_hash = %message.hash(),
            event = "mint_confirmed"
        );

        Ok(MintOutcome::Minted {
            tx_hash: receipt.transaction_hash,
        })
    }
}

#[async_trait]
impl<P> MintSubmitter for EvmMintSubmitter<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    async fn mint(&self, message: &BridgeMessage, attestation: &Attestation) -> Result<MintOutcome> {
        let span = spans::mint(
            &message.hash(),
            self.chain.cctp_domain,
            attestation.signature.len(),
        );

        async move {
            self.receive(message, attestation)
                .await
                .inspect_err(spans::record_error)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainRegistry;
    use crate::error::{BridgeError, ErrorClass};
    use crate::protocol::{DomainId, MessageHeader};
    use crate::providers::evm::mock::{mocked_pool, mocked_receipt, quick_receipts, uint_word};
    use alloy_primitives::{Bytes, TxHash, B256, U256};
    use alloy_provider::RootProvider;
    use alloy_transport::mock::Asserter;

    const MINT_TX: TxHash = TxHash::repeat_byte(0x02);

    fn minter(asserter: &Asserter) -> EvmMintSubmitter<RootProvider> {
        let base = ChainRegistry::mainnet().lookup(8453).unwrap().clone();
        EvmMintSubmitter::new(base, Address::repeat_byte(0x22), mocked_pool(asserter.clone()))
            .with_receipt_polling(quick_receipts())
    }

    fn message() -> BridgeMessage {
        let header = MessageHeader {
            version: MessageHeader::VERSION,
            source_domain: DomainId::Sui,
            destination_domain: DomainId::Base,
            nonce: 7,
            sender: B256::repeat_byte(0x01),
            recipient: B256::repeat_byte(0x02),
            destination_caller: B256::ZERO,
        };
        BridgeMessage::new(header.encode())
    }

    fn attestation(message: &BridgeMessage) -> Attestation {
        Attestation::new(message.hash(), Bytes::from(vec![0xaa; 65]))
    }

    #[tokio::test]
    async fn test_used_nonce_short_circuits_to_already_processed() {
        let asserter = Asserter::new();
        asserter.push_success(&uint_word(U256::from(1u64))); // usedNonces

        let message = message();
        let outcome = minter(&asserter)
            .mint(&message, &attestation(&message))
            .await
            .unwrap();

        assert_eq!(outcome, MintOutcome::AlreadyProcessed);
    }

    #[tokio::test]
    async fn test_unused_nonce_is_minted() {
        let asserter = Asserter::new();
        asserter.push_success(&uint_word(U256::ZERO));
        asserter.push_success(&Bytes::new()); // receiveMessage eth_call
        asserter.push_success(&MINT_TX);
        asserter.push_success(&mocked_receipt(MINT_TX, true, &[]));

        let message = message();
        let outcome = minter(&asserter)
            .mint(&message, &attestation(&message))
            .await
            .unwrap();

        assert_eq!(outcome, MintOutcome::Minted { tx_hash: MINT_TX });
    }

    #[tokio::test]
    async fn test_replayed_nonce_revert_is_idempotent() {
        let asserter = Asserter::new();
        asserter.push_success(&uint_word(U256::ZERO));
        asserter.push_failure_msg("execution reverted: Nonce already used");

        let message = message();
        let err = minter(&asserter)
            .mint(&message, &attestation(&message))
            .await
            .unwrap_err();

        assert!(err.is_already_processed());
        assert_eq!(err.class(), ErrorClass::IdempotentSuccess);
    }

    #[tokio::test]
    async fn test_reverted_mint_receipt_is_fatal() {
        let asserter = Asserter::new();
        asserter.push_success(&uint_word(U256::ZERO));
        asserter.push_success(&Bytes::new());
        asserter.push_success(&MINT_TX);
        asserter.push_success(&mocked_receipt(MINT_TX, false, &[]));

        let message = message();
        let err = minter(&asserter)
            .mint(&message, &attestation(&message))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::TransactionReverted { .. }));
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[tokio::test]
    async fn test_unreadable_header_falls_back_to_submission() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("execution reverted: Invalid message length");

        let message = BridgeMessage::new(vec![0x01, 0x02]);
        let err = minter(&asserter)
            .mint(&message, &attestation(&message))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid message length"));
    }
}
