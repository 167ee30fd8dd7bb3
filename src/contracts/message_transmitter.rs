// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! MessageTransmitter bindings
//!
//! Emits `MessageSent` on the source chain and verifies attestations in
//! `receiveMessage` on the destination chain.

use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes, TxHash, B256};
use alloy_provider::Provider;
use alloy_rpc_types::{Log, TransactionRequest};
use alloy_sol_types::{sol, SolEvent};
use tracing::{debug, error, info};

use crate::error::{BridgeError, Result};
use crate::protocol::BridgeMessage;
use crate::spans;
use MessageTransmitter::{MessageSent, MessageTransmitterInstance};

/// The CCTP v1 Message Transmitter contract wrapper
pub struct MessageTransmitterContract<P: Provider<Ethereum>> {
    instance: MessageTransmitterInstance<P>,
}

impl<P: Provider<Ethereum>> MessageTransmitterContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "message_transmitter_contract_initialized"
        );
        Self {
            instance: MessageTransmitterInstance::new(address, provider),
        }
    }

    /// Builds the `receiveMessage(message, attestation)` transaction.
    pub fn receive_message_transaction(
        &self,
        message: Bytes,
        attestation: Bytes,
        from_address: Address,
    ) -> TransactionRequest {
        info!(
            message_len = message.len(),
            attestation_len = attestation.len(),
            from_address = %from_address,
            contract_address = %self.instance.address(),
            event = "receive_message_transaction_created"
        );

        self.instance
            .receiveMessage(message, attestation)
            .from(from_address)
            .into_transaction_request()
    }

    /// Checks the `usedNonces` replay mapping. Any non-zero value means the
    /// message was already received.
    pub async fn is_nonce_used(&self, nonce_key: B256) -> Result<bool> {
        let status = self.instance.usedNonces(nonce_key).call().await?;

        debug!(
            nonce_key = %nonce_key,
            nonce_status = %status,
            event = "used_nonce_checked"
        );

        Ok(!status.is_zero())
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }
}

/// Finds the `MessageSent` event in a burn receipt's logs and returns the
/// message it carries.
///
/// Only logs emitted by `transmitter` with the `MessageSent(bytes)` topic are
/// considered; a look-alike event from another contract is ignored.
pub fn extract_message_sent(tx_hash: TxHash, logs: &[Log], transmitter: Address) -> Result<BridgeMessage> {
    let log = logs
        .iter()
        .find(|log| {
            log.address() == transmitter
                && log
                    .topics()
                    .first()
                    .is_some_and(|topic| *topic == MessageSent::SIGNATURE_HASH)
        })
        .ok_or_else(|| {
            spans::record_error_with_context(
                "MessageSentEventNotFound",
                "MessageSent event not found in transaction logs",
                Some(&format!(
                    "Transaction contained {} logs but none came from {transmitter}",
                    logs.len()
                )),
            );
            error!(
                tx_hash = %tx_hash,
                available_logs = logs.len(),
                event = "message_sent_event_not_found"
            );
            BridgeError::MessageSentEventNotFound { tx_hash }
        })?;

    let decoded = MessageSent::abi_decode_data(&log.data().data)?;
    let message = BridgeMessage::new(decoded.0);

    info!(
        tx_hash = %tx_hash,
        message_hash = %message.hash(),
        message_length_bytes = message.payload().len(),
        event = "message_sent_event_extracted"
    );

    Ok(message)
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract MessageTransmitter {
        event MessageSent(bytes message);

        function receiveMessage(bytes message, bytes attestation) external returns (bool success);
        function usedNonces(bytes32 sourceAndNonce) external view returns (uint256);
        function localDomain() external view returns (uint32);
    }
);
