// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use alloy_primitives::TxHash;
use thiserror::Error;

use crate::protocol::DomainId;

/// Revert fragments that destination message transmitters emit when a message
/// has already been received.
const ALREADY_PROCESSED_MARKERS: [&str; 4] = [
    "nonce already used",
    "already received",
    "already processed",
    "message already",
];

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Chain not supported: {chain}")]
    ChainNotSupported { chain: String },

    #[error("No {capability} configured for domain {domain}")]
    CapabilityMissing {
        capability: &'static str,
        domain: DomainId,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("RPC call {operation} timed out after {timeout_secs} seconds")]
    RpcTimeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    #[error("All RPC endpoints failed for {operation}: {last_error}")]
    EndpointsExhausted {
        operation: &'static str,
        last_error: String,
    },

    #[error("Contract call failed: {0}")]
    ContractCall(String),

    #[error("Transaction {tx_hash} reverted: {reason}")]
    TransactionReverted { tx_hash: TxHash, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Burn {tx_hash} was broadcast but not confirmed: {reason}")]
    BurnUnconfirmed { tx_hash: TxHash, reason: String },

    #[error("MessageSent event not found in receipt of {tx_hash}")]
    MessageSentEventNotFound { tx_hash: TxHash },

    #[error("Message hash mismatch: expected {expected}, computed {computed}")]
    MessageHashMismatch {
        expected: alloy_primitives::B256,
        computed: alloy_primitives::B256,
    },

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Attestation failed: {reason}")]
    AttestationFailed { reason: String },

    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Attestation not found (will retry)")]
    AttestationNotFound,

    #[error("Timeout waiting for attestation after {attempts} attempts")]
    AttestationTimeout { attempts: u32 },

    #[error("Attestation wait interrupted by shutdown; resume with the same message hash")]
    AttestationInterrupted,

    #[error("Message already received on the destination ledger")]
    MessageAlreadyReceived,

    #[error("Minted funds not yet visible: observed {observed}, expected at least {expected}")]
    BalanceNotConfirmed {
        observed: alloy_primitives::U256,
        expected: alloy_primitives::U256,
    },

    #[error("Vault does not support relayer deposits on behalf of a user")]
    DepositOnBehalfUnsupported,

    #[error("Vault operation failed: {0}")]
    Vault(String),

    #[error("Transfer cancelled before the burn was submitted")]
    Cancelled,

    #[error("Transfer task ended abnormally: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy_json_rpc::RpcError<alloy_transport::TransportErrorKind>),

    #[error("Contract error: {0}")]
    Contract(#[from] alloy_contract::Error),

    #[error("Pending transaction error: {0}")]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex conversion error: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),

    #[error("Unit conversion error: {0}")]
    Units(#[from] alloy_primitives::utils::UnitsError),
}

/// How a caller should react to a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Stop the transfer and surface the error; retrying would duplicate on-chain intent.
    Fatal,
    /// The destination already holds the result of this operation.
    IdempotentSuccess,
    /// Nothing on-chain needs resubmitting; the same message hash can be polled again.
    RecoverableByResume,
    /// Funds are safe on the destination, a manual follow-up finishes the job.
    RecoverableByManualAction,
    /// Connectivity problem, retried inside the component that hit it.
    Transient,
}

impl BridgeError {
    /// Places this error in the orchestrator's failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        use BridgeError::*;

        if self.is_already_processed() {
            return ErrorClass::IdempotentSuccess;
        }

        match self {
            // a JSON-RPC error response is the node answering, usually a revert
            Rpc(err) if err.is_error_resp() => ErrorClass::Fatal,
            Contract(alloy_contract::Error::TransportError(err)) if !err.is_error_resp() => {
                ErrorClass::Transient
            }
            Network(_)
            | Provider(_)
            | RpcTimeout { .. }
            | Rpc(_)
            | RateLimitExceeded { .. }
            | AttestationNotFound => ErrorClass::Transient,
            AttestationTimeout { .. } | AttestationInterrupted | BurnUnconfirmed { .. } => {
                ErrorClass::RecoverableByResume
            }
            BalanceNotConfirmed { .. } | DepositOnBehalfUnsupported | Vault(_) => {
                ErrorClass::RecoverableByManualAction
            }
            _ => ErrorClass::Fatal,
        }
    }

    /// Returns true when the destination rejected a mint because the message
    /// was already received, which means the mint happened earlier.
    pub fn is_already_processed(&self) -> bool {
        let reason = match self {
            BridgeError::MessageAlreadyReceived => return true,
            BridgeError::TransactionReverted { reason, .. } => reason.to_ascii_lowercase(),
            BridgeError::ContractCall(reason) => reason.to_ascii_lowercase(),
            BridgeError::Contract(err) => err.to_string().to_ascii_lowercase(),
            BridgeError::Rpc(err) => err.to_string().to_ascii_lowercase(),
            _ => return false,
        };

        ALREADY_PROCESSED_MARKERS
            .iter()
            .any(|marker| reason.contains(marker))
    }

    /// The burn transaction an error refers to, when the burn was already
    /// broadcast and may have landed.
    pub fn unconfirmed_burn(&self) -> Option<TxHash> {
        match self {
            BridgeError::BurnUnconfirmed { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Returns true for errors worth retrying against the same or another endpoint.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
