// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Trait seams between the orchestrator and the outside world.
//!
//! Every on-chain and off-chain collaborator sits behind one of these traits
//! so the state machine can be driven end to end with the fakes in
//! [`crate::testing`]. Production implementations live in [`crate::providers`].

use std::time::{Duration, Instant};

use alloy_network::Network;
use alloy_primitives::{TxHash, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, Result};
use crate::protocol::{Attestation, AttestationResponse, BridgeMessage, DomainId, Recipient, UsdcAmount};

/// Blockchain RPC reads needed outside of contract calls.
///
/// Generic over `N: Network` so non-Ethereum EVM networks can plug in their
/// own receipt types.
#[async_trait]
pub trait BlockchainProvider<N: Network>: Send + Sync {
    /// Returns `None` if the transaction is not found or not yet mined.
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<N::ReceiptResponse>>;

    async fn get_block_number(&self) -> Result<u64>;
}

/// Lookup of attestations by message hash.
///
/// Called repeatedly until the status becomes `Complete` or `Failed`.
/// Implementations report HTTP 429 as [`BridgeError::RateLimitExceeded`] and
/// 404 as [`BridgeError::AttestationNotFound`].
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    async fn get_attestation(&self, message_hash: B256) -> Result<AttestationResponse>;
}

/// Time source for polling loops, replaceable with a fake that never waits.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> Instant;
}

/// Result of a confirmed burn on the source ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnReceipt {
    pub burn_tx_hash: TxHash,
    pub message: BridgeMessage,
}

impl BurnReceipt {
    pub fn message_hash(&self) -> B256 {
        self.message.hash()
    }
}

/// Approve-then-burn on one source chain, signed by a signer bound to that chain.
///
/// Both calls change on-chain state: implementations never retry a submission.
#[async_trait]
pub trait BurnSubmitter: Send + Sync {
    /// Approves if needed, then burns. `cancel` is checked once more after
    /// the approval; once the burn is broadcast it is ignored.
    ///
    /// A burn that was broadcast but could not be confirmed fails with
    /// [`BridgeError::BurnUnconfirmed`] carrying its hash.
    async fn burn(
        &self,
        amount: UsdcAmount,
        destination_domain: DomainId,
        recipient: Recipient,
        cancel: &CancellationToken,
    ) -> Result<BurnReceipt>;

    /// Rebuilds the receipt of an already broadcast burn from its hash.
    /// Submits nothing.
    async fn recover(&self, burn_tx_hash: TxHash) -> Result<BurnReceipt>;
}

/// Outcome of the vault withdrawal that opens a bridge-back.
#[derive(Debug)]
pub enum WithdrawBurnOutcome {
    /// Funds left the vault and were burned toward the destination.
    Burned {
        withdraw_tx_hash: TxHash,
        burn: BurnReceipt,
    },
    /// The withdrawal landed but the burn did not; funds sit with the bridging account.
    WithdrawnOnly {
        withdraw_tx_hash: TxHash,
        error: BridgeError,
    },
}

/// First step of a withdrawal with bridge-back: vault withdrawal, then burn.
///
/// An `Err` means nothing happened on-chain.
#[async_trait]
pub trait WithdrawBurnSubmitter: Send + Sync {
    async fn withdraw_and_burn(
        &self,
        owner: Recipient,
        amount: UsdcAmount,
        destination_domain: DomainId,
        recipient: Recipient,
        cancel: &CancellationToken,
    ) -> Result<WithdrawBurnOutcome>;

    /// See [`BurnSubmitter::recover`].
    async fn recover_burn(&self, burn_tx_hash: TxHash) -> Result<BurnReceipt>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintOutcome {
    Minted { tx_hash: TxHash },
    /// The destination had already received this message.
    AlreadyProcessed,
}

/// Submits `receiveMessage` on the destination ledger.
#[async_trait]
pub trait MintSubmitter: Send + Sync {
    async fn mint(&self, message: &BridgeMessage, attestation: &Attestation)
        -> Result<MintOutcome>;
}

/// USDC balance query on one ledger.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn balance_of(&self, owner: Recipient) -> Result<U256>;
}

/// One user's holdings in the vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPosition {
    pub principal: UsdcAmount,
    pub accrued_yield: UsdcAmount,
}

impl VaultPosition {
    pub fn total(&self) -> UsdcAmount {
        UsdcAmount::from_base_units(
            self.principal
                .base_units()
                .saturating_add(self.accrued_yield.base_units()),
        )
    }
}

/// The vault's relayer-facing entry points.
#[async_trait]
pub trait VaultLedger: Send + Sync {
    /// Whether a relayer may deposit with a user as beneficiary.
    fn supports_deposit_on_behalf(&self) -> bool;

    async fn deposit_for(&self, user: Recipient, amount: UsdcAmount) -> Result<TxHash>;

    /// Deducts from `owner`'s tracked balance and sends the funds to `recipient`.
    async fn withdraw_to(
        &self,
        owner: Recipient,
        recipient: Recipient,
        amount: UsdcAmount,
    ) -> Result<TxHash>;

    async fn position(&self, user: Recipient) -> Result<VaultPosition>;
}
