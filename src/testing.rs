// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Test utilities and fake implementations of the trait seams
//!
//! These fakes let the orchestrator run end to end, adversarial scenarios
//! included, without a blockchain node or the attestation API: stalled
//! attestations, rate limiting, reverted or duplicate mints, lagging
//! balances and vaults that refuse relayer deposits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy_network::{Ethereum, Network};
use alloy_primitives::{Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, Result};
use crate::protocol::{Attestation, AttestationResponse, BridgeMessage, DomainId, Recipient, UsdcAmount};
use crate::traits::{
    AttestationProvider, BalanceReader, BlockchainProvider, BurnReceipt, BurnSubmitter, Clock,
    MintOutcome, MintSubmitter, VaultLedger, VaultPosition,
};

// ============================================================================
// Fake Blockchain Provider
// ============================================================================

/// A fake RPC endpoint with configurable latency and availability.
///
/// Clones share state, so a test can keep a handle to an endpoint after
/// moving it into an [`RpcPool`](crate::providers::RpcPool).
#[derive(Clone, Debug)]
pub struct FakeBlockchainProvider {
    receipts: Arc<Mutex<HashMap<TxHash, <Ethereum as Network>::ReceiptResponse>>>,
    latency: Duration,
    unreachable: bool,
    block_number: u64,
    block_number_calls: Arc<AtomicUsize>,
}

impl Default for FakeBlockchainProvider {
    fn default() -> Self {
        Self {
            receipts: Arc::default(),
            latency: Duration::ZERO,
            unreachable: false,
            block_number: 12345,
            block_number_calls: Arc::default(),
        }
    }
}

impl FakeBlockchainProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency` (uses tokio time, so pause-friendly)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every call with a provider error
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = block_number;
        self
    }

    pub fn add_receipt(&self, tx_hash: TxHash, receipt: <Ethereum as Network>::ReceiptResponse) {
        self.receipts.lock().unwrap().insert(tx_hash, receipt);
    }

    /// Number of `get_block_number` calls, counted as they arrive
    pub fn block_number_calls(&self) -> usize {
        self.block_number_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unreachable {
            return Err(BridgeError::Provider("Simulated RPC outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlockchainProvider<Ethereum> for FakeBlockchainProvider {
    async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<<Ethereum as Network>::ReceiptResponse>> {
        self.respond().await?;
        Ok(self.receipts.lock().unwrap().get(&tx_hash).cloned())
    }

    async fn get_block_number(&self) -> Result<u64> {
        self.block_number_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.block_number)
    }
}

// ============================================================================
// Fake Attestation Provider
// ============================================================================

#[derive(Clone, Debug)]
enum FakeReply {
    Respond(AttestationResponse),
    RateLimited(u64),
    Unreachable,
}

/// A fake attestation service replaying scripted replies per message hash.
///
/// The last reply repeats once the script runs out. Unknown hashes answer
/// like Iris does before indexing a burn: not found.
#[derive(Clone, Debug, Default)]
pub struct FakeAttestationProvider {
    replies: Arc<Mutex<HashMap<B256, Vec<FakeReply>>>>,
    calls: Arc<Mutex<HashMap<B256, usize>>>,
}

impl FakeAttestationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, message_hash: B256, replies: Vec<FakeReply>) {
        self.replies.lock().unwrap().insert(message_hash, replies);
    }

    /// Each call returns the next response in the sequence
    pub fn add_response_sequence(&self, message_hash: B256, responses: Vec<AttestationResponse>) {
        self.script(
            message_hash,
            responses.into_iter().map(FakeReply::Respond).collect(),
        );
    }

    pub fn add_complete_response(&self, message_hash: B256, attestation: impl Into<Bytes>) {
        self.add_response_sequence(message_hash, vec![AttestationResponse::complete(attestation)]);
    }

    pub fn add_failed_response(&self, message_hash: B256) {
        self.add_response_sequence(message_hash, vec![AttestationResponse::failed()]);
    }

    /// Never completes
    pub fn add_always_pending(&self, message_hash: B256) {
        self.add_response_sequence(message_hash, vec![AttestationResponse::pending()]);
    }

    /// `count` HTTP 429 replies carrying `retry_after_seconds`, then success
    pub fn add_rate_limit_then_success(
        &self,
        message_hash: B256,
        count: usize,
        retry_after_seconds: u64,
        attestation: impl Into<Bytes>,
    ) {
        let mut replies = vec![FakeReply::RateLimited(retry_after_seconds); count];
        replies.push(FakeReply::Respond(AttestationResponse::complete(attestation)));
        self.script(message_hash, replies);
    }

    /// `count` network failures, then success
    pub fn add_outage_then_success(
        &self,
        message_hash: B256,
        count: usize,
        attestation: impl Into<Bytes>,
    ) {
        let mut replies = vec![FakeReply::Unreachable; count];
        replies.push(FakeReply::Respond(AttestationResponse::complete(attestation)));
        self.script(message_hash, replies);
    }

    pub fn get_call_count(&self, message_hash: B256) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&message_hash)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl AttestationProvider for FakeAttestationProvider {
    async fn get_attestation(&self, message_hash: B256) -> Result<AttestationResponse> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(message_hash).or_insert(0);
            *count += 1;
            *count - 1
        };

        let reply = {
            let replies = self.replies.lock().unwrap();
            let Some(script) = replies.get(&message_hash) else {
                return Err(BridgeError::AttestationNotFound);
            };
            script.get(index).or(script.last()).cloned()
        };

        match reply {
            Some(FakeReply::Respond(response)) => Ok(response),
            Some(FakeReply::RateLimited(retry_after_seconds)) => {
                Err(BridgeError::RateLimitExceeded {
                    retry_after_seconds,
                })
            }
            Some(FakeReply::Unreachable) => {
                Err(BridgeError::Provider("Simulated attestation outage".to_string()))
            }
            None => Err(BridgeError::AttestationNotFound),
        }
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A fake clock that records sleeps and returns immediately.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current_time: Arc<Mutex<Instant>>,
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
            sleep_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock().unwrap();
        *time += duration;
    }

    pub fn total_sleep_time(&self) -> Duration {
        self.sleep_log.lock().unwrap().iter().sum()
    }

    pub fn sleep_count(&self) -> usize {
        self.sleep_log.lock().unwrap().len()
    }

    pub fn clear_sleep_log(&self) {
        self.sleep_log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleep_log.lock().unwrap().push(duration);
        self.advance(duration);
        // let cancellation and sibling tasks observe each poll
        tokio::task::yield_now().await;
    }

    fn now(&self) -> Instant {
        *self.current_time.lock().unwrap()
    }
}

// ============================================================================
// Fake Burn Submitter
// ============================================================================

#[derive(Clone, Debug)]
enum BurnBehavior {
    Burn(BurnReceipt),
    Revert(String),
    /// Broadcast, but the receipt never showed up in time
    Unconfirmed(BurnReceipt),
}

/// A fake source ledger that burns, reverts, or loses track of the receipt.
///
/// A cancelled token reaching [`BurnSubmitter::burn`] stops the burn the way
/// a cancellation between approve and `depositForBurn` does.
#[derive(Clone, Debug)]
pub struct FakeBurnSubmitter {
    behavior: BurnBehavior,
    requests: Arc<Mutex<Vec<(UsdcAmount, DomainId, Recipient)>>>,
    recoveries: Arc<AtomicUsize>,
}

impl FakeBurnSubmitter {
    fn with_behavior(behavior: BurnBehavior) -> Self {
        Self {
            behavior,
            requests: Arc::default(),
            recoveries: Arc::default(),
        }
    }

    /// Every burn confirms with `burn_tx_hash` and emits `message_payload`
    pub fn succeeding(burn_tx_hash: TxHash, message_payload: impl Into<Bytes>) -> Self {
        Self::with_behavior(BurnBehavior::Burn(BurnReceipt {
            burn_tx_hash,
            message: BridgeMessage::new(message_payload),
        }))
    }

    pub fn reverting(reason: &str) -> Self {
        Self::with_behavior(BurnBehavior::Revert(reason.to_string()))
    }

    /// Every burn is broadcast as `burn_tx_hash` but its receipt is not seen
    /// in time; [`BurnSubmitter::recover`] later finds it.
    pub fn unconfirmed(burn_tx_hash: TxHash, message_payload: impl Into<Bytes>) -> Self {
        Self::with_behavior(BurnBehavior::Unconfirmed(BurnReceipt {
            burn_tx_hash,
            message: BridgeMessage::new(message_payload),
        }))
    }

    /// Message the burn emits; `None` for a reverting fake
    pub fn message(&self) -> Option<BridgeMessage> {
        match &self.behavior {
            BurnBehavior::Burn(receipt) | BurnBehavior::Unconfirmed(receipt) => {
                Some(receipt.message.clone())
            }
            BurnBehavior::Revert(_) => None,
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recover_count(&self) -> usize {
        self.recoveries.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(UsdcAmount, DomainId, Recipient)> {
        self.requests.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl BurnSubmitter for FakeBurnSubmitter {
    async fn burn(
        &self,
        amount: UsdcAmount,
        destination_domain: DomainId,
        recipient: Recipient,
        cancel: &CancellationToken,
    ) -> Result<BurnReceipt> {
        self.requests
            .lock()
            .unwrap()
            .push((amount, destination_domain, recipient));

        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        match &self.behavior {
            BurnBehavior::Burn(receipt) => Ok(receipt.clone()),
            BurnBehavior::Revert(reason) => Err(BridgeError::TransactionReverted {
                tx_hash: TxHash::ZERO,
                reason: reason.clone(),
            }),
            BurnBehavior::Unconfirmed(receipt) => Err(BridgeError::BurnUnconfirmed {
                tx_hash: receipt.burn_tx_hash,
                reason: format!("no receipt for {} after 60 attempts", receipt.burn_tx_hash),
            }),
        }
    }

    async fn recover(&self, burn_tx_hash: TxHash) -> Result<BurnReceipt> {
        self.recoveries.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            BurnBehavior::Burn(receipt) | BurnBehavior::Unconfirmed(receipt)
                if receipt.burn_tx_hash == burn_tx_hash =>
            {
                Ok(receipt.clone())
            }
            _ => Err(BridgeError::TransactionFailed {
                reason: format!("no receipt for {burn_tx_hash}"),
            }),
        }
    }
}

// ============================================================================
// Fake Mint Submitter
// ============================================================================

#[derive(Clone, Debug)]
enum MintBehavior {
    Mint(TxHash),
    ReportProcessed,
    Revert(String),
}

/// A fake destination ledger for `receiveMessage`.
#[derive(Clone, Debug)]
pub struct FakeMintSubmitter {
    behavior: MintBehavior,
    received: Arc<Mutex<Vec<(B256, Attestation)>>>,
}

impl FakeMintSubmitter {
    fn with_behavior(behavior: MintBehavior) -> Self {
        Self {
            behavior,
            received: Arc::default(),
        }
    }

    pub fn minting(tx_hash: TxHash) -> Self {
        Self::with_behavior(MintBehavior::Mint(tx_hash))
    }

    /// Reverts like a transmitter that already saw the nonce
    pub fn already_processed() -> Self {
        Self::with_behavior(MintBehavior::Revert(
            "execution reverted: Nonce already used".to_string(),
        ))
    }

    /// Detects the duplicate up front and reports [`MintOutcome::AlreadyProcessed`]
    pub fn already_minted() -> Self {
        Self::with_behavior(MintBehavior::ReportProcessed)
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::with_behavior(MintBehavior::Revert(reason.to_string()))
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// `(message_hash, attestation)` of the last call
    pub fn last_received(&self) -> Option<(B256, Attestation)> {
        self.received.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MintSubmitter for FakeMintSubmitter {
    async fn mint(&self, message: &BridgeMessage, attestation: &Attestation) -> Result<MintOutcome> {
        self.received
            .lock()
            .unwrap()
            .push((message.hash(), attestation.clone()));

        match &self.behavior {
            MintBehavior::Mint(tx_hash) => Ok(MintOutcome::Minted { tx_hash: *tx_hash }),
            MintBehavior::ReportProcessed => Ok(MintOutcome::AlreadyProcessed),
            MintBehavior::Revert(reason) => Err(BridgeError::TransactionReverted {
                tx_hash: TxHash::ZERO,
                reason: reason.clone(),
            }),
        }
    }
}

// ============================================================================
// Fake Balance Reader
// ============================================================================

/// A fake token balance: a scripted sequence whose last value repeats,
/// optionally preceded by failed reads.
#[derive(Clone, Debug)]
pub struct FakeBalanceReader {
    balances: Vec<U256>,
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl FakeBalanceReader {
    pub fn sequence(balances: impl IntoIterator<Item = u64>) -> Self {
        Self {
            balances: balances.into_iter().map(U256::from).collect(),
            failures: 0,
            calls: Arc::default(),
        }
    }

    pub fn fixed(balance: u64) -> Self {
        Self::sequence([balance])
    }

    /// `failures` failed reads, then `balance`
    pub fn flaky(failures: usize, balance: u64) -> Self {
        Self {
            failures,
            ..Self::fixed(balance)
        }
    }

    /// Every read fails
    pub fn unreachable() -> Self {
        Self::sequence(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceReader for FakeBalanceReader {
    async fn balance_of(&self, _owner: Recipient) -> Result<U256> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if call < self.failures {
            return Err(BridgeError::Provider("Simulated RPC error".to_string()));
        }

        let index = call - self.failures;
        self.balances
            .get(index)
            .or(self.balances.last())
            .copied()
            .ok_or_else(|| BridgeError::Provider("Simulated RPC outage".to_string()))
    }
}

// ============================================================================
// Fake Vault Ledger
// ============================================================================

#[derive(Debug, Default)]
struct VaultBook {
    deposits: Vec<(Recipient, UsdcAmount)>,
    withdrawals: Vec<(Recipient, Recipient, UsdcAmount)>,
    next_tx: u8,
}

impl VaultBook {
    fn next_tx_hash(&mut self) -> TxHash {
        self.next_tx = self.next_tx.wrapping_add(1);
        TxHash::with_last_byte(self.next_tx)
    }
}

/// An in-memory vault tracking principal per user.
#[derive(Clone, Debug)]
pub struct FakeVaultLedger {
    book: Arc<Mutex<VaultBook>>,
    deposit_on_behalf: bool,
    fail_deposits: bool,
    fail_withdrawals: bool,
}

impl Default for FakeVaultLedger {
    fn default() -> Self {
        Self {
            book: Arc::default(),
            deposit_on_behalf: true,
            fail_deposits: false,
            fail_withdrawals: false,
        }
    }
}

impl FakeVaultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_deposit_on_behalf(mut self) -> Self {
        self.deposit_on_behalf = false;
        self
    }

    pub fn failing_deposits(mut self) -> Self {
        self.fail_deposits = true;
        self
    }

    pub fn failing_withdrawals(mut self) -> Self {
        self.fail_withdrawals = true;
        self
    }

    pub fn deposit_count(&self) -> usize {
        self.book.lock().unwrap().deposits.len()
    }

    pub fn withdrawal_count(&self) -> usize {
        self.book.lock().unwrap().withdrawals.len()
    }
}

#[async_trait]
impl VaultLedger for FakeVaultLedger {
    fn supports_deposit_on_behalf(&self) -> bool {
        self.deposit_on_behalf
    }

    async fn deposit_for(&self, user: Recipient, amount: UsdcAmount) -> Result<TxHash> {
        if self.fail_deposits {
            return Err(BridgeError::Vault("Simulated vault outage".to_string()));
        }
        let mut book = self.book.lock().unwrap();
        book.deposits.push((user, amount));
        Ok(book.next_tx_hash())
    }

    async fn withdraw_to(
        &self,
        owner: Recipient,
        recipient: Recipient,
        amount: UsdcAmount,
    ) -> Result<TxHash> {
        if self.fail_withdrawals {
            return Err(BridgeError::Vault("insufficient position".to_string()));
        }
        let mut book = self.book.lock().unwrap();
        book.withdrawals.push((owner, recipient, amount));
        Ok(book.next_tx_hash())
    }

    async fn position(&self, user: Recipient) -> Result<VaultPosition> {
        let book = self.book.lock().unwrap();
        let deposited = book
            .deposits
            .iter()
            .filter(|(owner, _)| *owner == user)
            .fold(U256::ZERO, |acc, (_, amount)| acc + amount.base_units());
        let withdrawn = book
            .withdrawals
            .iter()
            .filter(|(owner, _, _)| *owner == user)
            .fold(U256::ZERO, |acc, (_, _, amount)| acc + amount.base_units());

        Ok(VaultPosition {
            principal: deposited.saturating_sub(withdrawn).into(),
            accrued_yield: UsdcAmount::ZERO,
        })
    }
}
