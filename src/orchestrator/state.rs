// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Transfer requests and the observable state of a running transfer.

use std::fmt;

use alloy_primitives::{TxHash, B256};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::protocol::{Attestation, BridgeMessage, Recipient, UsdcAmount};
use crate::traits::BurnReceipt;

/// Which way the funds move relative to the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// EVM chain → vault ledger → vault position
    Deposit,
    /// Vault position → vault ledger burn → EVM chain
    WithdrawAndBridge,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::WithdrawAndBridge => "withdraw_and_bridge",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-initiated transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub direction: Direction,
    /// Chain id of the EVM chain on the far side of the vault: the source of a
    /// deposit, the destination of a withdrawal.
    pub chain_id: u64,
    /// Who receives the mint on the destination ledger
    pub recipient: Recipient,
    pub amount: UsdcAmount,
    /// Vault account the transfer is for
    pub user: Recipient,
}

impl TransferRequest {
    pub fn deposit(chain_id: u64, recipient: Recipient, amount: UsdcAmount, user: Recipient) -> Self {
        Self {
            direction: Direction::Deposit,
            chain_id,
            recipient,
            amount,
            user,
        }
    }

    pub fn withdraw_and_bridge(
        chain_id: u64,
        recipient: Recipient,
        amount: UsdcAmount,
        user: Recipient,
    ) -> Self {
        Self {
            direction: Direction::WithdrawAndBridge,
            chain_id,
            recipient,
            amount,
            user,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Burning,
    AwaitingAttestation,
    Minting,
    VerifyingBalance,
    Depositing,
    Complete,
    /// Minted, but a later step needs manual follow-up; funds are safe.
    PartiallyComplete,
    Failed,
}

impl Phase {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::PartiallyComplete | Self::Failed)
    }

    /// Progress reported on entering this phase. Terminal failures keep the
    /// progress already reached.
    pub(crate) const fn progress(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Burning => 10,
            Self::AwaitingAttestation => 50,
            Self::Minting => 55,
            Self::VerifyingBalance => 60,
            Self::Depositing => 75,
            Self::Complete => 100,
            Self::PartiallyComplete | Self::Failed => 0,
        }
    }
}

/// Manual step a `PartiallyComplete` transfer is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    /// Minted funds not yet visible; confirm the balance, then deposit.
    ConfirmBalanceThenDeposit,
    /// Bridge-back minted but the balance was not observed in time.
    ConfirmBalance,
    /// The relayer deposit failed; retry it.
    RetryVaultDeposit,
    /// The vault only takes deposits signed by the user.
    UserSignedDeposit,
    /// Vault withdrawal landed but the burn did not; funds sit with the bridging account.
    ResumeBridgeBack,
}

/// Everything known about one transfer so far.
///
/// Written only by the orchestrator task that owns the transfer. Once the
/// phase is terminal the record is frozen: later updates are ignored.
/// Serializable so callers can persist it and resume after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferState {
    pub phase: Phase,
    pub progress_percent: u8,
    pub burn_tx_hash: Option<TxHash>,
    pub message: Option<BridgeMessage>,
    pub message_hash: Option<B256>,
    pub attestation: Option<Attestation>,
    pub mint_tx_hash: Option<TxHash>,
    /// Recipient's balance on the destination ledger just before the mint;
    /// the mint is confirmed once the balance reaches this plus the amount
    #[serde(default)]
    pub balance_before: Option<UsdcAmount>,
    /// Deposit transaction, or the withdrawal that opened a bridge-back
    pub vault_tx_hash: Option<TxHash>,
    pub last_error: Option<String>,
    pub follow_up: Option<FollowUp>,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// On-chain artifacts that already exist, for error reports.
    pub fn artifact_summary(&self) -> String {
        let artifacts = [
            ("burn tx", self.burn_tx_hash),
            ("message hash", self.message_hash),
            ("mint tx", self.mint_tx_hash),
            ("vault tx", self.vault_tx_hash),
        ]
        .into_iter()
        .filter_map(|(label, hash)| hash.map(|hash| format!("{label} {hash}")))
        .collect::<Vec<_>>();

        if artifacts.is_empty() {
            "no on-chain artifacts".to_string()
        } else {
            artifacts.join(", ")
        }
    }

    /// Starts a fresh, non-terminal record that keeps `prior`'s artifacts.
    pub(crate) fn resumed_from(prior: &TransferState, phase: Phase) -> Self {
        Self {
            phase,
            progress_percent: prior.progress_percent.max(phase.progress()),
            last_error: None,
            follow_up: None,
            ..prior.clone()
        }
    }

    pub(crate) fn advance(&mut self, phase: Phase) {
        if self.is_terminal() {
            return;
        }
        self.phase = phase;
        self.progress_percent = self.progress_percent.max(phase.progress());
    }

    pub(crate) fn raise_progress(&mut self, percent: u8) {
        if !self.is_terminal() {
            self.progress_percent = self.progress_percent.max(percent.min(100));
        }
    }

    pub(crate) fn record_burn(&mut self, burn: &BurnReceipt) {
        if self.is_terminal() {
            return;
        }
        self.burn_tx_hash = Some(burn.burn_tx_hash);
        // derived from the payload, never from a reported hash
        self.message_hash = Some(burn.message.hash());
        self.message = Some(burn.message.clone());
    }

    pub(crate) fn fail(&mut self, error: &BridgeError) {
        if self.is_terminal() {
            return;
        }
        self.record_error(error);
        self.phase = Phase::Failed;
    }

    pub(crate) fn partially_complete(&mut self, follow_up: FollowUp, error: &BridgeError) {
        if self.is_terminal() {
            return;
        }
        self.record_error(error);
        self.follow_up = Some(follow_up);
        self.phase = Phase::PartiallyComplete;
    }

    fn record_error(&mut self, error: &BridgeError) {
        // a broadcast burn is an artifact even without a receipt
        if let Some(tx_hash) = error.unconfirmed_burn() {
            self.burn_tx_hash.get_or_insert(tx_hash);
        }
        self.last_error = Some(format!("{error} ({})", self.artifact_summary()));
    }

    /// Balance the recipient must reach for the mint to count as visible.
    pub(crate) fn expected_balance(&self, amount: UsdcAmount) -> UsdcAmount {
        self.balance_before.unwrap_or_default().saturating_add(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{keccak256, Bytes};

    fn burn() -> BurnReceipt {
        BurnReceipt {
            burn_tx_hash: TxHash::repeat_byte(0xb1),
            message: BridgeMessage::new(Bytes::from_static(&[0xde, 0xad])),
        }
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut state = TransferState::default();
        state.advance(Phase::Burning);
        state.advance(Phase::AwaitingAttestation);
        state.raise_progress(53);
        state.advance(Phase::Minting);

        assert_eq!(state.phase, Phase::Minting);
        assert_eq!(state.progress_percent, 55);

        state.raise_progress(20);
        assert_eq!(state.progress_percent, 55);
    }

    #[test]
    fn test_terminal_state_is_frozen() {
        let mut state = TransferState::default();
        state.advance(Phase::Burning);
        state.fail(&BridgeError::Cancelled);

        state.advance(Phase::Complete);
        state.raise_progress(90);
        state.record_burn(&burn());

        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(state.progress_percent, 10);
        assert!(state.burn_tx_hash.is_none());
    }

    #[test]
    fn test_record_burn_derives_hash_from_payload() {
        let mut state = TransferState::default();
        state.record_burn(&burn());
        assert_eq!(state.message_hash, Some(keccak256([0xde, 0xad])));
    }

    #[test]
    fn test_failure_names_existing_artifacts() {
        let mut state = TransferState::default();
        state.advance(Phase::Burning);
        state.record_burn(&burn());
        state.fail(&BridgeError::AttestationTimeout { attempts: 3 });

        let error = state.last_error.unwrap();
        assert!(error.starts_with("Timeout waiting for attestation after 3 attempts"));
        assert!(error.contains(&format!("burn tx {}", TxHash::repeat_byte(0xb1))));
        assert!(error.contains("message hash"));
    }

    #[test]
    fn test_unconfirmed_burn_is_recorded_as_artifact() {
        let burn_tx = TxHash::repeat_byte(0xb1);
        let mut state = TransferState::default();
        state.advance(Phase::Burning);
        state.fail(&BridgeError::BurnUnconfirmed {
            tx_hash: burn_tx,
            reason: "no receipt".to_string(),
        });

        assert_eq!(state.burn_tx_hash, Some(burn_tx));
        assert!(state.message.is_none());
        let error = state.last_error.unwrap();
        assert!(error.contains(&format!("burn tx {burn_tx}")));
        assert!(!error.contains("no on-chain artifacts"));
    }

    #[test]
    fn test_expected_balance_adds_amount_to_snapshot() {
        let state = TransferState {
            balance_before: Some(UsdcAmount::from(100_000_000u64)),
            ..Default::default()
        };

        assert_eq!(
            state.expected_balance(UsdcAmount::from(25_500_000u64)),
            UsdcAmount::from(125_500_000u64)
        );
        assert_eq!(
            TransferState::default().expected_balance(UsdcAmount::from(1u64)),
            UsdcAmount::from(1u64)
        );
    }

    #[test]
    fn test_artifact_summary_without_artifacts() {
        assert_eq!(TransferState::default().artifact_summary(), "no on-chain artifacts");
    }

    #[test]
    fn test_resumed_state_keeps_artifacts() {
        let mut prior = TransferState::default();
        prior.advance(Phase::AwaitingAttestation);
        prior.record_burn(&burn());
        prior.fail(&BridgeError::AttestationTimeout { attempts: 3 });

        let resumed = TransferState::resumed_from(&prior, Phase::AwaitingAttestation);

        assert_eq!(resumed.phase, Phase::AwaitingAttestation);
        assert_eq!(resumed.burn_tx_hash, prior.burn_tx_hash);
        assert!(resumed.last_error.is_none());
        assert!(!resumed.is_terminal());
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = TransferState::default();
        state.advance(Phase::AwaitingAttestation);
        state.record_burn(&burn());

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""phase":"awaiting_attestation""#));
        assert_eq!(serde_json::from_str::<TransferState>(&json).unwrap(), state);
    }
}
