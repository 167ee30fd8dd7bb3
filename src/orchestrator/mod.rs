// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Transfer orchestrator
//!
//! Drives one [`TransferRequest`] through
//! `Idle → Burning → AwaitingAttestation → Minting → VerifyingBalance → Depositing → Complete`,
//! publishing a [`TransferState`] after every step. Fatal errors end in
//! `Failed`; a problem after the mint ends in `PartiallyComplete` with a
//! [`FollowUp`], since the funds are already on the destination ledger.
//!
//! A withdrawal with bridge-back runs the same machine in the other
//! direction: its first step is a vault withdrawal plus burn on the vault's
//! ledger, and it completes once the minted funds are visible on the EVM
//! chain.

mod handle;
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::TxHash;
use bon::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

pub use self::handle::TransferHandle;
pub use self::state::{Direction, FollowUp, Phase, TransferRequest, TransferState};

use self::handle::Tracker;
use crate::attestation::AttestationPoller;
use crate::balance::BalanceVerifier;
use crate::chain::ChainRegistry;
use crate::config::OrchestratorConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{BridgeMessage, DomainId};
use crate::providers::TokioClock;
use crate::spans;
use crate::traits::{
    AttestationProvider, BalanceReader, BurnReceipt, BurnSubmitter, Clock, MintOutcome,
    MintSubmitter, VaultLedger, WithdrawBurnOutcome, WithdrawBurnSubmitter,
};
use crate::vault::VaultDepositDriver;

/// Share of the attestation wait reflected in progress, on top of
/// [`Phase::AwaitingAttestation`]'s base value.
const ATTESTATION_PROGRESS_SPAN: u32 = 4;

/// Composes the submitters, the poller and the vault driver into transfers.
///
/// Collaborators are keyed by CCTP domain: a burn submitter per source
/// domain, a mint submitter and balance reader per destination domain. The
/// vault's own ledger is [`OrchestratorConfig::vault_domain`].
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use cctp_vault_bridge::orchestrator::{Orchestrator, TransferRequest};
/// use cctp_vault_bridge::providers::IrisAttestationProvider;
/// use cctp_vault_bridge::traits::{BalanceReader, BurnSubmitter, MintSubmitter};
/// use cctp_vault_bridge::{ChainRegistry, DomainId, Recipient, UsdcAmount};
///
/// # async fn example(
/// #     burner: Arc<dyn BurnSubmitter>,
/// #     minter: Arc<dyn MintSubmitter>,
/// #     balances: Arc<dyn BalanceReader>,
/// #     recipient: Recipient,
/// #     user: Recipient,
/// # ) -> Result<(), cctp_vault_bridge::BridgeError> {
/// let orchestrator = Arc::new(
///     Orchestrator::builder()
///         .registry(Arc::new(ChainRegistry::mainnet()))
///         .attestation_provider(Arc::new(IrisAttestationProvider::production()))
///         .burners(HashMap::from([(DomainId::Base, burner)]))
///         .minters(HashMap::from([(DomainId::Sui, minter)]))
///         .balance_readers(HashMap::from([(DomainId::Sui, balances)]))
///         .build(),
/// );
///
/// let amount: UsdcAmount = "25.50".parse()?;
/// let handle = orchestrator.start(TransferRequest::deposit(8453, recipient, amount, user))?;
/// let final_state = handle.join().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder)]
pub struct Orchestrator {
    registry: Arc<ChainRegistry>,
    attestation_provider: Arc<dyn AttestationProvider>,
    #[builder(default)]
    burners: HashMap<DomainId, Arc<dyn BurnSubmitter>>,
    withdraw_burner: Option<Arc<dyn WithdrawBurnSubmitter>>,
    #[builder(default)]
    minters: HashMap<DomainId, Arc<dyn MintSubmitter>>,
    #[builder(default)]
    balance_readers: HashMap<DomainId, Arc<dyn BalanceReader>>,
    vault: Option<Arc<dyn VaultLedger>>,
    #[builder(default = Arc::new(TokioClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
    #[builder(default)]
    config: OrchestratorConfig,
    /// Process-wide shutdown; interrupts attestation waits
    #[builder(default)]
    shutdown: CancellationToken,
}

enum FirstStep {
    Burn(Arc<dyn BurnSubmitter>),
    WithdrawBurn(Arc<dyn WithdrawBurnSubmitter>),
}

impl FirstStep {
    async fn recover(&self, burn_tx_hash: TxHash) -> Result<BurnReceipt> {
        match self {
            Self::Burn(burner) => burner.recover(burn_tx_hash).await,
            Self::WithdrawBurn(burner) => burner.recover_burn(burn_tx_hash).await,
        }
    }
}

/// A validated request with its collaborators resolved.
struct Plan {
    request: TransferRequest,
    source_domain: DomainId,
    destination_domain: DomainId,
    first_step: FirstStep,
    minter: Arc<dyn MintSubmitter>,
    balance_reader: Arc<dyn BalanceReader>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Entry {
    Start,
    /// The burn was broadcast but its message was never read back
    Recover,
    Attestation,
    AfterMint,
}

impl Orchestrator {
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Validates `request` and runs it as a background task.
    ///
    /// # Errors
    ///
    /// Returns validation errors (zero amount, unknown chain, missing
    /// submitter) before anything is spawned.
    pub fn start(self: &Arc<Self>, request: TransferRequest) -> Result<TransferHandle> {
        let plan = self.plan(request)?;
        Ok(self.spawn(plan, Entry::Start, TransferState::default()))
    }

    /// Validates and runs `request` to a terminal state on the current task.
    pub async fn execute(&self, request: TransferRequest) -> Result<TransferState> {
        let plan = self.plan(request)?;
        let tracker = Tracker::new(TransferState::default());
        Ok(self
            .run(&plan, Entry::Start, &tracker, &self.shutdown.child_token())
            .await)
    }

    /// Picks a transfer up at the attestation wait, reusing the message in
    /// `prior`. The burn is never resubmitted: when `prior` only holds the
    /// hash of a burn that was never confirmed, the message is first read
    /// back from that transaction.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidRequest`] if `prior` records no burn or already
    /// got past the mint, and [`BridgeError::MessageHashMismatch`] if its
    /// recorded hash does not match the payload.
    pub fn resume_attestation(
        self: &Arc<Self>,
        request: TransferRequest,
        prior: &TransferState,
    ) -> Result<TransferHandle> {
        let past_mint = matches!(
            prior.phase,
            Phase::VerifyingBalance | Phase::Depositing | Phase::Complete | Phase::PartiallyComplete
        );
        if past_mint || prior.mint_tx_hash.is_some() {
            return Err(BridgeError::InvalidRequest(format!(
                "transfer in phase {:?} is past the mint; use resume_deposit",
                prior.phase
            )));
        }

        let entry = match (&prior.message, prior.burn_tx_hash) {
            (Some(_), _) => {
                prior_message(prior)?;
                Entry::Attestation
            }
            (None, Some(_)) => Entry::Recover,
            (None, None) => {
                return Err(BridgeError::InvalidRequest(
                    "no burn recorded".to_string(),
                ))
            }
        };

        let plan = self.plan(request)?;
        info!(
            burn_tx_hash = ?prior.burn_tx_hash,
            message_hash = ?prior.message_hash,
            event = "transfer_resumed_at_attestation"
        );

        let phase = match entry {
            Entry::Recover => Phase::Burning,
            _ => Phase::AwaitingAttestation,
        };
        Ok(self.spawn(plan, entry, TransferState::resumed_from(prior, phase)))
    }

    /// Re-runs balance verification and, for deposits, the vault deposit of
    /// a `PartiallyComplete` transfer.
    pub fn resume_deposit(
        self: &Arc<Self>,
        request: TransferRequest,
        prior: &TransferState,
    ) -> Result<TransferHandle> {
        if prior.phase != Phase::PartiallyComplete
            || prior.follow_up == Some(FollowUp::ResumeBridgeBack)
        {
            return Err(BridgeError::InvalidRequest(format!(
                "transfer in phase {:?} with follow-up {:?} has nothing to resume after the mint",
                prior.phase, prior.follow_up
            )));
        }
        prior_message(prior)?;

        let plan = self.plan(request)?;
        Ok(self.spawn(
            plan,
            Entry::AfterMint,
            TransferState::resumed_from(prior, Phase::VerifyingBalance),
        ))
    }

    fn spawn(self: &Arc<Self>, plan: Plan, entry: Entry, initial: TransferState) -> TransferHandle {
        let tracker = Tracker::new(initial);
        let receiver = tracker.subscribe();
        let cancel = self.shutdown.child_token();

        let orchestrator = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move { orchestrator.run(&plan, entry, &tracker, &token).await });

        TransferHandle::new(receiver, cancel, task)
    }

    fn plan(&self, request: TransferRequest) -> Result<Plan> {
        if request.amount.is_zero() {
            return Err(BridgeError::InvalidAmount("amount must be positive".to_string()));
        }
        if request.recipient.as_word().is_zero() {
            return Err(BridgeError::InvalidRequest("recipient is the zero word".to_string()));
        }

        let chain = self.registry.lookup(request.chain_id)?;
        let vault_domain = self.config.vault_domain;
        if chain.cctp_domain == vault_domain {
            return Err(BridgeError::InvalidRequest(format!(
                "chain {} shares domain {vault_domain} with the vault ledger",
                chain.name
            )));
        }

        let (source_domain, destination_domain, first_step) = match request.direction {
            Direction::Deposit => {
                let burner = self.burners.get(&chain.cctp_domain).cloned().ok_or(
                    BridgeError::CapabilityMissing {
                        capability: "burn submitter",
                        domain: chain.cctp_domain,
                    },
                )?;
                (chain.cctp_domain, vault_domain, FirstStep::Burn(burner))
            }
            Direction::WithdrawAndBridge => {
                let burner = self.withdraw_burner.clone().ok_or(BridgeError::CapabilityMissing {
                    capability: "withdraw-and-burn submitter",
                    domain: vault_domain,
                })?;
                (vault_domain, chain.cctp_domain, FirstStep::WithdrawBurn(burner))
            }
        };

        let minter = self.minters.get(&destination_domain).cloned().ok_or(
            BridgeError::CapabilityMissing {
                capability: "mint submitter",
                domain: destination_domain,
            },
        )?;
        let balance_reader = self.balance_readers.get(&destination_domain).cloned().ok_or(
            BridgeError::CapabilityMissing {
                capability: "balance reader",
                domain: destination_domain,
            },
        )?;

        Ok(Plan {
            request,
            source_domain,
            destination_domain,
            first_step,
            minter,
            balance_reader,
        })
    }

    async fn run(
        &self,
        plan: &Plan,
        entry: Entry,
        tracker: &Tracker,
        cancel: &CancellationToken,
    ) -> TransferState {
        let span = spans::transfer(
            plan.request.direction.as_str(),
            plan.source_domain,
            plan.destination_domain,
            &plan.request.amount,
        );

        async move {
            if let Err(e) = self.drive(plan, entry, tracker, cancel).await {
                spans::record_error(&e);
                tracker.update(|state| state.fail(&e));
            }

            let state = tracker.snapshot();
            match state.phase {
                Phase::Complete => info!(
                    progress_percent = state.progress_percent,
                    event = "transfer_complete"
                ),
                Phase::PartiallyComplete => warn!(
                    follow_up = ?state.follow_up,
                    last_error = state.last_error.as_deref().unwrap_or_default(),
                    event = "transfer_partially_complete"
                ),
                _ => error!(
                    phase = ?state.phase,
                    last_error = state.last_error.as_deref().unwrap_or_default(),
                    event = "transfer_failed"
                ),
            }
            state
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        plan: &Plan,
        entry: Entry,
        tracker: &Tracker,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match entry {
            Entry::Start => {
                if cancel.is_cancelled() {
                    return Err(BridgeError::Cancelled);
                }

                tracker.update(|state| state.advance(Phase::Burning));
                let Some(burn) = self.first_step(plan, tracker, cancel).await? else {
                    return Ok(());
                };
                tracker.update(|state| {
                    state.record_burn(&burn);
                    state.advance(Phase::AwaitingAttestation);
                });
            }
            Entry::Recover => {
                let burn_tx_hash = tracker.snapshot().burn_tx_hash.ok_or_else(|| {
                    BridgeError::InvalidRequest("no burn transaction recorded".to_string())
                })?;

                let burn = plan.first_step.recover(burn_tx_hash).await?;
                info!(
                    burn_tx_hash = %burn_tx_hash,
                    message_hash = %burn.message_hash(),
                    event = "burn_recovered"
                );
                tracker.update(|state| {
                    state.record_burn(&burn);
                    state.advance(Phase::AwaitingAttestation);
                });
            }
            Entry::Attestation | Entry::AfterMint => {}
        }

        if entry <= Entry::Attestation {
            let message = prior_message(&tracker.snapshot())?;
            self.attest_and_mint(plan, &message, tracker, cancel).await?;
        }

        self.settle(plan, tracker).await;
        Ok(())
    }

    /// Runs the direction's first on-chain step. `None` means the transfer
    /// already reached a terminal state.
    async fn first_step(
        &self,
        plan: &Plan,
        tracker: &Tracker,
        cancel: &CancellationToken,
    ) -> Result<Option<BurnReceipt>> {
        let request = &plan.request;

        match &plan.first_step {
            FirstStep::Burn(burner) => burner
                .burn(request.amount, plan.destination_domain, request.recipient, cancel)
                .await
                .map(Some),
            FirstStep::WithdrawBurn(burner) => {
                let outcome = burner
                    .withdraw_and_burn(
                        request.user,
                        request.amount,
                        plan.destination_domain,
                        request.recipient,
                        cancel,
                    )
                    .await?;

                match outcome {
                    WithdrawBurnOutcome::Burned {
                        withdraw_tx_hash,
                        burn,
                    } => {
                        tracker.update(|state| state.vault_tx_hash = Some(withdraw_tx_hash));
                        Ok(Some(burn))
                    }
                    // the burn may have landed; resume rather than burn again
                    WithdrawBurnOutcome::WithdrawnOnly {
                        withdraw_tx_hash,
                        error,
                    } if error.unconfirmed_burn().is_some() => {
                        tracker.update(|state| state.vault_tx_hash = Some(withdraw_tx_hash));
                        Err(error)
                    }
                    WithdrawBurnOutcome::WithdrawnOnly {
                        withdraw_tx_hash,
                        error,
                    } => {
                        tracker.update(|state| {
                            state.vault_tx_hash = Some(withdraw_tx_hash);
                            state.partially_complete(FollowUp::ResumeBridgeBack, &error);
                        });
                        Ok(None)
                    }
                }
            }
        }
    }

    async fn attest_and_mint(
        &self,
        plan: &Plan,
        message: &BridgeMessage,
        tracker: &Tracker,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() && !self.shutdown.is_cancelled() {
            warn!(
                message_hash = %message.hash(),
                event = "cancel_ignored_after_burn"
            );
        }

        // anyone may relay the mint once attested, so the baseline is read first
        if tracker.snapshot().balance_before.is_none() {
            let balance = BalanceVerifier::new(Arc::clone(&self.clock), self.config.balance_polling)
                .snapshot(plan.balance_reader.as_ref(), plan.request.recipient)
                .await?;
            tracker.update(|state| state.balance_before = Some(balance));
        }

        let poller = AttestationPoller::new(
            Arc::clone(&self.attestation_provider),
            Arc::clone(&self.clock),
            self.config.attestation_polling,
        );
        let base = Phase::AwaitingAttestation.progress() as u32;
        let attestation = poller
            .poll(message.hash(), &self.shutdown, |attempt| {
                let creep = attempt.saturating_sub(1).min(ATTESTATION_PROGRESS_SPAN);
                tracker.update(|state| state.raise_progress((base + creep) as u8));
            })
            .await?;

        if !attestation.attests(message.hash()) {
            return Err(BridgeError::MessageHashMismatch {
                expected: message.hash(),
                computed: attestation.message_hash,
            });
        }

        tracker.update(|state| {
            state.attestation = Some(attestation.clone());
            state.advance(Phase::Minting);
        });

        match plan.minter.mint(message, &attestation).await {
            Ok(MintOutcome::Minted { tx_hash }) => {
                tracker.update(|state| state.mint_tx_hash = Some(tx_hash));
            }
            Ok(MintOutcome::AlreadyProcessed) => {
                info!(message_hash = %message.hash(), event = "mint_already_processed");
            }
            Err(e) if e.is_already_processed() => {
                info!(
                    message_hash = %message.hash(),
                    error = %e,
                    event = "mint_already_processed"
                );
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Balance confirmation and, for deposits, the vault deposit. Never
    /// fails the transfer: the mint already happened.
    async fn settle(&self, plan: &Plan, tracker: &Tracker) {
        let request = &plan.request;
        tracker.update(|state| state.advance(Phase::VerifyingBalance));

        let verifier = BalanceVerifier::new(Arc::clone(&self.clock), self.config.balance_polling);
        let expected = tracker.snapshot().expected_balance(request.amount);
        if let Err(e) = verifier
            .wait_for_balance(plan.balance_reader.as_ref(), request.recipient, expected)
            .await
        {
            let follow_up = match request.direction {
                Direction::Deposit => FollowUp::ConfirmBalanceThenDeposit,
                Direction::WithdrawAndBridge => FollowUp::ConfirmBalance,
            };
            tracker.update(|state| state.partially_complete(follow_up, &e));
            return;
        }

        if request.direction == Direction::WithdrawAndBridge {
            tracker.update(|state| state.advance(Phase::Complete));
            return;
        }

        tracker.update(|state| state.advance(Phase::Depositing));

        let Some(vault) = &self.vault else {
            tracker.update(|state| {
                state.partially_complete(
                    FollowUp::UserSignedDeposit,
                    &BridgeError::DepositOnBehalfUnsupported,
                )
            });
            return;
        };

        match VaultDepositDriver::new(Arc::clone(vault))
            .deposit(request.user, request.amount)
            .await
        {
            Ok(tx_hash) => tracker.update(|state| {
                state.vault_tx_hash = Some(tx_hash);
                state.advance(Phase::Complete);
            }),
            Err(e @ BridgeError::DepositOnBehalfUnsupported) => {
                tracker.update(|state| state.partially_complete(FollowUp::UserSignedDeposit, &e))
            }
            Err(e) => {
                tracker.update(|state| state.partially_complete(FollowUp::RetryVaultDeposit, &e))
            }
        }
    }
}

/// The message recorded in `state`, checked against its recorded hash.
fn prior_message(state: &TransferState) -> Result<BridgeMessage> {
    let message = state
        .message
        .clone()
        .ok_or_else(|| BridgeError::InvalidRequest("no burn message recorded".to_string()))?;

    match state.message_hash {
        Some(recorded) if recorded != message.hash() => Err(BridgeError::MessageHashMismatch {
            expected: recorded,
            computed: message.hash(),
        }),
        _ => Ok(message),
    }
}
