// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! End-to-end transfers driven through the fakes in `cctp_vault_bridge::testing`.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{address, hex, Address, Bytes, TxHash, B256};
use cctp_vault_bridge::balance::aggregate_balances;
use cctp_vault_bridge::providers::VaultWithdrawBurn;
use cctp_vault_bridge::testing::{
    FakeAttestationProvider, FakeBalanceReader, FakeBurnSubmitter, FakeClock, FakeMintSubmitter,
    FakeVaultLedger,
};
use cctp_vault_bridge::traits::{BalanceReader, BurnSubmitter, MintSubmitter, VaultLedger};
use cctp_vault_bridge::{
    AttestationResponse, BridgeError, BridgeMessage, ChainRegistry, DomainId, FollowUp,
    Orchestrator, OrchestratorConfig, Phase, PollingConfig, Recipient, TransferRequest,
    UsdcAmount,
};
use rstest::rstest;
use tracing_subscriber::EnvFilter;

const ETHEREUM: u64 = 1;
const BASE: u64 = 8453;
const AMOUNT_UNITS: u64 = 25_500_000;

const BURN_TX: TxHash = TxHash::repeat_byte(0xb1);
const MINT_TX: TxHash = TxHash::repeat_byte(0x02);
const USER: Address = address!("a11ce00000000000000000000000000000000000");

/// Set `RUST_LOG=cctp_vault_bridge=debug` to see the transfer events.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn payload() -> Bytes {
    Bytes::from(hex!("deadbeef0000000000000000000000000000000000000000000000000000cafe"))
}

fn message_hash() -> B256 {
    BridgeMessage::new(payload()).hash()
}

fn amount() -> UsdcAmount {
    "25.50".parse().unwrap()
}

fn sui_account() -> Recipient {
    Recipient::from_word(B256::repeat_byte(0x5a))
}

fn deposit_request(chain_id: u64) -> TransferRequest {
    TransferRequest::deposit(chain_id, sui_account(), amount(), Recipient::from_address(USER))
}

/// One orchestrator wired to fakes, with handles kept for assertions.
struct Harness {
    attestations: FakeAttestationProvider,
    burner: FakeBurnSubmitter,
    minter: FakeMintSubmitter,
    balances: FakeBalanceReader,
    vault: Option<FakeVaultLedger>,
    clock: FakeClock,
    config: OrchestratorConfig,
}

impl Harness {
    fn new() -> Self {
        let attestations = FakeAttestationProvider::new();
        attestations.add_response_sequence(
            message_hash(),
            vec![
                AttestationResponse::pending(),
                AttestationResponse::complete(hex!("a77e57")),
            ],
        );

        Self {
            attestations,
            burner: FakeBurnSubmitter::succeeding(BURN_TX, payload()),
            minter: FakeMintSubmitter::minting(MINT_TX),
            balances: FakeBalanceReader::sequence([0, AMOUNT_UNITS]),
            vault: Some(FakeVaultLedger::new()),
            clock: FakeClock::new(),
            config: OrchestratorConfig::default(),
        }
    }

    fn orchestrator(&self) -> Arc<Orchestrator> {
        let burner: Arc<dyn BurnSubmitter> = Arc::new(self.burner.clone());
        let minter: Arc<dyn MintSubmitter> = Arc::new(self.minter.clone());
        let balances: Arc<dyn BalanceReader> = Arc::new(self.balances.clone());

        Arc::new(
            Orchestrator::builder()
                .registry(Arc::new(ChainRegistry::mainnet()))
                .attestation_provider(Arc::new(self.attestations.clone()))
                .burners(HashMap::from([
                    (DomainId::Ethereum, Arc::clone(&burner)),
                    (DomainId::Base, burner),
                ]))
                .minters(HashMap::from([(DomainId::Sui, minter)]))
                .balance_readers(HashMap::from([(DomainId::Sui, balances)]))
                .maybe_vault(
                    self.vault
                        .clone()
                        .map(|vault| Arc::new(vault) as Arc<dyn VaultLedger>),
                )
                .clock(Arc::new(self.clock.clone()))
                .config(self.config.clone())
                .build(),
        )
    }
}

#[tokio::test]
async fn test_deposit_happy_path() {
    init_tracing();
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start(deposit_request(ETHEREUM)).unwrap();
    let state = handle.join().await.unwrap();

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.progress_percent, 100);
    assert_eq!(state.burn_tx_hash, Some(BURN_TX));
    assert_eq!(state.message_hash, Some(message_hash()));
    assert_eq!(state.mint_tx_hash, Some(MINT_TX));
    assert!(state.vault_tx_hash.is_some());
    assert!(state.last_error.is_none());

    assert_eq!(harness.attestations.get_call_count(message_hash()), 2);
    assert_eq!(
        harness.burner.last_request(),
        Some((amount(), DomainId::Sui, sui_account()))
    );

    let vault = harness.vault.unwrap();
    let position = vault.position(Recipient::from_address(USER)).await.unwrap();
    assert_eq!(position.principal, amount());
}

#[tokio::test]
async fn test_already_processed_mint_continues() {
    let mut harness = Harness::new();
    harness.minter = FakeMintSubmitter::already_processed();
    let orchestrator = harness.orchestrator();

    let state = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(state.phase, Phase::Complete);
    assert!(state.mint_tx_hash.is_none());
    assert!(state.last_error.is_none());
    assert_eq!(harness.minter.call_count(), 1);
    assert_eq!(harness.balances.call_count(), 2);
}

#[tokio::test]
async fn test_mint_rejection_fails_transfer() {
    let mut harness = Harness::new();
    harness.minter = FakeMintSubmitter::rejecting("execution reverted: Invalid signature");
    let orchestrator = harness.orchestrator();

    let state = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.progress_percent, 55);
    let error = state.last_error.unwrap();
    assert!(error.contains("Invalid signature"));
    assert!(error.contains(&format!("burn tx {BURN_TX}")));
    assert_eq!(harness.balances.call_count(), 1);
    assert_eq!(state.balance_before, Some(UsdcAmount::ZERO));
}

#[tokio::test]
async fn test_attestation_timeout_then_resume_without_reburn() {
    let mut harness = Harness::new();
    harness.attestations.add_always_pending(message_hash());
    harness.config.attestation_polling = PollingConfig::default().with_max_attempts(3);
    let orchestrator = harness.orchestrator();

    let failed = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(failed.phase, Phase::Failed);
    assert_eq!(failed.burn_tx_hash, Some(BURN_TX));
    assert!(failed
        .last_error
        .as_deref()
        .unwrap()
        .contains("Timeout waiting for attestation after 3 attempts"));
    assert!(failed.progress_percent >= 50);

    harness
        .attestations
        .add_complete_response(message_hash(), hex!("a77e57"));

    let handle = orchestrator
        .resume_attestation(deposit_request(BASE), &failed)
        .unwrap();
    let resumed = handle.join().await.unwrap();

    assert_eq!(resumed.phase, Phase::Complete);
    assert_eq!(resumed.burn_tx_hash, Some(BURN_TX));
    assert_eq!(harness.burner.call_count(), 1);
    assert_eq!(harness.minter.call_count(), 1);
}

#[tokio::test]
async fn test_resume_rejects_tampered_state() {
    let mut harness = Harness::new();
    harness.attestations.add_always_pending(message_hash());
    harness.config.attestation_polling = PollingConfig::default().with_max_attempts(1);
    let orchestrator = harness.orchestrator();

    let mut prior = orchestrator.execute(deposit_request(BASE)).await.unwrap();
    assert_eq!(prior.phase, Phase::Failed);
    prior.message_hash = Some(B256::repeat_byte(0xff));

    let result = orchestrator.resume_attestation(deposit_request(BASE), &prior);
    assert!(matches!(result, Err(BridgeError::MessageHashMismatch { .. })));
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start(deposit_request(BASE)).unwrap();
    let mut updates = handle.subscribe();

    let mut seen = vec![updates.borrow_and_update().progress_percent];
    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();
        seen.push(state.progress_percent);
        if state.is_terminal() {
            break;
        }
    }

    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(handle.join().await.unwrap().phase, Phase::Complete);
}

#[tokio::test]
async fn test_unconfirmed_burn_is_recovered_on_resume() {
    init_tracing();
    let mut harness = Harness::new();
    harness.burner = FakeBurnSubmitter::unconfirmed(BURN_TX, payload());
    let orchestrator = harness.orchestrator();

    let failed = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(failed.phase, Phase::Failed);
    assert_eq!(failed.burn_tx_hash, Some(BURN_TX));
    assert!(failed.message.is_none());
    assert!(failed
        .last_error
        .as_deref()
        .unwrap()
        .contains(&format!("burn tx {BURN_TX}")));

    let resumed = orchestrator
        .resume_attestation(deposit_request(BASE), &failed)
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(resumed.phase, Phase::Complete);
    assert_eq!(resumed.burn_tx_hash, Some(BURN_TX));
    assert_eq!(resumed.message_hash, Some(message_hash()));
    assert_eq!(resumed.mint_tx_hash, Some(MINT_TX));
    assert_eq!(harness.burner.call_count(), 1);
    assert_eq!(harness.burner.recover_count(), 1);
}

#[tokio::test]
async fn test_existing_balance_waits_for_minted_amount() {
    let mut harness = Harness::new();
    harness.balances = FakeBalanceReader::sequence([100_000_000, 100_000_000, 125_500_000]);
    let orchestrator = harness.orchestrator();

    let state = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.balance_before, Some(UsdcAmount::from(100_000_000u64)));
    assert_eq!(harness.balances.call_count(), 3);
    assert_eq!(harness.vault.unwrap().deposit_count(), 1);
}

#[tokio::test]
async fn test_completed_transfer_cannot_be_resumed_at_attestation() {
    let mut harness = Harness::new();
    harness.minter = FakeMintSubmitter::already_processed();
    let orchestrator = harness.orchestrator();

    let complete = orchestrator.execute(deposit_request(BASE)).await.unwrap();
    assert_eq!(complete.phase, Phase::Complete);
    assert!(complete.mint_tx_hash.is_none());

    let result = orchestrator.resume_attestation(deposit_request(BASE), &complete);

    assert!(matches!(result, Err(BridgeError::InvalidRequest(_))));
    assert_eq!(harness.vault.unwrap().deposit_count(), 1);
    assert_eq!(harness.minter.call_count(), 1);
}

#[tokio::test]
async fn test_cancel_before_burn() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start(deposit_request(BASE)).unwrap();
    handle.cancel();
    let state = handle.join().await.unwrap();

    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(
        state.last_error.as_deref(),
        Some("Transfer cancelled before the burn was submitted (no on-chain artifacts)")
    );
    assert_eq!(harness.burner.call_count(), 0);
}

#[tokio::test]
async fn test_balance_not_visible_is_partially_complete() {
    let mut harness = Harness::new();
    harness.balances = FakeBalanceReader::fixed(0);
    let orchestrator = harness.orchestrator();

    let state = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(state.phase, Phase::PartiallyComplete);
    assert_eq!(state.follow_up, Some(FollowUp::ConfirmBalanceThenDeposit));
    assert_eq!(state.mint_tx_hash, Some(MINT_TX));
    assert!(state.last_error.unwrap().contains("not yet visible"));
    assert_eq!(harness.vault.unwrap().deposit_count(), 0);
}

#[tokio::test]
async fn test_vault_without_relayer_deposits() {
    let mut harness = Harness::new();
    harness.vault = Some(FakeVaultLedger::new().without_deposit_on_behalf());
    let orchestrator = harness.orchestrator();

    let state = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(state.phase, Phase::PartiallyComplete);
    assert_eq!(state.follow_up, Some(FollowUp::UserSignedDeposit));
    assert_eq!(state.progress_percent, 75);
    assert_eq!(harness.vault.unwrap().deposit_count(), 0);
}

#[tokio::test]
async fn test_failed_deposit_can_be_retried() {
    let mut harness = Harness::new();
    harness.vault = Some(FakeVaultLedger::new().failing_deposits());
    let orchestrator = harness.orchestrator();

    let partial = orchestrator.execute(deposit_request(BASE)).await.unwrap();
    assert_eq!(partial.phase, Phase::PartiallyComplete);
    assert_eq!(partial.follow_up, Some(FollowUp::RetryVaultDeposit));

    harness.vault = Some(FakeVaultLedger::new());
    let retry = harness.orchestrator();
    let state = retry
        .resume_deposit(deposit_request(BASE), &partial)
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.mint_tx_hash, Some(MINT_TX));
    assert!(state.vault_tx_hash.is_some());
    assert_eq!(harness.minter.call_count(), 1);
}

#[tokio::test]
async fn test_missing_vault_leaves_user_signed_deposit() {
    let mut harness = Harness::new();
    harness.vault = None;
    let orchestrator = harness.orchestrator();

    let state = orchestrator.execute(deposit_request(BASE)).await.unwrap();

    assert_eq!(state.phase, Phase::PartiallyComplete);
    assert_eq!(state.follow_up, Some(FollowUp::UserSignedDeposit));
}

struct WithdrawFixture {
    vault: FakeVaultLedger,
    sui_burner: FakeBurnSubmitter,
    base_minter: FakeMintSubmitter,
    orchestrator: Arc<Orchestrator>,
}

fn withdraw_fixture(sui_burner: FakeBurnSubmitter) -> WithdrawFixture {
    let attestations = FakeAttestationProvider::new();
    attestations.add_complete_response(message_hash(), hex!("a77e57"));

    let vault = FakeVaultLedger::new();
    let base_minter = FakeMintSubmitter::minting(MINT_TX);
    let withdraw_burner = VaultWithdrawBurn::new(
        Arc::new(vault.clone()),
        Arc::new(sui_burner.clone()),
        sui_account(),
    );

    let orchestrator = Arc::new(
        Orchestrator::builder()
            .registry(Arc::new(ChainRegistry::mainnet()))
            .attestation_provider(Arc::new(attestations))
            .withdraw_burner(Arc::new(withdraw_burner))
            .minters(HashMap::from([(
                DomainId::Base,
                Arc::new(base_minter.clone()) as Arc<dyn MintSubmitter>,
            )]))
            .balance_readers(HashMap::from([(
                DomainId::Base,
                Arc::new(FakeBalanceReader::sequence([0, AMOUNT_UNITS])) as Arc<dyn BalanceReader>,
            )]))
            .clock(Arc::new(FakeClock::new()))
            .build(),
    );

    WithdrawFixture {
        vault,
        sui_burner,
        base_minter,
        orchestrator,
    }
}

fn withdraw_request() -> TransferRequest {
    TransferRequest::withdraw_and_bridge(
        BASE,
        Recipient::from_address(USER),
        amount(),
        Recipient::from_address(USER),
    )
}

#[tokio::test]
async fn test_withdraw_and_bridge_happy_path() {
    init_tracing();
    let fixture = withdraw_fixture(FakeBurnSubmitter::succeeding(BURN_TX, payload()));

    let state = fixture.orchestrator.execute(withdraw_request()).await.unwrap();

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.progress_percent, 100);
    assert!(state.vault_tx_hash.is_some());
    assert_eq!(state.burn_tx_hash, Some(BURN_TX));
    assert_eq!(state.mint_tx_hash, Some(MINT_TX));
    assert_eq!(fixture.vault.withdrawal_count(), 1);
    assert_eq!(fixture.vault.deposit_count(), 0);
    assert_eq!(
        fixture.sui_burner.last_request(),
        Some((amount(), DomainId::Base, Recipient::from_address(USER)))
    );
}

#[tokio::test]
async fn test_withdraw_without_burn_awaits_bridge_back() {
    let fixture = withdraw_fixture(FakeBurnSubmitter::reverting("gas budget exceeded"));

    let state = fixture.orchestrator.execute(withdraw_request()).await.unwrap();

    assert_eq!(state.phase, Phase::PartiallyComplete);
    assert_eq!(state.follow_up, Some(FollowUp::ResumeBridgeBack));
    assert!(state.vault_tx_hash.is_some());
    assert!(state.burn_tx_hash.is_none());
    assert_eq!(fixture.base_minter.call_count(), 0);

    let resume = fixture
        .orchestrator
        .resume_deposit(withdraw_request(), &state);
    assert!(matches!(resume, Err(BridgeError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_withdraw_with_unconfirmed_burn_fails_with_burn_hash() {
    let fixture = withdraw_fixture(FakeBurnSubmitter::unconfirmed(BURN_TX, payload()));

    let failed = fixture.orchestrator.execute(withdraw_request()).await.unwrap();

    assert_eq!(failed.phase, Phase::Failed);
    assert!(failed.vault_tx_hash.is_some());
    assert_eq!(failed.burn_tx_hash, Some(BURN_TX));
    assert_eq!(fixture.base_minter.call_count(), 0);

    let resumed = fixture
        .orchestrator
        .resume_attestation(withdraw_request(), &failed)
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(resumed.phase, Phase::Complete);
    assert_eq!(resumed.mint_tx_hash, Some(MINT_TX));
    assert_eq!(fixture.vault.withdrawal_count(), 1);
    assert_eq!(fixture.sui_burner.call_count(), 1);
    assert_eq!(fixture.sui_burner.recover_count(), 1);
}

#[rstest]
#[case::zero_amount(TransferRequest::deposit(BASE, sui_account(), UsdcAmount::ZERO, sui_account()))]
#[case::unknown_chain(deposit_request(31337))]
#[case::no_burner_for_domain(deposit_request(42161))]
#[case::zero_recipient(TransferRequest::deposit(
    BASE,
    Recipient::from_word(B256::ZERO),
    amount(),
    sui_account()
))]
#[tokio::test]
async fn test_invalid_requests_rejected_before_any_side_effect(#[case] request: TransferRequest) {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();

    let err = orchestrator.start(request).unwrap_err();

    assert!(matches!(
        err,
        BridgeError::InvalidAmount(_)
            | BridgeError::ChainNotSupported { .. }
            | BridgeError::CapabilityMissing { .. }
            | BridgeError::InvalidRequest(_)
    ));
    assert_eq!(harness.burner.call_count(), 0);
}

#[tokio::test]
async fn test_balance_aggregation_skips_unreachable_chains() {
    let owner = Recipient::from_address(USER);
    let readers: Vec<(u64, Arc<dyn BalanceReader>)> = vec![
        (1, Arc::new(FakeBalanceReader::fixed(1_000_000))),
        (10, Arc::new(FakeBalanceReader::unreachable())),
        (8453, Arc::new(FakeBalanceReader::fixed(2_500_000))),
        (42161, Arc::new(FakeBalanceReader::fixed(0))),
    ];

    let report = aggregate_balances(readers, owner).await;

    assert_eq!(report.balances.len(), 3);
    assert_eq!(report.unreachable, vec![10]);
    assert_eq!(report.total(), UsdcAmount::from(3_500_000u64));
    assert!(!report.is_complete());
}
