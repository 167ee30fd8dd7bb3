// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Balance confirmation after a mint, and balance aggregation across chains.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::U256;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use crate::config::PollingConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{Recipient, UsdcAmount};
use crate::spans;
use crate::traits::{BalanceReader, Clock};

/// Waits until minted funds are visible on the destination ledger.
///
/// Some RPC nodes serve balances from a block behind the one that included
/// the mint, so a successful mint receipt does not mean the balance query
/// reflects it yet.
#[derive(Clone)]
pub struct BalanceVerifier {
    clock: Arc<dyn Clock>,
    config: PollingConfig,
}

impl BalanceVerifier {
    pub fn new(clock: Arc<dyn Clock>, config: PollingConfig) -> Self {
        Self { clock, config }
    }

    /// Reads `owner`'s current balance, retrying failed reads within the
    /// polling budget. Taken before the attestation wait so the check after
    /// the mint can wait for the minted amount on top of it.
    pub async fn snapshot(&self, reader: &dyn BalanceReader, owner: Recipient) -> Result<UsdcAmount> {
        let mut attempt = 1;
        loop {
            match reader.balance_of(owner).await {
                Ok(balance) => {
                    debug!(attempt, balance = %balance, event = "balance_snapshot_taken");
                    return Ok(UsdcAmount::from_base_units(balance));
                }
                Err(e) if attempt < self.config.max_attempts => {
                    warn!(attempt, error = %e, event = "balance_read_failed");
                    self.clock.sleep(self.config.poll_interval()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Polls `reader` until `owner` holds at least `expected`.
    ///
    /// Failed reads count as an attempt. Returns the confirmed balance, or
    /// [`BridgeError::BalanceNotConfirmed`] with the last balance seen.
    pub async fn wait_for_balance(
        &self,
        reader: &dyn BalanceReader,
        owner: Recipient,
        expected: UsdcAmount,
    ) -> Result<UsdcAmount> {
        let span = spans::verify_balance(&owner, &expected, self.config.max_attempts);

        async move {
            let mut observed: Option<U256> = None;

            for attempt in 1..=self.config.max_attempts {
                match reader.balance_of(owner).await {
                    Ok(balance) if balance >= expected.base_units() => {
                        info!(attempt, balance = %balance, event = "balance_confirmed");
                        return Ok(UsdcAmount::from_base_units(balance));
                    }
                    Ok(balance) => {
                        debug!(attempt, balance = %balance, event = "balance_below_expected");
                        observed = Some(balance);
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, event = "balance_read_failed");
                    }
                }

                if attempt < self.config.max_attempts {
                    self.clock.sleep(self.config.poll_interval()).await;
                }
            }

            let err = BridgeError::BalanceNotConfirmed {
                observed: observed.unwrap_or_default(),
                expected: expected.base_units(),
            };
            spans::record_error(&err);
            warn!(error = %err, event = "balance_not_confirmed");
            Err(err)
        }
        .instrument(span)
        .await
    }
}

/// Per-chain balances of one owner.
///
/// Chains whose reader failed are listed in `unreachable` rather than
/// failing the whole report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    pub balances: BTreeMap<u64, UsdcAmount>,
    pub unreachable: Vec<u64>,
}

impl BalanceReport {
    /// Sum over the chains that answered.
    pub fn total(&self) -> UsdcAmount {
        let sum = self
            .balances
            .values()
            .fold(U256::ZERO, |acc, amount| acc.saturating_add(amount.base_units()));
        UsdcAmount::from_base_units(sum)
    }

    pub fn is_complete(&self) -> bool {
        self.unreachable.is_empty()
    }
}

/// Queries every `(chain_id, reader)` pair concurrently.
pub async fn aggregate_balances(
    readers: impl IntoIterator<Item = (u64, Arc<dyn BalanceReader>)>,
    owner: Recipient,
) -> BalanceReport {
    let queries = readers.into_iter().map(|(chain_id, reader)| async move {
        (chain_id, reader.balance_of(owner).await)
    });

    let mut report = BalanceReport::default();
    for (chain_id, result) in join_all(queries).await {
        match result {
            Ok(balance) => {
                report
                    .balances
                    .insert(chain_id, UsdcAmount::from_base_units(balance));
            }
            Err(e) => {
                warn!(chain_id, error = %e, event = "chain_balance_unavailable");
                report.unreachable.push(chain_id);
            }
        }
    }
    report.unreachable.sort_unstable();

    info!(
        owner = %owner,
        reachable = report.balances.len(),
        unreachable = report.unreachable.len(),
        total = %report.total(),
        event = "balances_aggregated"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBalanceReader, FakeClock};
    use alloy_primitives::Address;
    use std::time::Duration;

    fn owner() -> Recipient {
        Recipient::from_address(Address::repeat_byte(0x42))
    }

    fn verifier(clock: &FakeClock, max_attempts: u32) -> BalanceVerifier {
        BalanceVerifier::new(
            Arc::new(clock.clone()),
            PollingConfig::balance_default().with_max_attempts(max_attempts),
        )
    }

    #[tokio::test]
    async fn test_confirms_once_balance_catches_up() {
        let clock = FakeClock::new();
        let reader = FakeBalanceReader::sequence([0, 10_000_000, 25_500_000]);

        let confirmed = verifier(&clock, 10)
            .wait_for_balance(&reader, owner(), UsdcAmount::from(25_500_000u64))
            .await
            .unwrap();

        assert_eq!(confirmed, UsdcAmount::from(25_500_000u64));
        assert_eq!(reader.call_count(), 3);
        assert_eq!(clock.total_sleep_time(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_accepts_balance_above_expected() {
        let clock = FakeClock::new();
        let reader = FakeBalanceReader::fixed(100_000_000);

        let confirmed = verifier(&clock, 3)
            .wait_for_balance(&reader, owner(), UsdcAmount::from(1_000_000u64))
            .await
            .unwrap();

        assert_eq!(confirmed, UsdcAmount::from(100_000_000u64));
    }

    #[tokio::test]
    async fn test_reports_last_observed_on_timeout() {
        let clock = FakeClock::new();
        let reader = FakeBalanceReader::sequence([1_000_000, 2_000_000]);

        let err = verifier(&clock, 4)
            .wait_for_balance(&reader, owner(), UsdcAmount::from(5_000_000u64))
            .await
            .unwrap_err();

        match err {
            BridgeError::BalanceNotConfirmed { observed, expected } => {
                assert_eq!(observed, U256::from(2_000_000u64));
                assert_eq!(expected, U256::from(5_000_000u64));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(reader.call_count(), 4);
        assert_eq!(clock.sleep_count(), 3);
    }

    #[tokio::test]
    async fn test_read_failures_count_as_attempts() {
        let clock = FakeClock::new();
        let reader = FakeBalanceReader::flaky(2, 7_000_000);

        let confirmed = verifier(&clock, 5)
            .wait_for_balance(&reader, owner(), UsdcAmount::from(7_000_000u64))
            .await
            .unwrap();

        assert_eq!(confirmed, UsdcAmount::from(7_000_000u64));
        assert_eq!(reader.call_count(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_retries_failed_reads() {
        let clock = FakeClock::new();
        let reader = FakeBalanceReader::flaky(2, 100_000_000);

        let snapshot = verifier(&clock, 5).snapshot(&reader, owner()).await.unwrap();

        assert_eq!(snapshot, UsdcAmount::from(100_000_000u64));
        assert_eq!(reader.call_count(), 3);
        assert_eq!(clock.sleep_count(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_gives_up_after_budget() {
        let clock = FakeClock::new();
        let reader = FakeBalanceReader::unreachable();

        let result = verifier(&clock, 3).snapshot(&reader, owner()).await;

        assert!(matches!(result, Err(BridgeError::Provider(_))));
        assert_eq!(reader.call_count(), 3);
        assert_eq!(clock.sleep_count(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_tolerates_unreachable_chains() {
        let readers: Vec<(u64, Arc<dyn BalanceReader>)> = vec![
            (1, Arc::new(FakeBalanceReader::fixed(10_000_000))),
            (10, Arc::new(FakeBalanceReader::unreachable())),
            (8453, Arc::new(FakeBalanceReader::fixed(2_500_000))),
            (42161, Arc::new(FakeBalanceReader::unreachable())),
        ];

        let report = aggregate_balances(readers, owner()).await;

        assert_eq!(report.balances.len(), 2);
        assert_eq!(report.unreachable, vec![10, 42161]);
        assert_eq!(report.total(), UsdcAmount::from(12_500_000u64));
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_aggregate_all_unreachable_is_empty_report() {
        let readers: Vec<(u64, Arc<dyn BalanceReader>)> =
            vec![(1, Arc::new(FakeBalanceReader::unreachable()))];

        let report = aggregate_balances(readers, owner()).await;

        assert!(report.balances.is_empty());
        assert_eq!(report.total(), UsdcAmount::ZERO);
    }
}
