// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Vault deposit driver and vault event history.

use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use alloy_rpc_types::Log;
use alloy_sol_types::SolEvent;
use serde::Serialize;
use tracing::{info, warn, Instrument};

use crate::contracts::vault::{Deposited, Withdrawn};
use crate::error::{BridgeError, Result};
use crate::protocol::{Recipient, UsdcAmount};
use crate::spans;
use crate::traits::VaultLedger;

/// Credits freshly minted funds to a user's vault position.
#[derive(Clone)]
pub struct VaultDepositDriver {
    vault: Arc<dyn VaultLedger>,
}

impl VaultDepositDriver {
    pub fn new(vault: Arc<dyn VaultLedger>) -> Self {
        Self { vault }
    }

    /// Deposits `amount` with `user` as beneficiary.
    ///
    /// Fails with [`BridgeError::DepositOnBehalfUnsupported`] without touching
    /// the ledger when the vault only accepts user-signed deposits.
    pub async fn deposit(&self, user: Recipient, amount: UsdcAmount) -> Result<TxHash> {
        let span = spans::vault_deposit(&user, &amount);

        async move {
            if !self.vault.supports_deposit_on_behalf() {
                let err = BridgeError::DepositOnBehalfUnsupported;
                spans::record_error(&err);
                warn!(event = "vault_deposit_requires_user_signature");
                return Err(err);
            }

            let tx_hash = self
                .vault
                .deposit_for(user, amount)
                .await
                .inspect_err(spans::record_error)?;

            info!(vault_tx_hash = %tx_hash, event = "vault_deposit_complete");
            Ok(tx_hash)
        }
        .instrument(span)
        .await
    }
}

/// A balance change logged by the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VaultEvent {
    #[serde(rename_all = "camelCase")]
    Deposited {
        vault_id: U256,
        user: Address,
        amount: UsdcAmount,
        tx_hash: Option<TxHash>,
    },
    #[serde(rename_all = "camelCase")]
    Withdrawn {
        vault_id: U256,
        user: Address,
        recipient: Address,
        amount: UsdcAmount,
        tx_hash: Option<TxHash>,
    },
}

impl VaultEvent {
    /// Decodes a vault log; `Ok(None)` for logs from other contracts or with
    /// other topics.
    pub fn from_log(vault: Address, log: &Log) -> Result<Option<Self>> {
        if log.address() != vault {
            return Ok(None);
        }

        let Some(topic) = log.topics().first() else {
            return Ok(None);
        };

        let event = if *topic == Deposited::SIGNATURE_HASH {
            let decoded = Deposited::decode_log_data(log.data())?;
            Self::Deposited {
                vault_id: decoded.vaultId,
                user: decoded.user,
                amount: decoded.amount.into(),
                tx_hash: log.transaction_hash,
            }
        } else if *topic == Withdrawn::SIGNATURE_HASH {
            let decoded = Withdrawn::decode_log_data(log.data())?;
            Self::Withdrawn {
                vault_id: decoded.vaultId,
                user: decoded.user,
                recipient: decoded.recipient,
                amount: decoded.amount.into(),
                tx_hash: log.transaction_hash,
            }
        } else {
            return Ok(None);
        };

        Ok(Some(event))
    }

    pub fn user(&self) -> Address {
        match self {
            Self::Deposited { user, .. } | Self::Withdrawn { user, .. } => *user,
        }
    }
}

/// Vault events in log order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultHistory {
    pub events: Vec<VaultEvent>,
}

impl VaultHistory {
    pub fn from_logs(vault: Address, logs: &[Log]) -> Result<Self> {
        let events = logs
            .iter()
            .map(|log| VaultEvent::from_log(vault, log))
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { events })
    }

    pub fn for_user(&self, user: Address) -> impl Iterator<Item = &VaultEvent> {
        self.events.iter().filter(move |event| event.user() == user)
    }

    /// Deposits minus withdrawals for `user`, floored at zero.
    pub fn net_principal(&self, user: Address) -> UsdcAmount {
        let net = self.for_user(user).fold(U256::ZERO, |acc, event| match event {
            VaultEvent::Deposited { amount, .. } => acc.saturating_add(amount.base_units()),
            VaultEvent::Withdrawn { amount, .. } => acc.saturating_sub(amount.base_units()),
        });
        UsdcAmount::from_base_units(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVaultLedger;
    use alloy_primitives::{address, B256};

    const VAULT: Address = address!("5555555555555555555555555555555555555555");
    const ALICE: Address = address!("a11ce00000000000000000000000000000000000");
    const BOB: Address = address!("b0b0000000000000000000000000000000000000");

    fn log_from<E: SolEvent>(emitter: Address, event: &E) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: emitter,
                data: event.encode_log_data(),
            },
            transaction_hash: Some(B256::repeat_byte(0x77)),
            ..Default::default()
        }
    }

    fn deposited(user: Address, amount: u64) -> Deposited {
        Deposited {
            vaultId: U256::from(1),
            user,
            amount: U256::from(amount),
        }
    }

    fn withdrawn(user: Address, amount: u64) -> Withdrawn {
        Withdrawn {
            vaultId: U256::from(1),
            user,
            recipient: user,
            amount: U256::from(amount),
        }
    }

    #[test]
    fn test_decodes_vault_events() {
        let logs = vec![
            log_from(VAULT, &deposited(ALICE, 10_000_000)),
            log_from(VAULT, &withdrawn(ALICE, 4_000_000)),
        ];

        let history = VaultHistory::from_logs(VAULT, &logs).unwrap();

        assert_eq!(history.events.len(), 2);
        assert_eq!(
            history.events[0],
            VaultEvent::Deposited {
                vault_id: U256::from(1),
                user: ALICE,
                amount: UsdcAmount::from(10_000_000u64),
                tx_hash: Some(B256::repeat_byte(0x77)),
            }
        );
        assert_eq!(history.net_principal(ALICE), UsdcAmount::from(6_000_000u64));
    }

    #[test]
    fn test_ignores_foreign_logs() {
        let logs = vec![
            log_from(Address::ZERO, &deposited(ALICE, 10_000_000)),
            log_from(VAULT, &deposited(BOB, 1_000_000)),
        ];

        let history = VaultHistory::from_logs(VAULT, &logs).unwrap();

        assert_eq!(history.events.len(), 1);
        assert_eq!(history.for_user(ALICE).count(), 0);
        assert_eq!(history.net_principal(BOB), UsdcAmount::from(1_000_000u64));
    }

    #[test]
    fn test_net_principal_saturates() {
        let logs = vec![log_from(VAULT, &withdrawn(ALICE, 4_000_000))];
        let history = VaultHistory::from_logs(VAULT, &logs).unwrap();
        assert_eq!(history.net_principal(ALICE), UsdcAmount::ZERO);
    }

    #[tokio::test]
    async fn test_deposit_on_behalf() {
        let ledger = Arc::new(FakeVaultLedger::new());
        let driver = VaultDepositDriver::new(ledger.clone());
        let user = Recipient::from_address(ALICE);

        driver.deposit(user, UsdcAmount::from(25_500_000u64)).await.unwrap();

        assert_eq!(ledger.deposit_count(), 1);
        let position = ledger.position(user).await.unwrap();
        assert_eq!(position.principal, UsdcAmount::from(25_500_000u64));
    }

    #[tokio::test]
    async fn test_deposit_refused_without_relayer_support() {
        let ledger = Arc::new(FakeVaultLedger::new().without_deposit_on_behalf());
        let driver = VaultDepositDriver::new(ledger.clone());

        let err = driver
            .deposit(Recipient::from_address(ALICE), UsdcAmount::from(1u64))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::DepositOnBehalfUnsupported));
        assert_eq!(ledger.deposit_count(), 0);
    }
}
