// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! # cctp-vault-bridge
//!
//! Moves USDC between EVM chains and a yield vault on another ledger using
//! Circle's Cross-Chain Transfer Protocol (CCTP), and back again.
//!
//! A deposit burns USDC on the user's EVM chain, waits for Circle's
//! attestation, mints on the vault's ledger, confirms the balance and
//! credits the user's vault position. A withdrawal with bridge-back runs the
//! same steps in reverse. Every transfer publishes a [`TransferState`] that
//! callers can watch, persist and resume.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use alloy_primitives::address;
//! use alloy_provider::ProviderBuilder;
//! use cctp_vault_bridge::providers::{
//!     AlloyProvider, EvmBurnSubmitter, IrisAttestationProvider, RpcPool,
//! };
//! use cctp_vault_bridge::traits::{BalanceReader, BurnSubmitter, MintSubmitter};
//! use cctp_vault_bridge::{
//!     BridgeError, ChainRegistry, DomainId, Orchestrator, ProviderConfig, Recipient,
//!     TransferRequest,
//! };
//! use url::Url;
//!
//! # async fn example(
//! #     sui_minter: Arc<dyn MintSubmitter>,
//! #     sui_balances: Arc<dyn BalanceReader>,
//! #     user: Recipient,
//! # ) -> Result<(), BridgeError> {
//! let registry = Arc::new(ChainRegistry::mainnet());
//! let base = registry.lookup(8453)?.clone();
//!
//! let signer = address!("742d35Cc6634C0532925a3b844Bc9e7595f8fA0d");
//! let url: Url = "https://mainnet.base.org".parse().unwrap();
//! let provider = ProviderBuilder::new().connect_http(url.clone());
//! let pool = Arc::new(RpcPool::new(
//!     [(url, AlloyProvider::new(provider))],
//!     ProviderConfig::default(),
//! )?);
//! let burner: Arc<dyn BurnSubmitter> = Arc::new(EvmBurnSubmitter::new(base, signer, pool));
//!
//! let orchestrator = Arc::new(
//!     Orchestrator::builder()
//!         .registry(registry)
//!         .attestation_provider(Arc::new(IrisAttestationProvider::production()))
//!         .burners(HashMap::from([(DomainId::Base, burner)]))
//!         .minters(HashMap::from([(DomainId::Sui, sui_minter)]))
//!         .balance_readers(HashMap::from([(DomainId::Sui, sui_balances)]))
//!         .build(),
//! );
//!
//! let handle = orchestrator.start(TransferRequest::deposit(
//!     8453,
//!     user,
//!     "25.50".parse()?,
//!     user,
//! ))?;
//!
//! let mut updates = handle.subscribe();
//! while updates.changed().await.is_ok() {
//!     let state = updates.borrow().clone();
//!     println!("{:?} {}%", state.phase, state.progress_percent);
//!     if state.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Public API
//!
//! - [`Orchestrator`], [`TransferRequest`], [`TransferState`] and
//!   [`TransferHandle`] - running and observing transfers
//! - [`attestation::AttestationPoller`], [`balance::BalanceVerifier`] and
//!   [`vault::VaultDepositDriver`] - the individual stages
//! - [`traits`] - seams for RPC, attestation, signing and the vault
//! - [`providers`] - alloy, Iris and tokio implementations of those seams
//! - [`testing`] - in-memory fakes of every seam
//! - [`BridgeError`] and [`ErrorClass`] - error types and their recovery class

pub mod attestation;
pub mod balance;
pub mod chain;
pub mod config;
pub mod contracts;
mod error;
pub mod orchestrator;
pub mod protocol;
pub mod providers;
pub mod spans;
pub mod testing;
pub mod traits;
pub mod vault;

pub use chain::{ChainConfig, ChainRegistry};
pub use config::{OrchestratorConfig, PollingConfig, ProviderConfig};
pub use contracts::erc20::Erc20Contract;
pub use error::{BridgeError, ErrorClass, Result};
pub use orchestrator::{
    Direction, FollowUp, Orchestrator, Phase, TransferHandle, TransferRequest, TransferState,
};
pub use protocol::{
    Attestation, AttestationResponse, AttestationStatus, BridgeMessage, DomainId, Recipient,
    UsdcAmount,
};
