// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Production implementations of the trait seams in [`crate::traits`].
//!
//! These talk to real EVM RPC endpoints, Circle's Iris API, and the tokio
//! clock. Tests swap them for the fakes in [`crate::testing`].

mod alloy;
mod evm;
mod evm_balance;
mod evm_burn;
mod evm_mint;
mod evm_vault;
mod iris;
mod rpc_pool;
mod tokio_clock;
mod withdraw_burn;

pub use self::alloy::AlloyProvider;
pub use self::evm::EvmPool;
pub use self::evm_balance::EvmBalanceReader;
pub use self::evm_burn::EvmBurnSubmitter;
pub use self::evm_mint::EvmMintSubmitter;
pub use self::evm_vault::EvmVault;
pub use self::iris::IrisAttestationProvider;
pub use self::rpc_pool::{EndpointRank, RpcPool};
pub use self::tokio_clock::TokioClock;
pub use self::withdraw_burn::VaultWithdrawBurn;
