// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Chain registry
//!
//! Static per-chain data: CCTP domain, contract addresses, the local USDC
//! token and RPC endpoints.

pub mod addresses;
mod config;
mod registry;

pub use config::ChainConfig;
pub use registry::ChainRegistry;
