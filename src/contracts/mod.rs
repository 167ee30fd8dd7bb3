// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Contract bindings
//!
//! Inline `sol!` interfaces with thin instrumented wrappers that build
//! transaction requests and run view calls:
//!
//! - [`Erc20Contract`](erc20::Erc20Contract) for USDC approvals and balances
//! - [`TokenMessengerContract`](token_messenger::TokenMessengerContract) for burns
//! - [`MessageTransmitterContract`](message_transmitter::MessageTransmitterContract) for mints
//! - [`VaultContract`](vault::VaultContract) for the yield vault

pub mod erc20;
pub mod message_transmitter;
pub mod token_messenger;
pub mod vault;
