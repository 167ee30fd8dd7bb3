// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! CCTP protocol types and definitions
//!
//! Domain identifiers, USDC amounts, recipient encoding, messages and
//! attestation responses.

mod amount;
mod attestation;
mod domain_id;
mod message;
mod recipient;

pub use amount::{UsdcAmount, USDC_DECIMALS};
pub use attestation::{Attestation, AttestationResponse, AttestationStatus};
pub use domain_id::{DomainId, InvalidDomainId};
pub use message::{BridgeMessage, BurnMessage, MessageHeader};
pub use recipient::Recipient;
