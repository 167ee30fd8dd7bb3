// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Span helpers for transfer stages
//!
//! Static span names with structured attributes, kept out of the business
//! logic. Stage spans declare `error.*` and `otel.status_code` fields up front
//! so [`record_error`] can fill them in when a stage fails.
//!
//! ```rust,no_run
//! use cctp_vault_bridge::spans;
//! use alloy_primitives::B256;
//! use tracing::Instrument;
//!
//! # async fn example() {
//! let span = spans::poll_attestation(&B256::ZERO, 120, 5);
//! async {
//!     // custom polling here
//! }
//! .instrument(span)
//! .await;
//! # }
//! ```

use alloy_primitives::{TxHash, B256};
use tracing::Span;

use crate::protocol::{DomainId, Recipient, UsdcAmount};

/// Root span for one transfer.
///
/// Children: every stage span below.
#[inline]
pub fn transfer(
    direction: &str,
    source_domain: DomainId,
    destination_domain: DomainId,
    amount: &UsdcAmount,
) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.transfer",
        direction = direction,
        source_domain = %source_domain,
        destination_domain = %destination_domain,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Approve and burn on the source chain.
#[inline]
pub fn burn(
    source_domain: DomainId,
    destination_domain: DomainId,
    recipient: &Recipient,
    amount: &UsdcAmount,
) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.burn",
        source_domain = %source_domain,
        destination_domain = %destination_domain,
        recipient = %recipient,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Rebuilding a burn receipt from a broadcast burn transaction.
#[inline]
pub fn recover_burn(source_domain: DomainId, burn_tx_hash: TxHash) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.recover_burn",
        source_domain = %source_domain,
        burn_tx_hash = %burn_tx_hash,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Vault withdrawal followed by a burn.
#[inline]
pub fn withdraw_burn(owner: &Recipient, destination_domain: DomainId, amount: &UsdcAmount) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.withdraw_burn",
        owner = %owner,
        destination_domain = %destination_domain,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Attestation polling loop.
///
/// Children: cctp_vault_bridge.attestation_request (one per attempt)
#[inline]
pub fn poll_attestation(message_hash: &B256, max_attempts: u32, poll_interval_secs: u64) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.poll_attestation",
        message_hash = %message_hash,
        max_attempts = max_attempts,
        poll_interval_secs = poll_interval_secs,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

#[inline]
pub fn attestation_request(attempt: u32) -> Span {
    tracing::debug_span!("cctp_vault_bridge.attestation_request", attempt = attempt)
}

/// `receiveMessage` on the destination ledger.
#[inline]
pub fn mint(message_hash: &B256, destination_domain: DomainId, attestation_length: usize) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.mint",
        message_hash = %message_hash,
        destination_domain = %destination_domain,
        attestation_length_bytes = attestation_length,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

#[inline]
pub fn verify_balance(owner: &Recipient, expected: &UsdcAmount, max_attempts: u32) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.verify_balance",
        owner = %owner,
        expected = %expected,
        max_attempts = max_attempts,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

#[inline]
pub fn vault_deposit(user: &Recipient, amount: &UsdcAmount) -> Span {
    tracing::info_span!(
        "cctp_vault_bridge.vault_deposit",
        user = %user,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// One RPC operation against a pool endpoint.
#[inline]
pub fn rpc_call(operation: &str, endpoint: &str) -> Span {
    tracing::trace_span!(
        "cctp_vault_bridge.rpc_call",
        rpc.method = operation,
        rpc.endpoint = endpoint,
    )
}

/// Receipt polling after a submission.
#[inline]
pub fn wait_for_receipt(tx_hash: TxHash, max_attempts: u32) -> Span {
    tracing::debug_span!(
        "cctp_vault_bridge.wait_for_receipt",
        tx_hash = %tx_hash,
        max_attempts = max_attempts,
    )
}

/// Record error attributes on the current span, following the OpenTelemetry
/// conventions: `error.type`, `error.message` and `otel.status_code = ERROR`.
pub fn record_error<E: std::error::Error>(error: &E) {
    let current_span = Span::current();
    let message = error.to_string();
    current_span.record(
        "error.type",
        message.split(':').next().unwrap_or("Unknown"),
    );
    current_span.record("error.message", message.as_str());
    current_span.record("otel.status_code", "ERROR");

    if let Some(source) = error.source() {
        current_span.record("error.context", source.to_string());
    }
}

/// Like [`record_error`] with an explicit type name and extra context.
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
