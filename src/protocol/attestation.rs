// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use alloy_primitives::{hex::FromHex, Bytes, B256};
use serde::{Deserialize, Deserializer, Serialize};

/// Signature bytes returned by the attestation service for one message.
///
/// An attestation has no identity of its own: it is always carried together
/// with the hash of the message it certifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Hash of the message this attestation certifies
    pub message_hash: B256,
    /// Opaque signature bytes, passed verbatim to the destination ledger
    pub signature: Bytes,
}

impl Attestation {
    pub fn new(message_hash: B256, signature: Bytes) -> Self {
        Self {
            message_hash,
            signature,
        }
    }

    /// Returns true if this attestation was issued for `message_hash`.
    pub fn attests(&self, message_hash: B256) -> bool {
        self.message_hash == message_hash
    }
}

/// Represents the response from the attestation service
///
/// The attestation data is a hex-encoded string (with or without "0x" prefix) that is
/// automatically deserialized into bytes.
///
/// **API Quirk**: Circle's Iris API sometimes returns the string `"PENDING"` for the
/// attestation field instead of `null` when the attestation is not yet ready. The
/// deserializer treats that as `None`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub status: AttestationStatus,
    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub attestation: Option<Bytes>,
}

impl AttestationResponse {
    pub fn pending() -> Self {
        Self {
            status: AttestationStatus::Pending,
            attestation: None,
        }
    }

    pub fn complete(attestation: impl Into<Bytes>) -> Self {
        Self {
            status: AttestationStatus::Complete,
            attestation: Some(attestation.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: AttestationStatus::Failed,
            attestation: None,
        }
    }
}

/// Handles the following cases:
/// - Valid hex string (with or without "0x") → `Some(Bytes)`
/// - "PENDING" or "pending" → `None`
/// - null, missing field or empty string → `None`
/// - Invalid hex → error
fn deserialize_optional_bytes_or_pending<'de, D>(deserializer: D) -> Result<Option<Bytes>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;

    match opt {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("pending") => Ok(None),
        Some(s) => {
            let bytes = Bytes::from_hex(s).map_err(serde::de::Error::custom)?;
            Ok(Some(bytes))
        }
    }
}

/// Represents the status of the attestation.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStatus {
    Complete,
    Pending,
    PendingConfirmations,
    Failed,
}
