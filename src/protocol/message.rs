// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! CCTP message types
//!
//! [`BridgeMessage`] is the opaque payload a burn emits. [`MessageHeader`] and
//! [`BurnMessage`] decode the v1 wire layout on demand, keyed by the declared
//! version so an unknown layout is rejected instead of misread.
//!
//! Reference: <https://developers.circle.com/stablecoins/message-format>

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use super::DomainId;
use crate::error::{BridgeError, Result};

/// Message payload emitted by the source chain's message transmitter.
///
/// The hash is always derived from the payload, never accepted from outside.
/// Deserializing a persisted message recomputes it and rejects a stored hash
/// that disagrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredMessage", into = "StoredMessage")]
pub struct BridgeMessage {
    payload: Bytes,
    hash: B256,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMessage {
    payload: Bytes,
    #[serde(default)]
    message_hash: Option<B256>,
}

impl TryFrom<StoredMessage> for BridgeMessage {
    type Error = BridgeError;

    fn try_from(stored: StoredMessage) -> Result<Self> {
        match stored.message_hash {
            Some(hash) => Self::from_untrusted(stored.payload, hash),
            None => Ok(Self::new(stored.payload)),
        }
    }
}

impl From<BridgeMessage> for StoredMessage {
    fn from(message: BridgeMessage) -> Self {
        Self {
            payload: message.payload,
            message_hash: Some(message.hash),
        }
    }
}

impl BridgeMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let hash = keccak256(&payload);
        Self { payload, hash }
    }

    /// Rebuilds a message from a payload and a hash reported by another party,
    /// failing if the two disagree.
    pub fn from_untrusted(payload: impl Into<Bytes>, claimed_hash: B256) -> Result<Self> {
        let message = Self::new(payload);
        if message.hash != claimed_hash {
            return Err(BridgeError::MessageHashMismatch {
                expected: claimed_hash,
                computed: message.hash,
            });
        }
        Ok(message)
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// keccak256 of the payload
    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Decodes the v1 header, if the payload uses that layout.
    pub fn header(&self) -> Result<MessageHeader> {
        MessageHeader::decode(&self.payload)
    }

    /// Decodes the v1 burn body, if the payload carries one.
    pub fn burn_body(&self) -> Result<BurnMessage> {
        BurnMessage::decode(&self.payload[MessageHeader::SIZE.min(self.payload.len())..])
    }
}

/// CCTP v1 message header
///
/// | field | type | bytes |
/// |---|---|---|
/// | version | uint32 | 0..4 |
/// | sourceDomain | uint32 | 4..8 |
/// | destinationDomain | uint32 | 8..12 |
/// | nonce | uint64 | 12..20 |
/// | sender | bytes32 | 20..52 |
/// | recipient | bytes32 | 52..84 |
/// | destinationCaller | bytes32 | 84..116 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u32,
    pub source_domain: DomainId,
    pub destination_domain: DomainId,
    pub nonce: u64,
    pub sender: B256,
    pub recipient: B256,
    pub destination_caller: B256,
}

impl MessageHeader {
    /// Size of the v1 header in bytes
    pub const SIZE: usize = 116;

    /// The only header version this decoder understands
    pub const VERSION: u32 = 0;

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(BridgeError::MalformedMessage(format!(
                "header needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let version = read_u32(bytes, 0);
        if version != Self::VERSION {
            return Err(BridgeError::MalformedMessage(format!(
                "unsupported message version {version}"
            )));
        }

        Ok(Self {
            version,
            source_domain: read_domain(bytes, 4)?,
            destination_domain: read_domain(bytes, 8)?,
            nonce: u64::from_be_bytes(fixed(bytes, 12)),
            sender: B256::from_slice(&bytes[20..52]),
            recipient: B256::from_slice(&bytes[52..84]),
            destination_caller: B256::from_slice(&bytes[84..116]),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(&self.source_domain.as_u32().to_be_bytes());
        bytes.extend_from_slice(&self.destination_domain.as_u32().to_be_bytes());
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        bytes.extend_from_slice(self.sender.as_slice());
        bytes.extend_from_slice(self.recipient.as_slice());
        bytes.extend_from_slice(self.destination_caller.as_slice());
        bytes
    }

    /// Key of the destination transmitter's `usedNonces` mapping for this message:
    /// `keccak256(abi.encodePacked(sourceDomain, nonce))`.
    pub fn used_nonce_key(&self) -> B256 {
        let mut packed = [0u8; 12];
        packed[..4].copy_from_slice(&self.source_domain.as_u32().to_be_bytes());
        packed[4..].copy_from_slice(&self.nonce.to_be_bytes());
        keccak256(packed)
    }
}

/// CCTP v1 burn message body
///
/// | field | type | bytes |
/// |---|---|---|
/// | version | uint32 | 0..4 |
/// | burnToken | bytes32 | 4..36 |
/// | mintRecipient | bytes32 | 36..68 |
/// | amount | uint256 | 68..100 |
/// | messageSender | bytes32 | 100..132 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnMessage {
    pub version: u32,
    pub burn_token: B256,
    pub mint_recipient: B256,
    pub amount: U256,
    pub message_sender: B256,
}

impl BurnMessage {
    pub const SIZE: usize = 132;
    pub const VERSION: u32 = 0;

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(BridgeError::MalformedMessage(format!(
                "burn body needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let version = read_u32(bytes, 0);
        if version != Self::VERSION {
            return Err(BridgeError::MalformedMessage(format!(
                "unsupported burn message version {version}"
            )));
        }

        Ok(Self {
            version,
            burn_token: B256::from_slice(&bytes[4..36]),
            mint_recipient: B256::from_slice(&bytes[36..68]),
            amount: U256::from_be_slice(&bytes[68..100]),
            message_sender: B256::from_slice(&bytes[100..132]),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(self.burn_token.as_slice());
        bytes.extend_from_slice(self.mint_recipient.as_slice());
        bytes.extend_from_slice(&self.amount.to_be_bytes::<32>());
        bytes.extend_from_slice(self.message_sender.as_slice());
        bytes
    }

    /// The burned token as an EVM address
    pub fn burn_token_address(&self) -> Address {
        Address::from_word(self.burn_token)
    }
}

fn fixed<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(fixed(bytes, offset))
}

fn read_domain(bytes: &[u8], offset: usize) -> Result<DomainId> {
    let raw = read_u32(bytes, offset);
    DomainId::try_from(raw)
        .map_err(|e| BridgeError::MalformedMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    fn sample_header() -> MessageHeader {
        MessageHeader {
            version: 0,
            source_domain: DomainId::Ethereum,
            destination_domain: DomainId::Sui,
            nonce: 42,
            sender: B256::repeat_byte(0x01),
            recipient: B256::repeat_byte(0x02),
            destination_caller: B256::ZERO,
        }
    }

    fn sample_body() -> BurnMessage {
        BurnMessage {
            version: 0,
            burn_token: B256::repeat_byte(0x03),
            mint_recipient: B256::repeat_byte(0x04),
            amount: U256::from(25_500_000u64),
            message_sender: B256::repeat_byte(0x05),
        }
    }

    #[test]
    fn test_message_hash_is_keccak_of_payload() {
        let payload = hex!("deadbeef");
        let message = BridgeMessage::new(payload.to_vec());

        assert_eq!(message.hash(), keccak256(payload));
    }

    #[test]
    fn test_from_untrusted_rejects_wrong_hash() {
        let result = BridgeMessage::from_untrusted(vec![0xde, 0xad], B256::ZERO);
        assert!(matches!(
            result,
            Err(BridgeError::MessageHashMismatch { .. })
        ));

        let good = keccak256([0xde, 0xad]);
        assert!(BridgeMessage::from_untrusted(vec![0xde, 0xad], good).is_ok());
    }

    #[test]
    fn test_deserialize_rejects_tampered_hash() {
        let message = BridgeMessage::new(hex!("deadbeef").to_vec());
        let mut json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            serde_json::from_value::<BridgeMessage>(json.clone()).unwrap(),
            message
        );

        json["messageHash"] = serde_json::json!(B256::ZERO);
        assert!(serde_json::from_value::<BridgeMessage>(json).is_err());
    }

    #[test]
    fn test_decode_full_message() {
        let mut payload = sample_header().encode();
        payload.extend(sample_body().encode());
        let message = BridgeMessage::new(payload);

        assert_eq!(message.header().unwrap(), sample_header());
        assert_eq!(message.burn_body().unwrap(), sample_body());
    }

    #[test]
    fn test_header_layout_offsets() {
        let encoded = sample_header().encode();
        assert_eq!(encoded.len(), MessageHeader::SIZE);
        assert_eq!(&encoded[8..12], &8u32.to_be_bytes());
        assert_eq!(&encoded[12..20], &42u64.to_be_bytes());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut encoded = sample_header().encode();
        encoded[3] = 1;
        assert!(matches!(
            MessageHeader::decode(&encoded),
            Err(BridgeError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_short_payload_rejected() {
        let message = BridgeMessage::new(hex!("deadbeef").to_vec());
        assert!(message.header().is_err());
        assert!(message.burn_body().is_err());
    }

    #[test]
    fn test_used_nonce_key() {
        let header = sample_header();
        let mut packed = Vec::new();
        packed.extend_from_slice(&0u32.to_be_bytes());
        packed.extend_from_slice(&42u64.to_be_bytes());

        assert_eq!(header.used_nonce_key(), keccak256(packed));
    }
}
