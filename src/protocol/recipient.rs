// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// A recipient identifier on the far side of a transfer, encoded as the
/// 32-byte big-endian word CCTP carries in its messages.
///
/// EVM addresses are left-padded with zeros; 32-byte native addresses (Sui,
/// Aptos, Solana) are used verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(B256);

impl Recipient {
    pub const fn from_word(word: B256) -> Self {
        Self(word)
    }

    pub fn from_address(address: Address) -> Self {
        Self(address.into_word())
    }

    pub const fn as_word(&self) -> B256 {
        self.0
    }

    /// Returns the EVM address this word encodes, if its top 12 bytes are zero.
    pub fn as_evm_address(&self) -> Option<Address> {
        if self.0[..12].iter().all(|byte| *byte == 0) {
            Some(Address::from_word(self.0))
        } else {
            None
        }
    }

    /// Like [`Recipient::as_evm_address`] but fails with a descriptive error.
    pub fn evm_address(&self) -> Result<Address> {
        self.as_evm_address().ok_or_else(|| {
            BridgeError::InvalidRequest(format!("recipient {} is not an EVM address", self.0))
        })
    }
}

impl From<Address> for Recipient {
    fn from(address: Address) -> Self {
        Self::from_address(address)
    }
}

impl From<B256> for Recipient {
    fn from(word: B256) -> Self {
        Self(word)
    }
}

impl FromStr for Recipient {
    type Err = BridgeError;

    /// Accepts either a 20-byte EVM address or a 32-byte hex word.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s).len();
        match digits {
            40 => Ok(Self::from_address(s.parse::<Address>()?)),
            64 => Ok(Self(s.parse::<B256>()?)),
            _ => Err(BridgeError::InvalidRequest(format!(
                "recipient {s} is neither a 20-byte nor a 32-byte hex value"
            ))),
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_evm_address() {
            Some(address) => write!(f, "{address}"),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_evm_address_is_left_padded() {
        let evm = address!("742d35Cc6634C0532925a3b844Bc9e7595f8fA0d");
        let recipient = Recipient::from_address(evm);

        assert_eq!(&recipient.as_word()[..12], &[0u8; 12]);
        assert_eq!(&recipient.as_word()[12..], evm.as_slice());
        assert_eq!(recipient.as_evm_address(), Some(evm));
    }

    #[test]
    fn test_native_word_is_not_evm() {
        let recipient = Recipient::from_word(B256::repeat_byte(0xab));
        assert!(recipient.as_evm_address().is_none());
        assert!(recipient.evm_address().is_err());
    }

    #[test]
    fn test_parse() {
        let evm: Recipient = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse().unwrap();
        assert!(evm.as_evm_address().is_some());

        let sui: Recipient = "0xabababababababababababababababababababababababababababababababab"
            .parse()
            .unwrap();
        assert_eq!(sui.as_word(), B256::repeat_byte(0xab));

        assert!("0x1234".parse::<Recipient>().is_err());
    }
}
