// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! CCTP domain ID types for identifying ledgers
//!
//! Circle's Cross-Chain Transfer Protocol uses domain IDs as unique identifiers
//! for each supported ledger, independent of the ledger's native chain id.
//!
//! Reference: <https://developers.circle.com/stablecoins/supported-domains>

use std::fmt;

use serde::{Deserialize, Serialize};

/// CCTP domain identifier
///
/// # Example
///
/// ```rust
/// use cctp_vault_bridge::DomainId;
///
/// let sui: u32 = DomainId::Sui.into();
/// assert_eq!(sui, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
#[non_exhaustive]
pub enum DomainId {
    /// Ethereum mainnet and Sepolia testnet (Domain ID: 0)
    Ethereum = 0,
    /// Avalanche C-Chain and Fuji (Domain ID: 1)
    Avalanche = 1,
    /// OP Mainnet and OP Sepolia (Domain ID: 2)
    Optimism = 2,
    /// Arbitrum One and Arbitrum Sepolia (Domain ID: 3)
    Arbitrum = 3,
    /// Noble (Domain ID: 4) - Cosmos appchain
    Noble = 4,
    /// Solana (Domain ID: 5) - Non-EVM
    Solana = 5,
    /// Base and Base Sepolia (Domain ID: 6)
    Base = 6,
    /// Polygon PoS and Amoy (Domain ID: 7)
    Polygon = 7,
    /// Sui (Domain ID: 8) - Non-EVM, hosts the vault ledger
    Sui = 8,
    /// Aptos (Domain ID: 9) - Non-EVM
    Aptos = 9,
    /// Unichain (Domain ID: 10)
    Unichain = 10,
}

impl DomainId {
    /// Returns the numeric domain ID value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Attempts to create a DomainId from a u32 value
    ///
    /// ```rust
    /// use cctp_vault_bridge::DomainId;
    ///
    /// assert_eq!(DomainId::from_u32(8), Some(DomainId::Sui));
    /// assert_eq!(DomainId::from_u32(999), None);
    /// ```
    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ethereum),
            1 => Some(Self::Avalanche),
            2 => Some(Self::Optimism),
            3 => Some(Self::Arbitrum),
            4 => Some(Self::Noble),
            5 => Some(Self::Solana),
            6 => Some(Self::Base),
            7 => Some(Self::Polygon),
            8 => Some(Self::Sui),
            9 => Some(Self::Aptos),
            10 => Some(Self::Unichain),
            _ => None,
        }
    }

    /// Returns the ledger name as a string
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Avalanche => "Avalanche",
            Self::Optimism => "Optimism",
            Self::Arbitrum => "Arbitrum",
            Self::Noble => "Noble",
            Self::Solana => "Solana",
            Self::Base => "Base",
            Self::Polygon => "Polygon",
            Self::Sui => "Sui",
            Self::Aptos => "Aptos",
            Self::Unichain => "Unichain",
        }
    }

    /// Whether recipients on this domain are 20-byte EVM addresses
    #[inline]
    pub const fn is_evm(self) -> bool {
        !matches!(
            self,
            Self::Noble | Self::Solana | Self::Sui | Self::Aptos
        )
    }
}

impl From<DomainId> for u32 {
    #[inline]
    fn from(domain: DomainId) -> Self {
        domain.as_u32()
    }
}

impl TryFrom<u32> for DomainId {
    type Error = InvalidDomainId;

    #[inline]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_u32(value).ok_or(InvalidDomainId(value))
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}

/// Error returned when attempting to convert an invalid u32 to a DomainId
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDomainId(pub u32);

impl fmt::Display for InvalidDomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid CCTP domain ID: {}", self.0)
    }
}

impl std::error::Error for InvalidDomainId {}
