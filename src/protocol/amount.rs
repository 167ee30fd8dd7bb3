// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! USDC amounts in 6-decimal base units

use std::fmt;
use std::str::FromStr;

use alloy_primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Number of decimals USDC uses on every CCTP domain.
pub const USDC_DECIMALS: u8 = 6;

/// An amount of USDC expressed in base units (1 USDC = 1_000_000).
///
/// ```rust
/// use cctp_vault_bridge::UsdcAmount;
///
/// let amount: UsdcAmount = "25.50".parse().unwrap();
/// assert_eq!(amount.base_units(), 25_500_000u64);
/// assert_eq!(amount.to_string(), "25.500000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdcAmount(U256);

impl UsdcAmount {
    pub const ZERO: Self = Self(U256::ZERO);

    /// Wraps an amount already expressed in base units.
    pub const fn from_base_units(units: U256) -> Self {
        Self(units)
    }

    /// Parses a human readable decimal string such as `"25.50"`.
    ///
    /// Negative values and values with more than six fractional digits are rejected.
    pub fn parse_decimal(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(BridgeError::InvalidAmount("empty amount".to_string()));
        }

        // parse_units truncates excess precision silently
        if let Some((_, fraction)) = trimmed.split_once('.') {
            if fraction.len() > USDC_DECIMALS as usize {
                return Err(BridgeError::InvalidAmount(format!(
                    "{trimmed} has more than {USDC_DECIMALS} decimal places"
                )));
            }
        }

        match parse_units(trimmed, USDC_DECIMALS)? {
            ParseUnits::U256(units) => Ok(Self(units)),
            ParseUnits::I256(_) => Err(BridgeError::InvalidAmount(format!(
                "negative amount {trimmed}"
            ))),
        }
    }

    pub const fn base_units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Returns the amount as a decimal string with six fractional digits.
    pub fn to_decimal_string(&self) -> String {
        format_units(self.0, USDC_DECIMALS).unwrap_or_else(|_| self.0.to_string())
    }
}

impl From<u64> for UsdcAmount {
    fn from(units: u64) -> Self {
        Self(U256::from(units))
    }
}

impl From<U256> for UsdcAmount {
    fn from(units: U256) -> Self {
        Self(units)
    }
}

impl From<UsdcAmount> for U256 {
    fn from(amount: UsdcAmount) -> Self {
        amount.0
    }
}

impl FromStr for UsdcAmount {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_decimal(s)
    }
}

impl fmt::Display for UsdcAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}
