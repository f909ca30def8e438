//! The native value unit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SaveVaultError;

/// Decimal places between one ether and one wei.
pub const ETHER_DECIMALS: u32 = 18;

/// Wei in one gwei.
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Wei in one ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// An amount of the native value unit, counted in its smallest
/// indivisible denomination.
///
/// Unsigned, so a balance can never go negative; arithmetic is checked.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Wei(u128);

impl Wei {
    /// Zero value.
    pub const ZERO: Wei = Wei(0);

    /// Create from a raw wei count.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Whole ether amount.
    pub const fn from_ether(ether: u64) -> Self {
        Self(ether as u128 * WEI_PER_ETHER)
    }

    /// Whole gwei amount.
    pub const fn from_gwei(gwei: u64) -> Self {
        Self(gwei as u128 * WEI_PER_GWEI)
    }

    /// Parse a decimal ether amount such as `"2.0"` or `"0.000000001"`.
    pub fn parse_ether(s: &str) -> Result<Self, SaveVaultError> {
        let invalid = || SaveVaultError::InvalidAmountFormat(s.to_string());

        let value: Decimal = s.trim().parse().map_err(|_| invalid())?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(invalid());
        }

        let value = value.normalize();
        let scale = value.scale();
        if scale > ETHER_DECIMALS {
            return Err(invalid());
        }

        value
            .mantissa()
            .unsigned_abs()
            .checked_mul(10u128.pow(ETHER_DECIMALS - scale))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Raw wei count.
    pub const fn get(&self) -> u128 {
        self.0
    }

    /// Check if the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction. `None` if the result would be negative.
    pub fn checked_sub(self, other: Wei) -> Option<Wei> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating addition.
    pub fn saturating_add(self, other: Wei) -> Wei {
        Self(self.0.saturating_add(other.0))
    }

    /// Format as a decimal ether string, trimming trailing zeros.
    pub fn to_ether_string(&self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }

        let frac = format!("{:018}", frac);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Wei {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<Wei> for u128 {
    fn from(value: Wei) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ether_units() {
        assert_eq!(Wei::from_ether(3).get(), 3_000_000_000_000_000_000);
        assert_eq!(Wei::from_gwei(1).get(), 1_000_000_000);
    }

    #[test]
    fn test_parse_ether() {
        assert_eq!(Wei::parse_ether("3").unwrap(), Wei::from_ether(3));
        assert_eq!(Wei::parse_ether("2.0").unwrap(), Wei::from_ether(2));
        assert_eq!(Wei::parse_ether("0.5").unwrap(), Wei::new(WEI_PER_ETHER / 2));
        assert_eq!(Wei::parse_ether("0.000000001").unwrap(), Wei::from_gwei(1));
        assert_eq!(Wei::parse_ether("0").unwrap(), Wei::ZERO);
    }

    #[test]
    fn test_parse_ether_rejects_bad_input() {
        assert!(Wei::parse_ether("-1").is_err());
        assert!(Wei::parse_ether("abc").is_err());
        assert!(Wei::parse_ether("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_to_ether_string() {
        assert_eq!(Wei::from_ether(3).to_ether_string(), "3");
        assert_eq!(Wei::new(WEI_PER_ETHER + WEI_PER_ETHER / 4).to_ether_string(), "1.25");
        assert_eq!(Wei::new(1).to_ether_string(), "0.000000000000000001");
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(Wei::new(1).checked_sub(Wei::new(2)), None);
        assert_eq!(Wei::new(u128::MAX).checked_add(Wei::new(1)), None);
        assert_eq!(Wei::new(2).checked_add(Wei::new(3)), Some(Wei::new(5)));
    }
}
