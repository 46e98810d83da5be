//! Fixed-point monetary value carried as a two-decimal string.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::MoneyParseError;

/// Currencies supported by the marketplace.
///
/// Settlement happens in a single currency; the column exists so stored
/// orders stay self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    CNY,
}

impl Currency {
    /// Returns the ISO code stored in the database.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::CNY => "CNY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CNY" => Ok(Currency::CNY),
            other => Err(format!("Unknown currency: {}", other)),
        }
    }
}

/// Exact decimal amount with two fractional digits.
///
/// The value is kept as its decimal string (the same text that is stored in
/// the database and sent over the wire), so no binary floating point is
/// involved once an amount exists. Comparisons go through [`Money::to_cents`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Money(String);

impl Money {
    /// Builds an amount from a float, rounded to two decimal places.
    pub fn from_float(value: f64) -> Self {
        Self(format!("{:.2}", value))
    }

    /// Builds an amount from an integer number of cents.
    pub fn from_cents(cents: i64) -> Self {
        let sign = if cents < 0 { "-" } else { "" };
        let magnitude = cents.unsigned_abs();
        Self(format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100))
    }

    /// Wraps a decimal string as-is. Validation happens in [`Money::to_cents`].
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The zero amount, `0.00`.
    pub fn zero() -> Self {
        Self::from_cents(0)
    }

    /// Returns the decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts to integer cents.
    ///
    /// An empty string is zero. The fraction is padded or truncated to
    /// exactly two digits, so `"1.5"` is 150 and `"1.239"` is 123.
    pub fn to_cents(&self) -> Result<i64, MoneyParseError> {
        let raw = self.0.trim();
        if raw.is_empty() {
            return Ok(0);
        }

        let (sign, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (-1i128, rest),
            None => (1i128, raw),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyParseError::new(raw, "whole part must be digits"));
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyParseError::new(raw, "fraction must be digits"));
        }

        let mut digits = [b'0'; 2];
        for (slot, b) in digits.iter_mut().zip(fraction.bytes()) {
            *slot = b;
        }
        let fraction_value = i128::from(digits[0] - b'0') * 10 + i128::from(digits[1] - b'0');

        let whole_value: i128 = whole
            .parse()
            .map_err(|_| MoneyParseError::new(raw, "amount out of range"))?;

        let cents = whole_value
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction_value))
            .map(|v| sign * v)
            .ok_or_else(|| MoneyParseError::new(raw, "amount out of range"))?;

        i64::try_from(cents).map_err(|_| MoneyParseError::new(raw, "amount out of range"))
    }

    /// Rounds a client-supplied float amount to cents.
    pub fn cents_from_float(value: f64) -> i64 {
        (value * 100.0).round() as i64
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cents_round_trip() {
        for cents in [0, 1, -1, 99, -99, 100, 500, -12345, 1_000_000_07, i64::MAX, i64::MIN] {
            assert_eq!(Money::from_cents(cents).to_cents().unwrap(), cents, "{}", cents);
        }
    }

    #[test]
    fn test_from_cents_formatting() {
        assert_eq!(Money::from_cents(500).as_str(), "5.00");
        assert_eq!(Money::from_cents(-7).as_str(), "-0.07");
        assert_eq!(Money::zero().as_str(), "0.00");
    }

    #[test]
    fn test_from_float_rounds_to_two_places() {
        assert_eq!(Money::from_float(5.0).as_str(), "5.00");
        assert_eq!(Money::from_float(19.999).as_str(), "20.00");
        assert_eq!(Money::from_float(0.126).to_cents().unwrap(), 13);
    }

    #[test]
    fn test_fraction_padding_and_truncation() {
        assert_eq!(Money::from_string("1.5").to_cents().unwrap(), 150);
        assert_eq!(Money::from_string("1.239").to_cents().unwrap(), 123);
        assert_eq!(Money::from_string("12").to_cents().unwrap(), 1200);
        assert_eq!(Money::from_string("-3.1").to_cents().unwrap(), -310);
        assert_eq!(Money::from_string(" 4.99 ").to_cents().unwrap(), 499);
    }

    #[test]
    fn test_empty_string_is_zero() {
        assert_eq!(Money::from_string("").to_cents().unwrap(), 0);
    }

    #[test]
    fn test_malformed_amounts_fail() {
        for bad in ["abc", "1.x", ".50", "--1", "1.2.3", "99999999999999999999999999"] {
            assert!(Money::from_string(bad).to_cents().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_cents_from_float() {
        assert_eq!(Money::cents_from_float(4.99), 499);
        assert_eq!(Money::cents_from_float(5.0), 500);
        assert_eq!(Money::cents_from_float(0.1 + 0.2), 30);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_cents(500)).unwrap();
        assert_eq!(json, "\"5.00\"");
    }
}
