//! Fixed-rate payout arithmetic.
//!
//! All amounts that leave the process are integer minor units. The rate is
//! applied to the exact deposit value with `rust_decimal` and the result is
//! truncated toward zero once, at the output token's precision, so the same
//! deposit always produces the same payout.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::deposit::nano_to_ton;
use crate::error::{Error, Result};

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMALS: u32 = 28;

/// Fixed conversion factor from TON to output-token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    /// Returns `None` unless `value` is strictly positive.
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO).then_some(Self(value))
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self(Decimal::from(20_000))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = String;

    fn try_from(value: Decimal) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("rate must be positive, got {value}"))
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

/// Output-token amount in integer minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    minor: u128,
    decimals: u32,
}

impl TokenAmount {
    #[must_use]
    pub const fn from_minor(minor: u128, decimals: u32) -> Self {
        Self { minor, decimals }
    }

    #[must_use]
    pub const fn minor(&self) -> u128 {
        self.minor
    }

    #[must_use]
    pub const fn decimals(&self) -> u32 {
        self.decimals
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Value in whole token units.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        i128::try_from(self.minor)
            .ok()
            .and_then(|minor| Decimal::try_from_i128_with_scale(minor, self.decimals).ok())
            .map_or(Decimal::MAX, |d| d.normalize())
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Apply the rate to a TON amount, truncated to `decimals` places.
///
/// # Errors
///
/// Returns [`Error::Payout`] when the product overflows.
pub fn compute_payout(ton_amount: Decimal, rate: Rate, decimals: u32) -> Result<Decimal> {
    let product = ton_amount
        .checked_mul(rate.value())
        .ok_or_else(|| Error::Payout(format!("{ton_amount} x {rate} overflows")))?;
    Ok(product.trunc_with_scale(decimals.min(MAX_DECIMALS)))
}

/// Convert a whole-unit amount into integer minor units, truncating any
/// precision beyond `decimals`.
///
/// # Errors
///
/// Returns [`Error::Payout`] for negative amounts or when the scaled value
/// does not fit.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> Result<TokenAmount> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::Payout(format!("negative amount {amount}")));
    }
    let mut scaled = amount;
    for _ in 0..decimals {
        scaled = scaled
            .checked_mul(Decimal::TEN)
            .ok_or_else(|| Error::Payout(format!("{amount} overflows at {decimals} decimals")))?;
    }
    let minor = scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| Error::Payout(format!("{amount} does not fit in minor units")))?;
    Ok(TokenAmount::from_minor(minor, decimals))
}

/// Payout owed for a deposit of `value` nanotons.
///
/// # Errors
///
/// Returns [`Error::Payout`] on overflow.
pub fn payout_for(value: u64, rate: Rate, decimals: u32) -> Result<TokenAmount> {
    let owed = compute_payout(nano_to_ton(value), rate, decimals)?;
    to_minor_units(owed, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(value: Decimal) -> Rate {
        Rate::new(value).unwrap()
    }

    #[test]
    fn rate_must_be_positive() {
        assert!(Rate::new(dec!(0)).is_none());
        assert!(Rate::new(dec!(-1)).is_none());
        assert_eq!(Rate::new(dec!(0.5)).unwrap().value(), dec!(0.5));
        assert_eq!(Rate::default().value(), dec!(20000));
    }

    #[test]
    fn rate_deserializes_from_string_and_rejects_zero() {
        let parsed: Rate = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(parsed.value(), dec!(12.5));
        assert!(serde_json::from_str::<Rate>("\"0\"").is_err());
    }

    #[test]
    fn one_ton_at_default_rate_pays_twenty_thousand_tokens() {
        let amount = payout_for(1_000_000_000, Rate::default(), 9).unwrap();
        assert_eq!(amount.minor(), 20_000_000_000_000);
        assert_eq!(amount.to_decimal(), dec!(20000));
        assert_eq!(amount.to_string(), "20000");
    }

    #[test]
    fn compute_payout_multiplies_and_truncates() {
        assert_eq!(
            compute_payout(dec!(1.5), rate(dec!(20000)), 9).unwrap(),
            dec!(30000)
        );
        assert_eq!(
            compute_payout(dec!(0.000000001), rate(dec!(0.3)), 9).unwrap(),
            dec!(0)
        );
        assert_eq!(
            compute_payout(dec!(1), rate(dec!(0.123456789123)), 6).unwrap(),
            dec!(0.123456)
        );
    }

    #[test]
    fn token_decimals_change_minor_scale() {
        let amount = payout_for(2_500_000_000, rate(dec!(4)), 6).unwrap();
        assert_eq!(amount.minor(), 10_000_000);
        assert_eq!(amount.decimals(), 6);
        assert_eq!(amount.to_decimal(), dec!(10));
    }

    #[test]
    fn payout_is_linear_for_integral_rates() {
        let r = rate(dec!(20000));
        let pairs = [
            (1_u64, 2_u64),
            (123_456_789, 987_654_321),
            (1_000_000_000, 1),
            (u64::from(u32::MAX), 77),
        ];
        for (a, b) in pairs {
            let split = payout_for(a, r, 9).unwrap().minor() + payout_for(b, r, 9).unwrap().minor();
            let joined = payout_for(a + b, r, 9).unwrap().minor();
            assert_eq!(split, joined, "a={a} b={b}");
        }
    }

    #[test]
    fn payout_is_linear_within_one_minor_unit_for_fractional_rates() {
        let r = rate(dec!(0.333333333));
        for (a, b) in [(1_u64, 1_u64), (10, 20), (999_999_999, 3), (7, 5)] {
            let split = payout_for(a, r, 9).unwrap().minor() + payout_for(b, r, 9).unwrap().minor();
            let joined = payout_for(a + b, r, 9).unwrap().minor();
            assert!(joined >= split && joined - split <= 1, "a={a} b={b}");
        }
    }

    #[test]
    fn to_minor_units_rejects_negative() {
        assert!(to_minor_units(dec!(-0.1), 9).is_err());
        assert_eq!(to_minor_units(dec!(0), 9).unwrap().minor(), 0);
    }

    #[test]
    fn huge_amounts_overflow_cleanly() {
        let result = payout_for(u64::MAX, rate(Decimal::MAX), 9);
        assert!(matches!(result, Err(Error::Payout(_))));
    }
}
