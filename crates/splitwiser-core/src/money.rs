//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  Splitting 100.00 three ways with floats:                               │
//! │    33.333… × 3 → rounding decides who pays the lost cent, randomly      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10000 cents / 3 = 3333 cents, 1 cent left over                       │
//! │    The allocator hands that cent out explicitly                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts only become floats at the edges: when a typed amount is parsed
//! (`from_decimal`) and when a percentage is applied (`percentage`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::config::NumberFormat;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: balances are negative for debtors
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **No currency**: every document is single-currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use splitwiser_core::money::Money;
    ///
    /// let share = Money::from_cents(5259);
    /// assert_eq!(share.to_string(), "52.59");
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a parsed decimal amount to cents, rounding to the nearest cent.
    ///
    /// Returns `None` for NaN, infinities and values outside the i64 cent range.
    ///
    /// ## Example
    /// ```rust
    /// use splitwiser_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(174.38).unwrap().cents(), 17438);
    /// assert_eq!(Money::from_decimal(0.125).unwrap().cents(), 13);
    /// assert!(Money::from_decimal(f64::NAN).is_none());
    /// ```
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checked addition, `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Applies a percentage and rounds half away from zero to whole cents.
    ///
    /// Returns `None` when the result does not fit in the cent range.
    ///
    /// ## Example
    /// ```rust
    /// use splitwiser_core::money::Money;
    ///
    /// let owed = Money::from_cents(10000);
    /// assert_eq!(owed.percentage(15.0).unwrap().cents(), 1500);
    /// assert_eq!(Money::from_cents(3333).percentage(10.0).unwrap().cents(), 333);
    /// ```
    pub fn percentage(&self, percent: f64) -> Option<Money> {
        let fee = (self.0 as f64 * percent / 100.0).round();
        if fee.is_finite() && fee.abs() < i64::MAX as f64 {
            Some(Money(fee as i64))
        } else {
            None
        }
    }

    /// Formats the amount with the given separators and two decimals.
    ///
    /// ## Example
    /// ```rust
    /// use splitwiser_core::config::NumberFormat;
    /// use splitwiser_core::money::Money;
    ///
    /// let amount = Money::from_cents(123456);
    /// assert_eq!(amount.format(&NumberFormat::default()), "1,234.56");
    /// assert_eq!(amount.format(&NumberFormat::european()), "1.234,56");
    /// ```
    pub fn format(&self, format: &NumberFormat) -> String {
        let digits = self.units().abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                if let Some(sep) = format.thousands_separator {
                    grouped.push(sep);
                }
            }
            grouped.push(c);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        format!(
            "{}{}{}{:02}",
            sign,
            grouped,
            format.decimal_separator,
            self.cents_part()
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain `units.cents` rendering, no grouping.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_decimal_rounds_to_cents() {
        assert_eq!(Money::from_decimal(35.98).unwrap().cents(), 3598);
        assert_eq!(Money::from_decimal(1234.56).unwrap().cents(), 123456);
        assert_eq!(Money::from_decimal(0.0).unwrap().cents(), 0);
        assert!(Money::from_decimal(f64::INFINITY).is_none());
        assert!(Money::from_decimal(1e30).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(-5)), "-0.05");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_format_grouping() {
        let us = NumberFormat::default();
        assert_eq!(Money::from_cents(5259).format(&us), "52.59");
        assert_eq!(Money::from_cents(100000).format(&us), "1,000.00");
        assert_eq!(Money::from_cents(123456789).format(&us), "1,234,567.89");
        assert_eq!(Money::from_cents(-123456).format(&us), "-1,234.56");

        let plain = NumberFormat {
            decimal_separator: ',',
            thousands_separator: None,
        };
        assert_eq!(Money::from_cents(123456).format(&plain), "1234,56");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);
        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
        assert!(Money::from_cents(i64::MAX).checked_add(a).is_none());
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(Money::from_cents(5000).percentage(12.0).unwrap().cents(), 600);
        // 33.33 * 12.5% = 4.16625 → 4.17
        assert_eq!(Money::from_cents(3333).percentage(12.5).unwrap().cents(), 417);
        assert_eq!(Money::zero().percentage(50.0).unwrap().cents(), 0);
    }

    #[test]
    fn test_percentage_out_of_range() {
        assert!(Money::from_cents(10000).percentage(1e20).is_none());
        assert!(Money::from_cents(i64::MAX).percentage(200.0).is_none());
        assert!(Money::from_cents(100).percentage(f64::INFINITY).is_none());
    }

    /// 100.00 / 3 loses a cent with naive division; the allocator must add it back.
    #[test]
    fn test_division_precision_loss_documented() {
        let hundred = Money::from_cents(10000);
        let one_third = Money::from_cents(10000 / 3);
        let reconstructed = one_third + one_third + one_third;
        assert_eq!((hundred - reconstructed).cents(), 1);
    }
}
