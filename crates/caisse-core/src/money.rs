//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A 7.5% promo on 33 333 FCFA:                                          │
//! │    33333 × 0.075 = 2499.975 → which franc does the customer get?       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer base units + explicit rounding                   │
//! │    (33333 × 750 + 5000) / 10000 = 2500 FCFA                            │
//! │    Rounding happens in exactly one place, half-up                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The base currency (FCFA) has no minor unit, so one `Money` unit is one
//! franc. Nothing here assumes a particular currency beyond `Display`.
//!
//! ## Usage
//! ```rust
//! use caisse_core::money::Money;
//! use caisse_core::types::DiscountRate;
//!
//! let price = Money::from_units(12_500);
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.units(), 25_000);
//!
//! let off = line.percentage(DiscountRate::from_bps(1000)); // 10%
//! assert_eq!(off.units(), 2_500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::DiscountRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of the base currency.
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results may go negative; discount paths
///   clamp at the end
/// - **Single field tuple struct**: serialises as a bare JSON number
///
/// ## Where Money Flows
/// ```text
/// CartLineSnapshot.price ──► subtotal ──► PromoValidator (minimum purchase)
///                                    └──► DiscountCalculator ──► discount
///
/// net total ──► LoyaltyAccountant.earn_points ──► points
///           └──► CustomerLoyalty.total_spent ──► tier
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from base currency units.
    ///
    /// ```rust
    /// use caisse_core::money::Money;
    ///
    /// let price = Money::from_units(1500);
    /// assert_eq!(price.units(), 1500);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in base currency units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// Saturates at `i64::MAX` instead of wrapping.
    ///
    /// ```rust
    /// use caisse_core::money::Money;
    ///
    /// let unit_price = Money::from_units(800);
    /// assert_eq!(unit_price.multiply_quantity(3).units(), 2400);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `rate` percent of this amount, rounded half-up to a whole unit.
    ///
    /// ## Implementation
    /// Integer math on i128: `(amount * bps + 5000) / 10000`.
    /// The +5000 is the half-up rounding term (5000/10000 = 0.5).
    ///
    /// ```rust
    /// use caisse_core::money::Money;
    /// use caisse_core::types::DiscountRate;
    ///
    /// let subtotal = Money::from_units(33_333);
    /// let off = subtotal.percentage(DiscountRate::from_bps(750)); // 7.5%
    /// assert_eq!(off.units(), 2_500); // 2499.975 rounds up
    /// ```
    pub fn percentage(&self, rate: DiscountRate) -> Money {
        let scaled = (self.0 as i128 * rate.bps() as i128 + 5000).div_euclid(10000);
        Money::from_units(scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Clamps this amount into `[0, ceiling]`.
    ///
    /// A negative ceiling yields zero: the floor wins.
    #[inline]
    pub fn clamp_to(self, ceiling: Money) -> Money {
        self.min(ceiling).max(Money::zero())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount with space-separated thousands and the currency label,
/// e.g. `25 000 FCFA`. Debug/log formatting only; the front-end localises.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{} FCFA", sign, grouped)
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

/// Summing line totals into a subtotal.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units() {
        let money = Money::from_units(1099);
        assert_eq!(money.units(), 1099);
        assert!(money.is_positive());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_units(0).to_string(), "0 FCFA");
        assert_eq!(Money::from_units(950).to_string(), "950 FCFA");
        assert_eq!(Money::from_units(25_000).to_string(), "25 000 FCFA");
        assert_eq!(Money::from_units(1_500_000).to_string(), "1 500 000 FCFA");
        assert_eq!(Money::from_units(-5_500).to_string(), "-5 500 FCFA");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(1000);
        let b = Money::from_units(500);

        assert_eq!((a + b).units(), 1500);
        assert_eq!((a - b).units(), 500);
        assert_eq!((a * 3).units(), 3000);

        let mut c = a;
        c += b;
        c -= Money::from_units(200);
        assert_eq!(c.units(), 1300);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let big = Money::from_units(i64::MAX);
        assert_eq!((big + Money::from_units(1)).units(), i64::MAX);
        assert_eq!(big.multiply_quantity(2).units(), i64::MAX);
    }

    #[test]
    fn test_sum() {
        let total: Money = [1000, 800, 250].into_iter().map(Money::from_units).sum();
        assert_eq!(total.units(), 2050);
    }

    #[test]
    fn test_percentage_exact() {
        let subtotal = Money::from_units(100_000);
        assert_eq!(subtotal.percentage(DiscountRate::from_bps(1000)).units(), 10_000);
        assert_eq!(subtotal.percentage(DiscountRate::from_bps(10_000)).units(), 100_000);
        assert_eq!(subtotal.percentage(DiscountRate::zero()).units(), 0);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15 × 10% = 1.5 → 2
        assert_eq!(Money::from_units(15).percentage(DiscountRate::from_bps(1000)).units(), 2);
        // 14 × 10% = 1.4 → 1
        assert_eq!(Money::from_units(14).percentage(DiscountRate::from_bps(1000)).units(), 1);
    }

    #[test]
    fn test_clamp_to() {
        let ceiling = Money::from_units(500);
        assert_eq!(Money::from_units(800).clamp_to(ceiling).units(), 500);
        assert_eq!(Money::from_units(300).clamp_to(ceiling).units(), 300);
        assert_eq!(Money::from_units(-10).clamp_to(ceiling).units(), 0);
        assert_eq!(Money::from_units(300).clamp_to(Money::from_units(-1)).units(), 0);
    }

    #[test]
    fn test_serializes_as_bare_number() {
        let json = serde_json::to_string(&Money::from_units(2500)).unwrap();
        assert_eq!(json, "2500");
        let back: Money = serde_json::from_str("2500").unwrap();
        assert_eq!(back, Money::from_units(2500));
    }
}
