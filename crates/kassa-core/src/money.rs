//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices in the shop are whole currency units (150 for an espresso).    │
//! │                                                                         │
//! │  Every amount that flows through the engine is an i64 of units:        │
//! │    sell_price × quantity  ──►  line cost                               │
//! │    Σ line costs           ──►  cart total                              │
//! │    bonuses × BONUS_RATE   ──►  redemption discount                     │
//! │                                                                         │
//! │  No floating point anywhere, so sums always reconcile exactly.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kassa_core::money::Money;
//!
//! let price = Money::from_units(150);
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.units(), 450);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results (total minus discount) may be
///   negative and must be detectable before they reach the database
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from currency units.
    ///
    /// ## Example
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// let price = Money::from_units(150);
    /// assert_eq!(price.units(), 150);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in currency units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// let unit_price = Money::from_units(120);
    /// assert_eq!(unit_price.multiply_quantity(3).units(), 360);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Value of `points` bonus points when each point is worth `self`.
    ///
    /// ## User Workflow
    /// ```text
    /// Client redeems 4 bonuses
    ///      │
    ///      ▼
    /// BONUS_RATE.bonus_value(4) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Discount: 40
    /// ```
    #[inline]
    pub const fn bonus_value(&self, points: i64) -> Self {
        Money(self.0 * points)
    }

    /// Subtracts `other`, stopping at zero.
    ///
    /// Used where a stored total must never go negative.
    #[inline]
    pub fn saturating_sub_floor(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain integer display; formatting with a currency sign belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

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
        let money = Money::from_units(150);
        assert_eq!(money.units(), 150);
        assert_eq!(money.to_string(), "150");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(450);
        let b = Money::from_units(50);

        assert_eq!((a + b).units(), 500);
        assert_eq!((a - b).units(), 400);
        assert_eq!((b * 3).units(), 150);
    }

    #[test]
    fn test_sum_of_lines() {
        let total: Money = [150, 300, 75].into_iter().map(Money::from_units).sum();
        assert_eq!(total.units(), 525);
    }

    #[test]
    fn test_bonus_value() {
        let rate = Money::from_units(10);
        assert_eq!(rate.bonus_value(6).units(), 60);
        assert!(rate.bonus_value(0).is_zero());
    }

    #[test]
    fn test_saturating_sub_floor() {
        let sum = Money::from_units(100);
        assert_eq!(sum.saturating_sub_floor(Money::from_units(30)).units(), 70);
        assert_eq!(sum.saturating_sub_floor(Money::from_units(130)).units(), 0);
    }

    #[test]
    fn test_negative_detection() {
        let total = Money::from_units(40);
        let discount = Money::from_units(50);
        assert!((total - discount).is_negative());
    }
}
