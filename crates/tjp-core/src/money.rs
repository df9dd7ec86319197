//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In JavaScript/floating point:                                      │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  The reference app stored totalAmount as a JS Number and also       │
//! │  recomputed it client-side - two copies, both floats.               │
//! │                                                                     │
//! │  OUR SOLUTION: Integer Paise                                        │
//! │    ₹50.00 = 5000 paise, one representation everywhere               │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tjp_core::money::Money;
//!
//! // Create from paise or whole rupees (never from floats!)
//! let price = Money::from_rupees(50);           // ₹50.00
//! let total = price.multiply_quantity(12);      // ₹600.00
//! assert_eq!(total.paise(), 60_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in paise (the smallest INR unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for corrections and deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// Every monetary value in the ledger flows through this type:
/// `pricePerUnit`, `totalAmount`, outstanding balances, report totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tjp_core::money::Money;
    ///
    /// let price = Money::from_paise(5000); // Represents ₹50.00
    /// assert_eq!(price.paise(), 5000);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// The farm prices everything in whole rupees; this is the common
    /// constructor on the input path.
    ///
    /// ## Example
    /// ```rust
    /// use tjp_core::money::Money;
    ///
    /// let price = Money::from_rupees(75);
    /// assert_eq!(price.paise(), 7500);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise (smallest currency unit).
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    ///
    /// ## Example
    /// ```rust
    /// use tjp_core::money::Money;
    ///
    /// let price = Money::from_paise(5099);
    /// assert_eq!(price.rupees(), 50);
    /// ```
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// This IS the `totalAmount` invariant:
    /// `totalAmount == pricePerUnit.multiply_quantity(quantity)`,
    /// recomputed server-side on every create/edit, never trusted from
    /// the caller.
    ///
    /// ## Example
    /// ```rust
    /// use tjp_core::money::Money;
    ///
    /// let price_per_pocket = Money::from_rupees(50);
    /// let total = price_per_pocket.multiply_quantity(12);
    /// assert_eq!(total, Money::from_rupees(600));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money as rupees.
///
/// For debugging and bill text. UI localization is out of scope.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        if self.paise_part() == 0 {
            write!(f, "{}₹{}", sign, self.rupees().abs())
        } else {
            write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
        }
    }
}

/// Default money is zero.
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

/// Multiplication by integer (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summing an iterator of Money (report totals, outstanding balances).
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(5099);
        assert_eq!(money.paise(), 5099);
        assert_eq!(money.rupees(), 50);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_from_rupees() {
        assert_eq!(Money::from_rupees(50).paise(), 5000);
        assert_eq!(Money::from_rupees(-5).paise(), -500);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_rupees(600)), "₹600");
        assert_eq!(format!("{}", Money::from_paise(5099)), "₹50.99");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(format!("{}", Money::zero()), "₹0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupees(100);
        let b = Money::from_rupees(25);

        assert_eq!((a + b).rupees(), 125);
        assert_eq!((a - b).rupees(), 75);
        assert_eq!((a * 3).rupees(), 300);

        let mut acc = Money::zero();
        acc += a;
        acc -= b;
        assert_eq!(acc.rupees(), 75);
    }

    #[test]
    fn test_multiply_quantity_is_total_amount() {
        // Sale(Mushroom, qty=12, price=₹50) → totalAmount=₹600
        let total = Money::from_rupees(50).multiply_quantity(12);
        assert_eq!(total, Money::from_rupees(600));
    }

    #[test]
    fn test_sum() {
        let balances = [
            Money::from_rupees(50),
            Money::from_rupees(75),
            Money::from_rupees(100),
        ];
        let total: Money = balances.into_iter().sum();
        assert_eq!(total, Money::from_rupees(225));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_paise(100).is_positive());
        assert!(Money::from_paise(-100).is_negative());
        assert_eq!(Money::from_paise(-100).abs().paise(), 100);
    }
}
