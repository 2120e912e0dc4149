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
//! │  At a cash register that error is not academic: change is counted      │
//! │  out of a physical drawer and the drawer is reconciled at close.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    received 20000 − total 18000 = change 2000, exactly                 │
//! │    Reconciliation diffs are exact integers with an exact sign          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mesa_core::money::Money;
//!
//! // Create from minor units (the only way in)
//! let total = Money::from_cents(18000);
//! let received = Money::from_cents(20000);
//!
//! // Change is exact integer arithmetic
//! let change = Money::change_due(received, total).unwrap();
//! assert_eq!(change.cents(), 2000);
//!
//! // NEVER do this:
//! // let bad = Money::from_float(180.0); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::DomainError;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (minor units).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for reconciliation shortages
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// OrderItem.unit_price × quantity ──► line_total ──► Order.total
///                                                        │
/// CashSession.initial_amount ──┐                         ▼
///                              ├──► theoretical cash ◄── Transaction.total
/// Expense.amount ──────────────┘          │
///                                         ▼
///                        physical count − theoretical = diff
/// ```
/// Every monetary value in the system flows through this type. Formatting
/// into a display currency ("$12.345") is the presentation layer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    ///
    /// ## Why Minor Units?
    /// Using the smallest unit eliminates all floating-point concerns.
    /// The database, calculations, and API all use minor units. Only the
    /// UI converts to major units for display.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (e.g., whole pesos or dollars).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99, absolute value).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
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

    /// Multiplies money by a quantity (line totals).
    ///
    /// Saturating: validation caps unit price and quantity well inside
    /// i64 range, and an out-of-contract caller pins at the extremes
    /// instead of wrapping.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(4500);
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 13500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Computes the change owed for a cash tender.
    ///
    /// ## The Arithmetic Law
    /// `change = received − total`, and `change >= 0` for every accepted
    /// cash payment. A tender below the order total is rejected with
    /// `INSUFFICIENT_AMOUNT` before any transaction record exists.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let change = Money::change_due(Money::from_cents(20000), Money::from_cents(18000));
    /// assert_eq!(change.unwrap().cents(), 2000);
    ///
    /// let short = Money::change_due(Money::from_cents(10000), Money::from_cents(18000));
    /// assert!(short.is_err());
    /// ```
    pub fn change_due(received: Money, total: Money) -> Result<Money, DomainError> {
        if received < total {
            return Err(DomainError::InsufficientAmount {
                received_cents: received.cents(),
                total_cents: total.cents(),
            });
        }
        Ok(received - total)
    }

    /// Sums an iterator of Money values.
    pub fn sum<I: IntoIterator<Item = Money>>(iter: I) -> Money {
        iter.into_iter().fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. Use frontend formatting for actual UI
/// display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_change_due_exact_tender() {
        let change = Money::change_due(Money::from_cents(18000), Money::from_cents(18000));
        assert_eq!(change.unwrap().cents(), 0);
    }

    #[test]
    fn test_change_due_overpayment() {
        // Scenario: total 18000, received 20000 → change 2000
        let change = Money::change_due(Money::from_cents(20000), Money::from_cents(18000));
        assert_eq!(change.unwrap().cents(), 2000);
    }

    #[test]
    fn test_change_due_insufficient() {
        let err = Money::change_due(Money::from_cents(17999), Money::from_cents(18000))
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_AMOUNT");
    }

    #[test]
    fn test_sum() {
        let total = Money::sum([
            Money::from_cents(100),
            Money::from_cents(250),
            Money::from_cents(-50),
        ]);
        assert_eq!(total.cents(), 300);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(positive.is_positive());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        let line_total = unit_price.multiply_quantity(3);
        assert_eq!(line_total.cents(), 897);
    }

    #[test]
    fn test_multiply_quantity_saturates() {
        let huge = Money::from_cents(i64::MAX);
        assert_eq!(huge.multiply_quantity(2).cents(), i64::MAX);
        assert_eq!(huge.multiply_quantity(-2).cents(), i64::MIN);
    }
}
