//! # Reconciliation Engine
//!
//! End-of-session cash arithmetic: what *should* be in the drawer versus
//! what the staff actually counted.
//!
//! ## The Law
//! ```text
//! theoretical = initial_amount + Σ(cash transactions) − Σ(expenses)
//! diff        = physical_count − theoretical
//!
//! diff = 0  → balanced
//! diff > 0  → surplus   (more cash than expected)
//! diff < 0  → shortage  (less cash than expected)
//! ```
//!
//! The result is attached to the session's closing record. It never
//! mutates historical transactions - a shortage is recorded, not "fixed".

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Outcome
// =============================================================================

/// Sign classification of the reconciliation difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Balanced,
    Surplus,
    Shortage,
}

// =============================================================================
// Result
// =============================================================================

/// Outcome of reconciling a session against a physical count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    /// Expected cash-on-hand at close.
    pub theoretical: Money,
    /// What the staff counted.
    pub physical_count: Money,
    /// physical − theoretical.
    pub difference: Money,
    pub outcome: ReconciliationOutcome,
}

/// Computes the reconciliation for a closing session.
///
/// ## Arguments
/// * `initial_amount` - opening float
/// * `cash_transactions_total` - Σ of cash transaction totals (cash only;
///   card/digital never touch the drawer)
/// * `expenses_total` - Σ of expenses registered during the session
/// * `physical_count` - cash physically counted by staff
///
/// ## Example
/// ```rust
/// use mesa_core::money::Money;
/// use mesa_core::reconciliation::{reconcile, ReconciliationOutcome};
///
/// let r = reconcile(
///     Money::from_cents(50000),
///     Money::from_cents(18000),
///     Money::from_cents(5000),
///     Money::from_cents(62000),
/// );
/// assert_eq!(r.theoretical.cents(), 63000);
/// assert_eq!(r.difference.cents(), -1000);
/// assert_eq!(r.outcome, ReconciliationOutcome::Shortage);
/// ```
pub fn reconcile(
    initial_amount: Money,
    cash_transactions_total: Money,
    expenses_total: Money,
    physical_count: Money,
) -> Reconciliation {
    let theoretical = initial_amount + cash_transactions_total - expenses_total;
    let difference = physical_count - theoretical;

    let outcome = if difference.is_zero() {
        ReconciliationOutcome::Balanced
    } else if difference.is_positive() {
        ReconciliationOutcome::Surplus
    } else {
        ReconciliationOutcome::Shortage
    };

    Reconciliation {
        theoretical,
        physical_count,
        difference,
        outcome,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_balanced() {
        let r = reconcile(cents(50000), cents(18000), cents(0), cents(68000));
        assert_eq!(r.theoretical.cents(), 68000);
        assert_eq!(r.difference.cents(), 0);
        assert_eq!(r.outcome, ReconciliationOutcome::Balanced);
    }

    #[test]
    fn test_surplus() {
        let r = reconcile(cents(10000), cents(5000), cents(2000), cents(13500));
        assert_eq!(r.theoretical.cents(), 13000);
        assert_eq!(r.difference.cents(), 500);
        assert_eq!(r.outcome, ReconciliationOutcome::Surplus);
    }

    #[test]
    fn test_shortage() {
        // initial 50000, cash sales 18000, expenses 5000, counted 62000
        // → theoretical 63000, diff -1000, shortage
        let r = reconcile(cents(50000), cents(18000), cents(5000), cents(62000));
        assert_eq!(r.theoretical.cents(), 63000);
        assert_eq!(r.difference.cents(), -1000);
        assert_eq!(r.outcome, ReconciliationOutcome::Shortage);
    }

    #[test]
    fn test_expenses_exceeding_sales() {
        // Theoretical can dip below the float; arithmetic stays exact
        let r = reconcile(cents(10000), cents(1000), cents(6000), cents(5000));
        assert_eq!(r.theoretical.cents(), 5000);
        assert_eq!(r.outcome, ReconciliationOutcome::Balanced);
    }

    #[test]
    fn test_sign_matches_outcome_exhaustively() {
        for diff in [-2, -1, 0, 1, 2] {
            let theoretical = 1000;
            let r = reconcile(cents(theoretical), cents(0), cents(0), cents(theoretical + diff));
            match r.outcome {
                ReconciliationOutcome::Balanced => assert_eq!(r.difference.cents(), 0),
                ReconciliationOutcome::Surplus => assert!(r.difference.cents() > 0),
                ReconciliationOutcome::Shortage => assert!(r.difference.cents() < 0),
            }
        }
    }
}
