//! # Domain Types
//!
//! Core domain types for the table/cash coordination subsystem.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   DiningTable   │   │      Order      │   │   CashSession   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  number         │◄──│  table_id (FK)  │   │  restaurant_id  │       │
//! │  │  state          │   │  total_cents    │   │  status         │       │
//! │  │  active_order   │   │  status         │   │  initial_amount │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ referenced by        │ owns           │
//! │                        ┌────────▼────────┐   ┌────────▼────────┐       │
//! │                        │ CashTransaction │   │     Expense     │       │
//! │                        │  order_id UNIQUE│   │  concept/amount │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! - A `CashSession` owns its transactions and expenses for its lifetime.
//! - A `DiningTable` owns at most one open `Order`.
//! - An `Order` is *referenced*, never owned, by its `CashTransaction`.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (table `number` per restaurant)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::table::TableState;

// =============================================================================
// Dining Table
// =============================================================================

/// A physical table on the restaurant floor.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiningTable {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Restaurant this table belongs to.
    pub restaurant_id: String,

    /// Table number - business identifier, unique per restaurant.
    pub number: i64,

    /// Optional display name ("Window booth").
    pub name: Option<String>,

    /// Optional zone ("terrace", "bar").
    pub zone: Option<String>,

    /// Seats. Always positive.
    pub capacity: i64,

    /// Current occupancy state (state machine in [`crate::table`]).
    pub state: TableState,

    /// Free-text staff notes.
    pub notes: Option<String>,

    /// The open order currently attached to this table, if any.
    ///
    /// ## Invariant
    /// `active_order_id` is `Some` if and only if `state` is an occupancy
    /// state (`occupied`, `in_kitchen`, `served`, `awaiting_payment`).
    pub active_order_id: Option<String>,

    /// Who the table is held for while `reserved`.
    pub reservation_name: Option<String>,

    /// Contact phone for the reservation.
    pub reservation_phone: Option<String>,

    /// When the party is expected.
    #[ts(as = "Option<String>")]
    pub reservation_time: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl DiningTable {
    /// Checks the active-order ⇔ occupancy-state invariant.
    ///
    /// Storage guards keep this true; the check exists for tests and
    /// debug assertions at the boundary.
    pub fn occupancy_consistent(&self) -> bool {
        self.state.requires_active_order() == self.active_order_id.is_some()
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order is live: owned by its table, items may still change.
    Open,
    /// Order has been paid. Ownership transferred to the transaction record.
    Paid,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Open
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order attached to a table (or a non-table channel, out of scope here).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub restaurant_id: String,
    /// Nullable: non-table orders carry no table reference.
    pub table_id: Option<String>,
    pub status: OrderStatus,
    /// Derived: always Σ line totals, never independently editable.
    pub total_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item on an order.
/// Uses snapshot pattern to freeze product data at order time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// Reference into the (out-of-scope) catalog.
    pub product_ref: String,
    /// Product name at order time (frozen).
    pub name_snapshot: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price in minor units at order time (frozen).
    pub unit_price_cents: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    /// Free-text kitchen notes ("no onions").
    pub notes: Option<String>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// Cash session lifecycle state. One-way: a closed session never reopens;
/// opening the register again means a new session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

// =============================================================================
// Cash Session
// =============================================================================

/// A bounded period during which one cashier's register is open.
///
/// ## The Central Invariant
/// For a given `restaurant_id`, at most one session may have
/// `status = open` at any instant. Enforced by a unique partial index at
/// the storage layer, not just application logic - two concurrent
/// `open_session` calls resolve there, never in memory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub restaurant_id: String,
    pub cashier_id: String,
    pub status: SessionStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Opening float in minor units, >= 0.
    pub initial_amount_cents: i64,
    pub opening_notes: Option<String>,
    pub closing_notes: Option<String>,
    /// Cash physically counted at close, when a count was supplied.
    pub physical_count_cents: Option<i64>,
    /// Expected cash at close: initial + Σcash transactions − Σexpenses.
    pub theoretical_cents: Option<i64>,
    /// physical − theoretical. Negative is a shortage.
    pub difference_cents: Option<i64>,
}

impl CashSession {
    /// Returns the opening float as Money.
    #[inline]
    pub fn initial_amount(&self) -> Money {
        Money::from_cents(self.initial_amount_cents)
    }

    /// Whether the session still accepts transactions and expenses.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash. Participates in drawer reconciliation.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Wallet / QR / transfer.
    Digital,
}

impl PaymentMethod {
    /// Only cash moves physical money through the drawer.
    #[inline]
    pub fn affects_drawer(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Cash Transaction
// =============================================================================

/// A payment record. Immutable once created; exactly one per paid order.
///
/// ## Idempotency
/// `order_id` is UNIQUE in storage. Re-processing a payment for an order
/// that already has a transaction returns the existing record instead of
/// double-charging.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub cash_session_id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub total_cents: i64,
    /// Cash only: what the customer handed over.
    pub received_cents: Option<i64>,
    /// Cash only: received − total, always >= 0.
    pub change_cents: Option<i64>,
    pub cashier_id: String,
    #[ts(as = "String")]
    pub processed_at: DateTime<Utc>,
}

impl CashTransaction {
    /// Returns the charged amount as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Expense Category
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Supplier,
    Utilities,
    Supplies,
    Other,
}

// =============================================================================
// Expense
// =============================================================================

/// Cash taken out of the drawer during a session. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub cash_session_id: String,
    /// What the money was spent on. At least 3 characters.
    pub concept: String,
    /// Strictly positive, minor units.
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    pub cashier_id: String,
    #[ts(as = "String")]
    pub registered_at: DateTime<Utc>,
}

impl Expense {
    /// Returns the expense amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Session Summary
// =============================================================================

/// Aggregated money movement for a session. Feeds reconciliation and the
/// end-of-day report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSummary {
    pub transaction_count: i64,
    pub cash_total_cents: i64,
    pub card_total_cents: i64,
    pub digital_total_cents: i64,
    pub expense_total_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn table(state: TableState, order: Option<&str>) -> DiningTable {
        DiningTable {
            id: "t-1".into(),
            restaurant_id: "r-1".into(),
            number: 5,
            name: None,
            zone: None,
            capacity: 4,
            state,
            notes: None,
            active_order_id: order.map(String::from),
            reservation_name: None,
            reservation_phone: None,
            reservation_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_occupancy_invariant() {
        assert!(table(TableState::Free, None).occupancy_consistent());
        assert!(table(TableState::Occupied, Some("o-1")).occupancy_consistent());
        assert!(table(TableState::Served, Some("o-1")).occupancy_consistent());

        // Violations in both directions
        assert!(!table(TableState::Free, Some("o-1")).occupancy_consistent());
        assert!(!table(TableState::AwaitingPayment, None).occupancy_consistent());
    }

    #[test]
    fn test_only_cash_affects_drawer() {
        assert!(PaymentMethod::Cash.affects_drawer());
        assert!(!PaymentMethod::Card.affects_drawer());
        assert!(!PaymentMethod::Digital.affects_drawer());
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Open);
    }
}
