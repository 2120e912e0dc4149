//! # mesa-core: Pure Business Logic for Mesa POS
//!
//! This crate is the **heart** of the table/cash coordination core. It
//! contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mesa POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Staff Devices (terminals)                      │   │
//! │  │    Floor plan ──► Order entry ──► Register ──► Close of day    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ RPC-style calls                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  mesa-service (operation surface)               │   │
//! │  │    open_session, create_order, process_payment, close_session  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ mesa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌───────────┐ ┌───────┐ │   │
//! │  │  │  types  │ │  money  │ │  table   │ │permissions│ │ recon │ │   │
//! │  │  │ Session │ │  Money  │ │ legality │ │  guard    │ │ cash  │ │   │
//! │  │  └─────────┘ └─────────┘ └──────────┘ └───────────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mesa-db (Storage Layer)                      │   │
//! │  │        SQLite queries, migrations, transactional boundaries     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (DiningTable, Order, CashSession, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`table`] - Table state machine and transition legality
//! - [`permissions`] - Action → allowed-roles guard
//! - [`reconciliation`] - Theoretical-cash vs physical-count arithmetic
//! - [`error`] - Domain error taxonomy with stable codes
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in minor units (i64), no floats
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod permissions;
pub mod reconciliation;
pub mod table;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mesa_core::Money` instead of
// `use mesa_core::money::Money`

pub use error::{DomainError, Severity, ValidationError};
pub use money::Money;
pub use permissions::{allowed, Action, Role, RoleLookupPolicy};
pub use reconciliation::{reconcile, Reconciliation, ReconciliationOutcome};
pub use table::TableState;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum opening float for a cash session, in minor units.
///
/// ## Business Reason
/// The register UI historically capped the opening amount at 10,000,000
/// major units; anything above that is a typo, not a float. Enforced as
/// `AMOUNT_OUT_OF_RANGE` before any session row is created.
pub const MAX_SESSION_INITIAL_CENTS: i64 = 1_000_000_000;

/// Minimum length of an expense concept, in characters.
///
/// ## Business Reason
/// One- and two-letter concepts ("x", "ok") are useless at reconciliation
/// time. Three characters is the floor the back office agreed to.
pub const MIN_EXPENSE_CONCEPT_LEN: usize = 3;

/// Maximum quantity of a single line item on an order.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
/// Configurable per-restaurant in future versions.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum line items on a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum unit price for a line item, in minor units.
///
/// ## Business Reason
/// Nothing on a menu costs a million major units; a price above this is a
/// typo. The cap also keeps `unit_price × quantity` (and the sum over
/// `MAX_ORDER_ITEMS` lines) far inside i64 range.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;
