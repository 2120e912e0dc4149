//! # Table State Machine
//!
//! Occupancy states for a physical table and the legal transitions
//! between them. This module is the single source of transition legality;
//! repositories and the service layer call into it before mutating.
//!
//! ## The State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                  ┌──────────┐                                           │
//! │      ┌──────────►│ reserved │──────────┐                                │
//! │      │           └────┬─────┘          │ (walk-in seated)               │
//! │      │ release        │                ▼                                │
//! │  ┌───┴──┐             │          ┌──────────┐                           │
//! │  │ free │◄────────────┴──────────│ occupied │◄──┐                       │
//! │  └─┬──┬─┘   (order removed       └────┬─────┘   │                       │
//! │    │  │      or paid)                 │         │  occupancy states     │
//! │    │  │                               ▼         │  move freely among    │
//! │    │  │                        ┌────────────┐   │  each other           │
//! │    │  └──► inactive ──────────►│ in_kitchen │◄──┤                       │
//! │    │         │    (reactivate) └────┬───────┘   │                       │
//! │    │         ▼                      ▼           │                       │
//! │    └──► maintenance          ┌────────────┐     │                       │
//! │              │               │   served   │◄────┤                       │
//! │              ▼ (reactivate)  └────┬───────┘     │                       │
//! │            free                   ▼             │                       │
//! │                        ┌──────────────────┐     │                       │
//! │                        │ awaiting_payment │─────┘                       │
//! │                        └──────────────────┘                             │
//! │                                                                         │
//! │  Everything not drawn here is ILLEGAL and rejected with                 │
//! │  INVALID_TRANSITION (e.g., inactive → occupied).                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::DomainError;

// =============================================================================
// Table State
// =============================================================================

/// Occupancy state of a dining table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    /// Initial state. No order, no reservation.
    Free,
    /// Seated, order open.
    Occupied,
    /// Order sent to the kitchen.
    InKitchen,
    /// Food delivered to the table.
    Served,
    /// Check requested, waiting on the register.
    AwaitingPayment,
    /// Held for a reservation.
    Reserved,
    /// Taken off the floor (soft lifecycle, never hard-deleted).
    Inactive,
    /// Out for repair/cleaning.
    Maintenance,
}

/// States a table moves among while it has an active order.
pub const OCCUPANCY_STATES: [TableState; 4] = [
    TableState::Occupied,
    TableState::InKitchen,
    TableState::Served,
    TableState::AwaitingPayment,
];

impl TableState {
    /// Stable lowercase name, matching storage and the wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableState::Free => "free",
            TableState::Occupied => "occupied",
            TableState::InKitchen => "in_kitchen",
            TableState::Served => "served",
            TableState::AwaitingPayment => "awaiting_payment",
            TableState::Reserved => "reserved",
            TableState::Inactive => "inactive",
            TableState::Maintenance => "maintenance",
        }
    }

    /// Whether a table in this state must have an active order attached.
    ///
    /// This is one half of the core invariant:
    /// `active_order != null ⇔ state ∈ occupancy states`.
    #[inline]
    pub fn requires_active_order(&self) -> bool {
        matches!(
            self,
            TableState::Occupied
                | TableState::InKitchen
                | TableState::Served
                | TableState::AwaitingPayment
        )
    }

    /// Whether a new order may be created on a table in this state.
    #[inline]
    pub fn is_seatable(&self) -> bool {
        matches!(self, TableState::Free | TableState::Reserved)
    }

    /// Legal transition table.
    ///
    /// ## Rules
    /// - `free` → `occupied` (order created), `reserved`, `inactive`, `maintenance`
    /// - occupancy states → each other, and → `free` (order removed or paid)
    /// - `reserved` → `occupied` (seated), `free` (released)
    /// - `inactive`/`maintenance` → `free` (reactivated)
    /// - everything else is illegal
    pub fn can_transition_to(&self, to: TableState) -> bool {
        use TableState::*;

        if *self == to {
            // Self-loops are not transitions
            return false;
        }

        match self {
            Free => matches!(to, Occupied | Reserved | Inactive | Maintenance),
            Occupied | InKitchen | Served | AwaitingPayment => {
                to == Free || to.requires_active_order()
            }
            Reserved => matches!(to, Occupied | Free),
            Inactive | Maintenance => to == Free,
        }
    }

    /// Validates a transition, producing the domain error on an illegal edge.
    pub fn assert_transition(&self, to: TableState) -> Result<(), DomainError> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for TableState {
    fn default() -> Self {
        TableState::Free
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
