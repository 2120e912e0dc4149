//! # Domain Events
//!
//! Post-commit notifications over a tokio broadcast channel.
//!
//! ## Delivery Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Events are emitted AFTER the storage transaction commits.             │
//! │                                                                         │
//! │  • At-most-once, in-process. A lagging subscriber loses the oldest     │
//! │    events (broadcast semantics), it never blocks the register.        │
//! │  • Events are hints to refresh, not a source of truth. Terminals      │
//! │    re-read state; they do not fold events.                             │
//! │  • An operation whose event cannot be delivered is still a SUCCESS:   │
//! │    the commit already happened.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use mesa_core::{CashSession, CashTransaction, DiningTable, Expense, TableState};

/// Default broadcast buffer. Sized for a floor's worth of terminals
/// refreshing, not for event sourcing.
const DEFAULT_CAPACITY: usize = 256;

/// Something that changed, post-commit.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A table changed state (seated, progressed, freed, reserved...).
    TableChanged {
        table: DiningTable,
        previous_state: TableState,
    },
    /// A cash session opened.
    SessionOpened { session: CashSession },
    /// A cash session closed, reconciliation attached.
    SessionClosed { session: CashSession },
    /// A payment was recorded (order paid, table freed if it had one).
    PaymentProcessed { transaction: CashTransaction },
    /// An expense was registered against the open session.
    ExpenseRegistered { expense: Expense },
}

impl DomainEvent {
    /// Stable event name for logs and subscribers.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TableChanged { .. } => "table_changed",
            DomainEvent::SessionOpened { .. } => "session_opened",
            DomainEvent::SessionClosed { .. } => "session_closed",
            DomainEvent::PaymentProcessed { .. } => "payment_processed",
            DomainEvent::ExpenseRegistered { .. } => "expense_registered",
        }
    }
}

/// Broadcast fan-out for domain events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Creates an event bus with the default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an event bus with a specific buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus { sender }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Infallible by contract: with no subscribers the
    /// event is simply dropped, and the originating operation already
    /// committed either way.
    pub fn publish(&self, event: DomainEvent) {
        debug!(event = event.name(), "Publishing domain event");
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers (diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
