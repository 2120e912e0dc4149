//! # mesa-service: Operation Surface for Mesa POS
//!
//! The layer terminals call. Every operation follows the same shape:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Operation Pipeline                                │
//! │                                                                         │
//! │   authorize ──► validate ──► mutate ──► emit                            │
//! │   (roles +      (mesa-core   (mesa-db,   (EventBus,                     │
//! │    policy)       rules)       atomic)     post-commit)                  │
//! │                                                                         │
//! │  Failures short-circuit left to right: a denied caller never reaches   │
//! │  validation, invalid input never reaches storage, and an event is      │
//! │  only ever emitted for a committed mutation.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//! - Sessions: [`PosService::open_session`], [`PosService::close_session`]
//! - Payments: [`PosService::process_payment`]
//! - Expenses: [`PosService::register_expense`]
//! - Tables:   [`PosService::create_table`], [`PosService::create_order`],
//!   [`PosService::advance_order_state`], [`PosService::remove_order`],
//!   [`PosService::reserve_table`], [`PosService::release_reservation`],
//!   [`PosService::deactivate_table`], [`PosService::reactivate_table`]

use std::sync::Arc;

use tracing::warn;

use mesa_core::{allowed, Action, DomainError, RoleLookupPolicy};
use mesa_db::Database;

pub mod error;
pub mod events;
pub mod expenses;
pub mod payments;
pub mod roles;
pub mod sessions;
pub mod tables;

pub use error::{ServiceError, ServiceResult};
pub use events::{DomainEvent, EventBus};
pub use payments::{parse_payment_method, PaymentOutcome, PaymentRequest};
pub use roles::{RoleLookupError, RoleProvider, StaticRoleProvider};
pub use sessions::ClosedSession;
pub use tables::OrderItemInput;

/// The table/cash operation surface.
///
/// Cheap to clone; all fields are handles.
#[derive(Clone)]
pub struct PosService {
    db: Database,
    roles: Arc<dyn RoleProvider>,
    events: EventBus,
    role_policy: RoleLookupPolicy,
}

impl PosService {
    /// Creates a service with the default role-lookup policy.
    pub fn new(db: Database, roles: Arc<dyn RoleProvider>) -> Self {
        PosService {
            db,
            roles,
            events: EventBus::new(),
            role_policy: RoleLookupPolicy::default(),
        }
    }

    /// Overrides the role-lookup failure policy.
    pub fn with_role_policy(mut self, policy: RoleLookupPolicy) -> Self {
        self.role_policy = policy;
        self
    }

    /// Subscribes to domain events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// The event bus (for wiring external forwarders).
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Permission gate run at the top of every operation.
    ///
    /// ## Policy
    /// - Roles resolved, action allowed → proceed
    /// - Roles resolved, action not allowed → `PERMISSION_DENIED`
    /// - Credential expired → `SESSION_EXPIRED`, under either policy
    /// - Provider unavailable → the configured [`RoleLookupPolicy`] decides
    pub(crate) async fn authorize(&self, staff_id: &str, action: Action) -> ServiceResult<()> {
        match self.roles.active_roles(staff_id).await {
            Ok(active) => {
                if allowed(action, &active) {
                    Ok(())
                } else {
                    Err(DomainError::PermissionDenied {
                        action: action.as_str().to_string(),
                    }
                    .into())
                }
            }
            Err(RoleLookupError::CredentialExpired) => Err(DomainError::SessionExpired.into()),
            Err(RoleLookupError::Unavailable(reason)) => match self.role_policy {
                RoleLookupPolicy::FailOpen => {
                    warn!(
                        staff_id = %staff_id,
                        action = %action,
                        reason = %reason,
                        "Role provider unavailable, proceeding (fail-open policy)"
                    );
                    Ok(())
                }
                RoleLookupPolicy::FailClosed => Err(DomainError::PermissionDenied {
                    action: action.as_str().to_string(),
                }
                .into()),
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
