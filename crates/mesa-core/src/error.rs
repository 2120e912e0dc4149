//! # Error Types
//!
//! Domain error taxonomy for mesa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mesa-core errors (this file)                                          │
//! │  ├── DomainError      - Closed taxonomy with stable codes              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  mesa-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  mesa-service errors                                                   │
//! │  └── ServiceError     - What callers see (stable code + message)       │
//! │                                                                         │
//! │  Flow: ValidationError → DomainError → DbError → ServiceError → Caller │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every variant has a STABLE code - clients switch on codes, not text
//! 3. Errors are enum variants, never String
//! 4. Validation errors are raised before any mutation is attempted

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Severity
// =============================================================================

/// How serious a failure is from the operator's point of view.
///
/// Drives UI treatment (toast vs blocking dialog) and log level at the
/// boundary; it never changes control flow inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Expected business outcome (e.g., duplicate payment replayed).
    Info,
    /// Operator can fix it themselves (top up the tender, open the register).
    Warning,
    /// Operation failed and needs a different action.
    Error,
    /// Infrastructure failure; escalate.
    Critical,
}

// =============================================================================
// Domain Error
// =============================================================================

/// Closed domain error taxonomy.
///
/// Every failure the table/cash core can produce maps to exactly one of
/// these variants. The `code()` strings are a wire contract: they never
/// change, even if messages are reworded or localized.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Another session is already open for this restaurant.
    ///
    /// ## When This Occurs
    /// - Second cashier opens the register while a session is active
    /// - Two terminals race on `open_session`; the storage-level unique
    ///   index rejects the loser and it surfaces as this variant
    #[error("A cash session is already open for restaurant {restaurant_id}")]
    SessionAlreadyOpen { restaurant_id: String },

    /// Session id does not exist.
    #[error("Cash session not found: {id}")]
    SessionNotFound { id: String },

    /// Session exists but was already closed (sessions are one-way).
    #[error("Cash session {id} is already closed")]
    SessionAlreadyClosed { id: String },

    /// The caller's identity token expired upstream.
    #[error("Session expired, re-authentication required")]
    SessionExpired,

    /// The caller's active roles do not allow this action.
    #[error("Permission denied for action '{action}'")]
    PermissionDenied { action: String },

    /// Opening float outside the accepted range.
    #[error("Amount {amount_cents} is outside the allowed range [0, {max_cents}]")]
    AmountOutOfRange { amount_cents: i64, max_cents: i64 },

    /// Cash tender below the order total.
    #[error("Received {received_cents} is less than total {total_cents}")]
    InsufficientAmount {
        received_cents: i64,
        total_cents: i64,
    },

    /// Unrecognized payment method at the boundary.
    #[error("Invalid payment method: {method}")]
    InvalidPaymentMethod { method: String },

    /// A transaction already exists for this order.
    #[error("Order {order_id} is already paid")]
    OrderAlreadyPaid { order_id: String },

    /// Order id does not exist.
    #[error("Order not found: {id}")]
    OrderNotFound { id: String },

    /// The table state machine forbids this move.
    ///
    /// ## When This Occurs
    /// - `inactive` → `occupied` without passing through `free`
    /// - `free` → `served` with no order attached
    /// - Any edge not in the legal transition table
    #[error("Illegal table transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Table exists but is not in a seatable state.
    #[error("Table {number} is not available (state: {state})")]
    TableNotAvailable { number: i64, state: String },

    /// The operation needs an open cash session and none exists.
    #[error("No open cash session for this restaurant")]
    RequiresOpenSession,

    /// Storage or network connectivity failure. Safe to retry:
    /// no partial mutation occurred.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Generic storage fallback when nothing more specific applies.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Input validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl DomainError {
    /// Stable machine-readable code for this error.
    ///
    /// ## Contract
    /// These strings are part of the operation surface. Clients switch on
    /// them; they must never be renamed.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::SessionAlreadyOpen { .. } => "SESSION_ALREADY_OPEN",
            DomainError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            DomainError::SessionAlreadyClosed { .. } => "SESSION_ALREADY_CLOSED",
            DomainError::SessionExpired => "SESSION_EXPIRED",
            DomainError::PermissionDenied { .. } => "PERMISSION_DENIED",
            DomainError::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            DomainError::InsufficientAmount { .. } => "INSUFFICIENT_AMOUNT",
            DomainError::InvalidPaymentMethod { .. } => "INVALID_PAYMENT_METHOD",
            DomainError::OrderAlreadyPaid { .. } => "ORDER_ALREADY_PAID",
            DomainError::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            DomainError::InvalidTransition { .. } => "INVALID_TRANSITION",
            DomainError::TableNotAvailable { .. } => "TABLE_NOT_AVAILABLE",
            DomainError::RequiresOpenSession => "REQUIRES_OPEN_SESSION",
            DomainError::ConnectionFailed(_) => "CONNECTION_FAILED",
            DomainError::StorageError(_) => "STORAGE_ERROR",
            DomainError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Severity classification for UI/logging treatment.
    pub fn severity(&self) -> Severity {
        match self {
            DomainError::SessionAlreadyOpen { .. }
            | DomainError::SessionAlreadyClosed { .. }
            | DomainError::InsufficientAmount { .. }
            | DomainError::RequiresOpenSession
            | DomainError::TableNotAvailable { .. }
            | DomainError::AmountOutOfRange { .. }
            | DomainError::Validation(_) => Severity::Warning,

            DomainError::SessionExpired | DomainError::PermissionDenied { .. } => Severity::Error,

            DomainError::SessionNotFound { .. }
            | DomainError::OrderNotFound { .. }
            | DomainError::OrderAlreadyPaid { .. }
            | DomainError::InvalidPaymentMethod { .. }
            | DomainError::InvalidTransition { .. } => Severity::Error,

            DomainError::ConnectionFailed(_) | DomainError::StorageError(_) => Severity::Critical,
        }
    }

    /// Suggested next action for the operator, when one exists.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            DomainError::SessionAlreadyOpen { .. } => {
                Some("Close the current session before opening a new one")
            }
            DomainError::SessionExpired => Some("Re-authenticate and retry"),
            DomainError::InsufficientAmount { .. } => Some("Collect the remaining amount"),
            DomainError::RequiresOpenSession => Some("Open the register first"),
            DomainError::ConnectionFailed(_) => Some("Check connectivity and retry"),
            DomainError::PermissionDenied { .. } => {
                Some("Ask an administrator to perform this action")
            }
            _ => None,
        }
    }

    /// Whether the caller may retry the same invocation unchanged.
    ///
    /// Only connectivity failures qualify: no partial mutation occurred,
    /// so an identical retry is safe. Every business-rule failure requires
    /// a *different* action instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::ConnectionFailed(_))
    }

    /// Best-effort classification of a foreign failure message.
    ///
    /// ## When To Use
    /// Only at the system boundary, for failures that did NOT originate as
    /// typed domain errors (driver errors, transport errors, stringly-typed
    /// RPC failures). Typed errors never pass through here - this is a
    /// translation layer, not the primary error path.
    ///
    /// ## Pattern Table
    /// ```text
    /// "timeout" / "timed out"                  → CONNECTION_FAILED (retryable)
    /// "connection" / "network" / "unreachable" → CONNECTION_FAILED (retryable)
    /// unique violation on cash_sessions        → SESSION_ALREADY_OPEN
    /// unique violation on transactions         → ORDER_ALREADY_PAID
    /// "jwt" / "token" + "expired"              → SESSION_EXPIRED
    /// anything else                            → STORAGE_ERROR
    /// ```
    pub fn classify(message: &str) -> DomainError {
        let lower = message.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return DomainError::ConnectionFailed(message.to_string());
        }
        if lower.contains("connection")
            || lower.contains("network")
            || lower.contains("unreachable")
        {
            return DomainError::ConnectionFailed(message.to_string());
        }
        if lower.contains("unique constraint failed") {
            if lower.contains("cash_sessions") {
                return DomainError::SessionAlreadyOpen {
                    restaurant_id: "unknown".to_string(),
                };
            }
            if lower.contains("transactions") {
                return DomainError::OrderAlreadyPaid {
                    order_id: "unknown".to_string(),
                };
            }
        }
        if (lower.contains("jwt") || lower.contains("token")) && lower.contains("expired") {
            return DomainError::SessionExpired;
        }

        DomainError::StorageError(message.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet shape requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate table number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with DomainError.
pub type DomainResult<T> = Result<T, DomainError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            DomainError::SessionAlreadyOpen {
                restaurant_id: "r1".into()
            }
            .code(),
            "SESSION_ALREADY_OPEN"
        );
        assert_eq!(DomainError::RequiresOpenSession.code(), "REQUIRES_OPEN_SESSION");
        assert_eq!(
            DomainError::InsufficientAmount {
                received_cents: 100,
                total_cents: 200
            }
            .code(),
            "INSUFFICIENT_AMOUNT"
        );
        assert_eq!(
            DomainError::InvalidTransition {
                from: "inactive".into(),
                to: "occupied".into()
            }
            .code(),
            "INVALID_TRANSITION"
        );
    }

    #[test]
    fn test_only_connection_failures_retry() {
        assert!(DomainError::ConnectionFailed("boom".into()).is_retryable());
        assert!(!DomainError::RequiresOpenSession.is_retryable());
        assert!(!DomainError::StorageError("boom".into()).is_retryable());
    }

    #[test]
    fn test_classify_timeout() {
        let err = DomainError::classify("operation timed out after 30s");
        assert_eq!(err.code(), "CONNECTION_FAILED");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_unique_session() {
        let err =
            DomainError::classify("UNIQUE constraint failed: cash_sessions.restaurant_id");
        assert_eq!(err.code(), "SESSION_ALREADY_OPEN");
    }

    #[test]
    fn test_classify_unique_transaction() {
        let err = DomainError::classify("UNIQUE constraint failed: transactions.order_id");
        assert_eq!(err.code(), "ORDER_ALREADY_PAID");
    }

    #[test]
    fn test_classify_expired_token() {
        let err = DomainError::classify("JWT token expired at 2026-01-01");
        assert_eq!(err.code(), "SESSION_EXPIRED");
    }

    #[test]
    fn test_classify_fallback() {
        let err = DomainError::classify("disk I/O error");
        assert_eq!(err.code(), "STORAGE_ERROR");
        assert_eq!(err.severity(), Severity::Critical);
    }

    #[test]
    fn test_validation_converts_to_domain_error() {
        let validation_err = ValidationError::Required {
            field: "concept".to_string(),
        };
        let domain_err: DomainError = validation_err.into();
        assert_eq!(domain_err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_suggested_actions() {
        assert_eq!(
            DomainError::RequiresOpenSession.suggested_action(),
            Some("Open the register first")
        );
        assert!(DomainError::OrderNotFound { id: "x".into() }
            .suggested_action()
            .is_none());
    }
}
