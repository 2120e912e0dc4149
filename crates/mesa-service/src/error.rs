//! # Service Error
//!
//! The error shape callers actually see: a stable code plus presentation
//! hints. Terminals switch on `code`, show `message`, and pick UI
//! treatment from `severity`/`retryable`.
//!
//! ## Conversion Paths
//! ```text
//! DomainError ──────────────────┐
//! ValidationError → DomainError ├──► ServiceError
//! DbError → DomainError ────────┘
//! ```
//!
//! The DbError path re-types storage failures: a unique violation on
//! `cash_sessions` *is* SESSION_ALREADY_OPEN, a unique violation on
//! `transactions` *is* ORDER_ALREADY_PAID. Everything else falls through
//! [`DomainError::classify`].

use serde::Serialize;
use thiserror::Error;

use mesa_core::{DomainError, Severity, ValidationError};
use mesa_db::DbError;

/// Error surface returned by every service operation.
#[derive(Debug, Error, Serialize)]
#[error("{code}: {message}")]
pub struct ServiceError {
    /// Stable machine-readable code (e.g., `SESSION_ALREADY_OPEN`).
    pub code: &'static str,
    /// Human-readable description. Wording may change; the code never does.
    pub message: String,
    pub severity: Severity,
    /// Suggested next step for the operator, when one exists.
    pub suggested_action: Option<&'static str>,
    /// Whether an identical retry is safe (no partial mutation occurred).
    pub retryable: bool,
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        ServiceError {
            code: err.code(),
            message: err.to_string(),
            severity: err.severity(),
            suggested_action: err.suggested_action(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        let domain = match &err {
            DbError::UniqueViolation { .. } if err.is_unique_violation_on("cash_sessions") => {
                DomainError::SessionAlreadyOpen {
                    restaurant_id: "unknown".to_string(),
                }
            }
            DbError::UniqueViolation { .. } if err.is_unique_violation_on("transactions") => {
                DomainError::OrderAlreadyPaid {
                    order_id: "unknown".to_string(),
                }
            }
            DbError::ConnectionFailed(msg) => DomainError::ConnectionFailed(msg.clone()),
            DbError::PoolExhausted => {
                DomainError::ConnectionFailed("connection pool exhausted".to_string())
            }
            other => DomainError::classify(&other.to_string()),
        };
        domain.into()
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================
