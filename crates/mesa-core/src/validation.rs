//! # Validation Module
//!
//! Input validation for the table/cash core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal UI                                                  │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Operation surface (mesa-service)                             │
//! │  └── THIS MODULE: Business rule validation, BEFORE any mutation        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (capacity > 0, amount > 0)                      │
//! │  ├── UNIQUE constraints (open session slot, order_id on transactions)  │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: validation errors are raised synchronously and      │
//! │  never retried automatically.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{DomainError, ValidationError};
use crate::{
    MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS, MAX_SESSION_INITIAL_CENTS, MAX_UNIT_PRICE_CENTS,
    MIN_EXPENSE_CONCEPT_LEN,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Money Validators
// =============================================================================

/// Validates a session opening float.
///
/// ## Rules
/// - Must be in `[0, MAX_SESSION_INITIAL_CENTS]`
/// - Zero is allowed (opening an empty drawer)
///
/// Returns the taxonomy error directly: callers surface this as the
/// stable `AMOUNT_OUT_OF_RANGE` code, not a generic validation failure.
pub fn validate_initial_amount(cents: i64) -> Result<(), DomainError> {
    if !(0..=MAX_SESSION_INITIAL_CENTS).contains(&cents) {
        return Err(DomainError::AmountOutOfRange {
            amount_cents: cents,
            max_cents: MAX_SESSION_INITIAL_CENTS,
        });
    }
    Ok(())
}

/// Validates an expense amount.
///
/// ## Rules
/// - Must be strictly positive; you cannot take zero or negative cash
///   out of the drawer
pub fn validate_expense_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price in minor units. Zero is allowed (comped items).
///
/// The upper bound also keeps line-total multiplication inside i64 range.
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an expense concept.
///
/// ## Rules
/// - Required, at least `MIN_EXPENSE_CONCEPT_LEN` characters after trim
/// - At most 200 characters
pub fn validate_expense_concept(concept: &str) -> ValidationResult<()> {
    let concept = concept.trim();

    if concept.is_empty() {
        return Err(ValidationError::Required {
            field: "concept".to_string(),
        });
    }
    if concept.chars().count() < MIN_EXPENSE_CONCEPT_LEN {
        return Err(ValidationError::TooShort {
            field: "concept".to_string(),
            min: MIN_EXPENSE_CONCEPT_LEN,
        });
    }
    if concept.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "concept".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Validates a reservation customer name. Required, non-empty.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer_name".to_string(),
        });
    }
    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Validates a deactivation reason. Required, non-empty.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a table capacity. Must be a positive integer.
pub fn validate_capacity(capacity: i64) -> ValidationResult<()> {
    if capacity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "capacity".to_string(),
        });
    }
    Ok(())
}

/// Validates order item count (non-empty, bounded).
pub fn validate_order_size(item_count: usize) -> ValidationResult<()> {
    if item_count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if item_count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
