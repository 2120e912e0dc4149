//! # Payment Repository
//!
//! Database operations for payment transactions.
//!
//! ## The Payment Transaction
//! Recording a payment is three writes that must be ONE fact:
//!
//! ```text
//! BEGIN
//!   INSERT INTO transactions ...
//!     SELECT ... WHERE session open     -- UNIQUE(order_id) = idempotency,
//!                                       -- zero rows = session closed
//!   UPDATE orders SET status = 'paid'
//!     WHERE id = ? AND status = 'open'  -- guarded
//!   UPDATE tables SET state = 'free', active_order_id = NULL
//!     WHERE active_order_id = ?         -- zero rows ok (non-table order)
//! COMMIT
//! ```
//!
//! The insert is guarded on the session still being open so a handle read
//! before a concurrent close can never attach money to a closed session's
//! reconciliation record.
//!
//! A replay of the same order hits the unique index on the first statement
//! and the whole transaction unwinds; the caller then fetches the existing
//! record with [`PaymentRepository::find_by_order`] and returns it as-is.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::{CashTransaction, PaymentMethod};

/// Fields for recording a new payment. Change math is done by the caller
/// (mesa-core), this layer only persists it.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub cash_session_id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub total_cents: i64,
    pub received_cents: Option<i64>,
    pub change_cents: Option<i64>,
    pub cashier_id: String,
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

const SELECT_TRANSACTION: &str = r#"
    SELECT id, cash_session_id, order_id, method, total_cents,
           received_cents, change_cents, cashier_id, processed_at
    FROM transactions
"#;

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment, marks the order paid, and frees the table -
    /// atomically.
    ///
    /// ## Errors
    /// - [`DbError::UniqueViolation`] on `transactions` if the order
    ///   already has a payment (caller resolves via `find_by_order`)
    /// - [`DbError::StaleState`] on `CashSession` if the session is no
    ///   longer open, on `Order` if the order is not open
    pub async fn record_payment(&self, payment: NewPayment) -> DbResult<CashTransaction> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        info!(
            transaction_id = %id,
            order_id = %payment.order_id,
            method = ?payment.method,
            total_cents = payment.total_cents,
            "Recording payment"
        );

        let mut tx = self.pool.begin().await?;

        // Guarded on the session still being open inside the same
        // transaction: zero rows means it closed after the caller's read.
        let inserted = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, cash_session_id, order_id, method, total_cents,
                received_cents, change_cents, cashier_id, processed_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
            WHERE EXISTS (
                SELECT 1 FROM cash_sessions WHERE id = ?2 AND status = 'open'
            )
            "#,
        )
        .bind(&id)
        .bind(&payment.cash_session_id)
        .bind(&payment.order_id)
        .bind(payment.method)
        .bind(payment.total_cents)
        .bind(payment.received_cents)
        .bind(payment.change_cents)
        .bind(&payment.cashier_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::stale("CashSession", &payment.cash_session_id));
        }

        let updated = sqlx::query(
            r#"
            UPDATE orders SET status = 'paid', paid_at = ?1
            WHERE id = ?2 AND status = 'open'
            "#,
        )
        .bind(now)
        .bind(&payment.order_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::stale("Order", &payment.order_id));
        }

        // Frees the table if the order had one. Non-table orders match
        // zero rows, which is fine.
        sqlx::query(
            r#"
            UPDATE tables
            SET state = 'free', active_order_id = NULL, updated_at = ?1
            WHERE active_order_id = ?2
            "#,
        )
        .bind(now)
        .bind(&payment.order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(transaction_id = %id, "Payment committed");

        Ok(CashTransaction {
            id,
            cash_session_id: payment.cash_session_id,
            order_id: payment.order_id,
            method: payment.method,
            total_cents: payment.total_cents,
            received_cents: payment.received_cents,
            change_cents: payment.change_cents,
            cashier_id: payment.cashier_id,
            processed_at: now,
        })
    }

    /// Finds the transaction for an order, if the order has been paid.
    pub async fn find_by_order(&self, order_id: &str) -> DbResult<Option<CashTransaction>> {
        let transaction =
            sqlx::query_as::<_, CashTransaction>(&format!("{SELECT_TRANSACTION} WHERE order_id = ?1"))
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(transaction)
    }

    /// Lists all transactions for a session, oldest first.
    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<CashTransaction>> {
        let transactions = sqlx::query_as::<_, CashTransaction>(&format!(
            "{SELECT_TRANSACTION} WHERE cash_session_id = ?1 ORDER BY processed_at"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
