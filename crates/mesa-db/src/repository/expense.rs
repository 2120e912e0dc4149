//! # Expense Repository
//!
//! Database operations for session expenses. Expenses are append-only:
//! once registered they are never edited or deleted, mistakes are
//! corrected with a compensating entry.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::{Expense, ExpenseCategory};

/// Fields for registering a new expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub cash_session_id: String,
    pub concept: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    pub cashier_id: String,
}

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Registers an expense against a session.
    ///
    /// ## Errors
    /// [`DbError::StaleState`] on `CashSession` if the session is missing
    /// or no longer open; a closed session's reconciliation record must
    /// never gain new inputs.
    pub async fn register(&self, new: NewExpense) -> DbResult<Expense> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        info!(
            expense_id = %id,
            session_id = %new.cash_session_id,
            amount_cents = new.amount_cents,
            "Registering expense"
        );

        // Guarded on the session still being open: zero rows means it
        // closed (or never existed).
        let inserted = sqlx::query(
            r#"
            INSERT INTO expenses (
                id, cash_session_id, concept, amount_cents, category,
                notes, cashier_id, registered_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
            WHERE EXISTS (
                SELECT 1 FROM cash_sessions WHERE id = ?2 AND status = 'open'
            )
            "#,
        )
        .bind(&id)
        .bind(&new.cash_session_id)
        .bind(&new.concept)
        .bind(new.amount_cents)
        .bind(new.category)
        .bind(&new.notes)
        .bind(&new.cashier_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DbError::stale("CashSession", &new.cash_session_id));
        }

        Ok(Expense {
            id,
            cash_session_id: new.cash_session_id,
            concept: new.concept,
            amount_cents: new.amount_cents,
            category: new.category,
            notes: new.notes,
            cashier_id: new.cashier_id,
            registered_at: now,
        })
    }

    /// Lists all expenses for a session, oldest first.
    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, cash_session_id, concept, amount_cents, category,
                   notes, cashier_id, registered_at
            FROM expenses
            WHERE cash_session_id = ?1
            ORDER BY registered_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::session::SessionClose;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn expense(session_id: &str, concept: &str, cents: i64) -> NewExpense {
        NewExpense {
            cash_session_id: session_id.to_string(),
            concept: concept.to_string(),
            amount_cents: cents,
            category: ExpenseCategory::Supplier,
            notes: None,
            cashier_id: "cashier-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let db = test_db().await;
        let session = db.sessions().open("r-1", "cashier-1", 50_000, None).await.unwrap();

        db.expenses()
            .register(expense(&session.id, "Fish delivery", 3_000))
            .await
            .unwrap();
        db.expenses()
            .register(expense(&session.id, "Ice", 2_000))
            .await
            .unwrap();

        let expenses = db.expenses().list_by_session(&session.id).await.unwrap();
        assert_eq!(expenses.len(), 2);

        let summary = db.sessions().summary(&session.id).await.unwrap();
        assert_eq!(summary.expense_total_cents, 5_000);
    }

    #[tokio::test]
    async fn test_check_constraints() {
        let db = test_db().await;
        let session = db.sessions().open("r-1", "cashier-1", 50_000, None).await.unwrap();

        // Concept under 3 chars
        let err = db
            .expenses()
            .register(expense(&session.id, "ab", 1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        // Non-positive amount
        let err = db
            .expenses()
            .register(expense(&session.id, "Ice", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let db = test_db().await;
        let err = db
            .expenses()
            .register(expense("no-such-session", "Ice", 1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::StaleState { .. }));
    }

    #[tokio::test]
    async fn test_register_rejected_after_session_close() {
        let db = test_db().await;
        let session = db.sessions().open("r-1", "cashier-1", 50_000, None).await.unwrap();

        db.sessions()
            .close(
                &session.id,
                SessionClose {
                    physical_count_cents: Some(50_000),
                    theoretical_cents: 50_000,
                    difference_cents: Some(0),
                },
                None,
            )
            .await
            .unwrap();

        let err = db
            .expenses()
            .register(expense(&session.id, "Late fish delivery", 3_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::StaleState { ref entity, .. } if entity == "CashSession"));

        // The closed session's expense total stays what it was at close
        assert!(db.expenses().list_by_session(&session.id).await.unwrap().is_empty());
    }
}
