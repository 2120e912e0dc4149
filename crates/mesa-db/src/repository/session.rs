//! # Cash Session Repository
//!
//! Database operations for cash register sessions.
//!
//! ## Single-Open-Session Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open() does NOT check-then-insert. It just inserts.                   │
//! │                                                                         │
//! │  The unique partial index                                              │
//! │      idx_cash_sessions_one_open (restaurant_id) WHERE status = 'open'  │
//! │  rejects the second concurrent insert, and the UniqueViolation comes   │
//! │  back to the caller. Two terminals pressing "open register" at the     │
//! │  same instant resolve inside SQLite, deterministically.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Closing is guarded on `status = 'open'` the same way table transitions
//! are guarded: a double close matches zero rows.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::{CashSession, SessionStatus, SessionSummary};

/// Outcome fields computed at close time (by mesa-core reconciliation).
#[derive(Debug, Clone, Copy)]
pub struct SessionClose {
    pub physical_count_cents: Option<i64>,
    pub theoretical_cents: i64,
    pub difference_cents: Option<i64>,
}

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

const SELECT_SESSION: &str = r#"
    SELECT id, restaurant_id, cashier_id, status, opened_at, closed_at,
           initial_amount_cents, opening_notes, closing_notes,
           physical_count_cents, theoretical_cents, difference_cents
    FROM cash_sessions
"#;

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Opens a new cash session.
    ///
    /// ## Errors
    /// [`DbError::UniqueViolation`] on `cash_sessions` if the restaurant
    /// already has an open session. The caller maps this to its domain code.
    pub async fn open(
        &self,
        restaurant_id: &str,
        cashier_id: &str,
        initial_amount_cents: i64,
        opening_notes: Option<&str>,
    ) -> DbResult<CashSession> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        info!(
            session_id = %id,
            restaurant_id = %restaurant_id,
            initial_amount_cents,
            "Opening cash session"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, restaurant_id, cashier_id, status, opened_at, closed_at,
                initial_amount_cents, opening_notes, closing_notes,
                physical_count_cents, theoretical_cents, difference_cents
            ) VALUES (?1, ?2, ?3, 'open', ?4, NULL, ?5, ?6, NULL, NULL, NULL, NULL)
            "#,
        )
        .bind(&id)
        .bind(restaurant_id)
        .bind(cashier_id)
        .bind(now)
        .bind(initial_amount_cents)
        .bind(opening_notes)
        .execute(&self.pool)
        .await?;

        Ok(CashSession {
            id,
            restaurant_id: restaurant_id.to_string(),
            cashier_id: cashier_id.to_string(),
            status: SessionStatus::Open,
            opened_at: now,
            closed_at: None,
            initial_amount_cents,
            opening_notes: opening_notes.map(String::from),
            closing_notes: None,
            physical_count_cents: None,
            theoretical_cents: None,
            difference_cents: None,
        })
    }

    /// Finds the open session for a restaurant, if one exists.
    ///
    /// At most one row can match (partial unique index), so
    /// `fetch_optional` is exact, not "first of many".
    pub async fn find_open(&self, restaurant_id: &str) -> DbResult<Option<CashSession>> {
        let session = sqlx::query_as::<_, CashSession>(&format!(
            "{SELECT_SESSION} WHERE restaurant_id = ?1 AND status = 'open'"
        ))
        .bind(restaurant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let session = sqlx::query_as::<_, CashSession>(&format!("{SELECT_SESSION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Lists sessions for a restaurant, newest first.
    pub async fn list_by_restaurant(&self, restaurant_id: &str, limit: i64) -> DbResult<Vec<CashSession>> {
        let sessions = sqlx::query_as::<_, CashSession>(&format!(
            "{SELECT_SESSION} WHERE restaurant_id = ?1 ORDER BY opened_at DESC LIMIT ?2"
        ))
        .bind(restaurant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Closes an open session, recording the reconciliation outcome.
    ///
    /// ## Errors
    /// [`DbError::StaleState`] if the session is not open (already closed,
    /// or closed by a concurrent call).
    pub async fn close(
        &self,
        id: &str,
        outcome: SessionClose,
        closing_notes: Option<&str>,
    ) -> DbResult<CashSession> {
        info!(
            session_id = %id,
            theoretical_cents = outcome.theoretical_cents,
            difference_cents = ?outcome.difference_cents,
            "Closing cash session"
        );

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions
            SET status = 'closed',
                closed_at = ?1,
                closing_notes = ?2,
                physical_count_cents = ?3,
                theoretical_cents = ?4,
                difference_cents = ?5
            WHERE id = ?6 AND status = 'open'
            "#,
        )
        .bind(Utc::now())
        .bind(closing_notes)
        .bind(outcome.physical_count_cents)
        .bind(outcome.theoretical_cents)
        .bind(outcome.difference_cents)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("CashSession", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", id))
    }

    /// Aggregates money movement for a session.
    ///
    /// Feeds reconciliation at close time and the session report at any
    /// time. All sums are over the session's own rows, so a closed
    /// session's summary is stable forever.
    pub async fn summary(&self, session_id: &str) -> DbResult<SessionSummary> {
        debug!(session_id = %session_id, "Computing session summary");

        let (transaction_count, cash, card, digital) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(CASE WHEN method = 'cash' THEN total_cents ELSE 0 END), 0),
                       COALESCE(SUM(CASE WHEN method = 'card' THEN total_cents ELSE 0 END), 0),
                       COALESCE(SUM(CASE WHEN method = 'digital' THEN total_cents ELSE 0 END), 0)
                FROM transactions
                WHERE cash_session_id = ?1
                "#,
            )
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        let expense_total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses WHERE cash_session_id = ?1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SessionSummary {
            transaction_count,
            cash_total_cents: cash,
            card_total_cents: card,
            digital_total_cents: digital,
            expense_total_cents: expense_total,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_and_find() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = repo.open("r-1", "cashier-1", 50_000, None).await.unwrap();
        assert!(session.is_open());

        let found = repo.find_open("r-1").await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.initial_amount_cents, 50_000);

        // A different restaurant has no open session
        assert!(repo.find_open("r-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_rejected_by_index() {
        let db = test_db().await;
        let repo = db.sessions();

        repo.open("r-1", "cashier-1", 10_000, None).await.unwrap();
        let err = repo.open("r-1", "cashier-2", 20_000, None).await.unwrap_err();
        assert!(err.is_unique_violation_on("cash_sessions"));

        // Another restaurant is unaffected
        repo.open("r-2", "cashier-3", 5_000, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_one_way() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = repo.open("r-1", "cashier-1", 50_000, None).await.unwrap();

        let closed = repo
            .close(
                &session.id,
                SessionClose {
                    physical_count_cents: Some(62_000),
                    theoretical_cents: 63_000,
                    difference_cents: Some(-1_000),
                },
                Some("short by 10"),
            )
            .await
            .unwrap();

        assert_eq!(closed.status, SessionStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(closed.difference_cents, Some(-1_000));

        // Second close hits the guard
        let err = repo
            .close(
                &session.id,
                SessionClose {
                    physical_count_cents: None,
                    theoretical_cents: 0,
                    difference_cents: None,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::StaleState { .. }));

        // And once closed, a new session can open
        repo.open("r-1", "cashier-1", 40_000, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_summary_empty_session() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = repo.open("r-1", "cashier-1", 10_000, None).await.unwrap();
        let summary = repo.summary(&session.id).await.unwrap();

        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.cash_total_cents, 0);
        assert_eq!(summary.expense_total_cents, 0);
    }
}
