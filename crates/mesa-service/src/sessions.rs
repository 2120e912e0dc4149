//! # Session Operations
//!
//! Opening and closing the register.
//!
//! ## Close-Time Reconciliation
//! ```text
//! theoretical = initial + Σ(cash transactions) − Σ(expenses)
//! difference  = physical_count − theoretical        (when a count is given)
//! ```
//! Card and digital totals are reported in the summary but never enter the
//! drawer math.

use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::events::DomainEvent;
use crate::PosService;
use mesa_core::{
    reconcile, validation, Action, CashSession, DomainError, Money, Reconciliation, SessionSummary,
};
use mesa_db::{DbError, SessionClose};

/// Everything produced by closing a session.
#[derive(Debug, Clone, Serialize)]
pub struct ClosedSession {
    pub session: CashSession,
    pub summary: SessionSummary,
    /// Present when a physical count was supplied at close.
    pub reconciliation: Option<Reconciliation>,
}

impl PosService {
    /// Opens a cash session for a restaurant.
    ///
    /// ## Errors
    /// - `PERMISSION_DENIED` / `SESSION_EXPIRED` from the permission gate
    /// - `AMOUNT_OUT_OF_RANGE` if the float is negative or above the cap
    /// - `SESSION_ALREADY_OPEN` if the restaurant already has one (decided
    ///   atomically by the storage index, so concurrent opens are safe)
    #[instrument(skip(self, opening_notes))]
    pub async fn open_session(
        &self,
        restaurant_id: &str,
        cashier_id: &str,
        initial_amount_cents: i64,
        opening_notes: Option<&str>,
    ) -> ServiceResult<CashSession> {
        self.authorize(cashier_id, Action::OpenSession).await?;
        validation::validate_initial_amount(initial_amount_cents).map_err(ServiceError::from)?;

        let session = self
            .db
            .sessions()
            .open(restaurant_id, cashier_id, initial_amount_cents, opening_notes)
            .await
            .map_err(|e| {
                if e.is_unique_violation_on("cash_sessions") {
                    ServiceError::from(DomainError::SessionAlreadyOpen {
                        restaurant_id: restaurant_id.to_string(),
                    })
                } else {
                    e.into()
                }
            })?;

        info!(session_id = %session.id, restaurant_id, "Cash session opened");

        self.events.publish(DomainEvent::SessionOpened {
            session: session.clone(),
        });

        Ok(session)
    }

    /// Closes a session, computing its summary and (when a physical count
    /// is supplied) the reconciliation.
    ///
    /// ## Errors
    /// - `SESSION_NOT_FOUND` if the id is unknown
    /// - `SESSION_ALREADY_CLOSED` on a second close (sessions are one-way)
    #[instrument(skip(self, closing_notes))]
    pub async fn close_session(
        &self,
        session_id: &str,
        cashier_id: &str,
        physical_count_cents: Option<i64>,
        closing_notes: Option<&str>,
    ) -> ServiceResult<ClosedSession> {
        self.authorize(cashier_id, Action::CloseSession).await?;

        let session = self
            .db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| {
                ServiceError::from(DomainError::SessionNotFound {
                    id: session_id.to_string(),
                })
            })?;

        if !session.is_open() {
            return Err(DomainError::SessionAlreadyClosed {
                id: session_id.to_string(),
            }
            .into());
        }

        let summary = self.db.sessions().summary(session_id).await?;

        let reconciliation = physical_count_cents.map(|count| {
            reconcile(
                session.initial_amount(),
                Money::from_cents(summary.cash_total_cents),
                Money::from_cents(summary.expense_total_cents),
                Money::from_cents(count),
            )
        });

        let theoretical_cents = (session.initial_amount()
            + Money::from_cents(summary.cash_total_cents)
            - Money::from_cents(summary.expense_total_cents))
        .cents();

        let closed = self
            .db
            .sessions()
            .close(
                session_id,
                SessionClose {
                    physical_count_cents,
                    theoretical_cents,
                    difference_cents: reconciliation.map(|r| r.difference.cents()),
                },
                closing_notes,
            )
            .await
            .map_err(|e| match e {
                // Lost a race with another close
                DbError::StaleState { .. } => ServiceError::from(DomainError::SessionAlreadyClosed {
                    id: session_id.to_string(),
                }),
                other => other.into(),
            })?;

        info!(
            session_id,
            theoretical_cents,
            difference_cents = ?closed.difference_cents,
            "Cash session closed"
        );

        self.events.publish(DomainEvent::SessionClosed {
            session: closed.clone(),
        });

        Ok(ClosedSession {
            session: closed,
            summary,
            reconciliation,
        })
    }

    /// Returns the open session for a restaurant, if any.
    pub async fn current_session(&self, restaurant_id: &str) -> ServiceResult<Option<CashSession>> {
        Ok(self.db.sessions().find_open(restaurant_id).await?)
    }

    /// Returns the money-movement summary for a session.
    pub async fn session_summary(&self, session_id: &str) -> ServiceResult<SessionSummary> {
        self.db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| {
                ServiceError::from(DomainError::SessionNotFound {
                    id: session_id.to_string(),
                })
            })?;

        Ok(self.db.sessions().summary(session_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticRoleProvider;
    use mesa_core::{ReconciliationOutcome, Role, MAX_SESSION_INITIAL_CENTS};
    use mesa_db::{Database, DbConfig};
    use std::sync::Arc;

    async fn service() -> PosService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let provider = StaticRoleProvider::new();
        provider.assign("cashier-1", vec![Role::Cashier]);
        provider.assign("cashier-2", vec![Role::Cashier]);
        PosService::new(db, Arc::new(provider))
    }

    #[tokio::test]
    async fn test_open_close_lifecycle() {
        let service = service().await;

        let session = service
            .open_session("r-1", "cashier-1", 50_000, Some("morning shift"))
            .await
            .unwrap();
        assert!(session.is_open());

        let current = service.current_session("r-1").await.unwrap().unwrap();
        assert_eq!(current.id, session.id);

        let closed = service
            .close_session(&session.id, "cashier-1", Some(50_000), None)
            .await
            .unwrap();
        assert!(!closed.session.is_open());
        assert_eq!(
            closed.reconciliation.unwrap().outcome,
            ReconciliationOutcome::Balanced
        );

        assert!(service.current_session("r-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_rejected() {
        let service = service().await;

        service.open_session("r-1", "cashier-1", 10_000, None).await.unwrap();

        let err = service
            .open_session("r-1", "cashier-2", 20_000, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "SESSION_ALREADY_OPEN");
        assert!(err.suggested_action.is_some());
    }

    #[tokio::test]
    async fn test_open_amount_bounds() {
        let service = service().await;

        let err = service
            .open_session("r-1", "cashier-1", -1, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "AMOUNT_OUT_OF_RANGE");

        let err = service
            .open_session("r-1", "cashier-1", MAX_SESSION_INITIAL_CENTS + 1, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "AMOUNT_OUT_OF_RANGE");

        // Zero is a legal empty drawer
        service.open_session("r-1", "cashier-1", 0, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_double_close() {
        let service = service().await;
        let session = service.open_session("r-1", "cashier-1", 0, None).await.unwrap();

        service
            .close_session(&session.id, "cashier-1", None, None)
            .await
            .unwrap();

        let err = service
            .close_session(&session.id, "cashier-1", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "SESSION_ALREADY_CLOSED");
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let service = service().await;
        let err = service
            .close_session("no-such-id", "cashier-1", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_close_without_count_skips_reconciliation() {
        let service = service().await;
        let session = service.open_session("r-1", "cashier-1", 30_000, None).await.unwrap();

        let closed = service
            .close_session(&session.id, "cashier-1", None, None)
            .await
            .unwrap();
        assert!(closed.reconciliation.is_none());
        assert_eq!(closed.session.theoretical_cents, Some(30_000));
        assert_eq!(closed.session.difference_cents, None);
    }

    #[tokio::test]
    async fn test_concurrent_opens_exactly_one_wins() {
        // One shared on-disk database, many concurrent openers: the
        // storage index must let exactly one through.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let dir = std::env::temp_dir().join(format!("mesa-test-{}", uuid()));
        std::fs::create_dir_all(&dir).unwrap();
        let db = Database::new(DbConfig::new(dir.join("race.db")).max_connections(8))
            .await
            .unwrap();

        let provider = StaticRoleProvider::new();
        for i in 0..8 {
            provider.assign(format!("c-{i}"), vec![Role::Cashier]);
        }
        let service = PosService::new(db, Arc::new(provider));

        let mut handles = Vec::new();
        for i in 0..8 {
            let svc = service.clone();
            handles.push(tokio::spawn(async move {
                svc.open_session("r-1", &format!("c-{i}"), 1_000, None).await
            }));
        }

        let mut opened = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(e) => {
                    assert_eq!(e.code, "SESSION_ALREADY_OPEN");
                    rejected += 1;
                }
            }
        }
        assert_eq!(opened, 1);
        assert_eq!(rejected, 7);

        let _ = std::fs::remove_dir_all(&dir);
    }

    fn uuid() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        format!("{nanos}-{}", std::process::id())
    }
}
