//! # Expense Operations
//!
//! Taking cash out of the drawer mid-session (paying a supplier at the
//! door, buying ice). Every expense reduces the theoretical drawer amount
//! at reconciliation time.

use tracing::{info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::events::DomainEvent;
use crate::PosService;
use mesa_core::{validation, Action, DomainError, Expense, ExpenseCategory};
use mesa_db::{DbError, NewExpense};

impl PosService {
    /// Registers an expense against the restaurant's open session.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for a short concept or non-positive amount
    /// - `REQUIRES_OPEN_SESSION` when the register is closed
    /// - `SESSION_ALREADY_CLOSED` if the register closes between the
    ///   session lookup and the write
    #[instrument(skip(self, concept, notes))]
    pub async fn register_expense(
        &self,
        restaurant_id: &str,
        cashier_id: &str,
        concept: &str,
        amount_cents: i64,
        category: ExpenseCategory,
        notes: Option<&str>,
    ) -> ServiceResult<Expense> {
        self.authorize(cashier_id, Action::RegisterExpense).await?;

        validation::validate_expense_concept(concept).map_err(ServiceError::from)?;
        validation::validate_expense_amount(amount_cents).map_err(ServiceError::from)?;

        let session = self
            .db
            .sessions()
            .find_open(restaurant_id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::RequiresOpenSession))?;

        let expense = self
            .db
            .expenses()
            .register(NewExpense {
                cash_session_id: session.id.clone(),
                concept: concept.trim().to_string(),
                amount_cents,
                category,
                notes: notes.map(String::from),
                cashier_id: cashier_id.to_string(),
            })
            .await
            .map_err(|e| match e {
                // The register closed between our open-session read and
                // the write
                DbError::StaleState { .. } => {
                    ServiceError::from(DomainError::SessionAlreadyClosed {
                        id: session.id.clone(),
                    })
                }
                other => other.into(),
            })?;

        info!(
            expense_id = %expense.id,
            amount_cents,
            category = ?category,
            "Expense registered"
        );

        self.events.publish(DomainEvent::ExpenseRegistered {
            expense: expense.clone(),
        });

        Ok(expense)
    }

    /// Lists the expenses registered against a session.
    pub async fn session_expenses(&self, session_id: &str) -> ServiceResult<Vec<Expense>> {
        Ok(self.db.expenses().list_by_session(session_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticRoleProvider;
    use mesa_core::Role;
    use mesa_db::{Database, DbConfig};
    use std::sync::Arc;

    async fn service() -> PosService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let provider = StaticRoleProvider::new();
        provider.assign("cashier-1", vec![Role::Cashier]);
        PosService::new(db, Arc::new(provider))
    }

    #[tokio::test]
    async fn test_expense_reduces_theoretical() {
        let service = service().await;
        let session = service.open_session("r-1", "cashier-1", 50_000, None).await.unwrap();

        service
            .register_expense("r-1", "cashier-1", "Fish delivery", 5_000, ExpenseCategory::Supplier, None)
            .await
            .unwrap();

        let closed = service
            .close_session(&session.id, "cashier-1", Some(45_000), None)
            .await
            .unwrap();
        assert_eq!(closed.session.theoretical_cents, Some(45_000));
        assert_eq!(closed.session.difference_cents, Some(0));
    }

    #[tokio::test]
    async fn test_expense_requires_open_session() {
        let service = service().await;

        let err = service
            .register_expense("r-1", "cashier-1", "Ice", 1_000, ExpenseCategory::Supplies, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "REQUIRES_OPEN_SESSION");
    }

    #[tokio::test]
    async fn test_expense_validation_runs_before_storage() {
        let service = service().await;
        service.open_session("r-1", "cashier-1", 0, None).await.unwrap();

        let err = service
            .register_expense("r-1", "cashier-1", "ab", 1_000, ExpenseCategory::Other, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        let err = service
            .register_expense("r-1", "cashier-1", "Ice bags", 0, ExpenseCategory::Other, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_concept_is_trimmed() {
        let service = service().await;
        let session = service.open_session("r-1", "cashier-1", 0, None).await.unwrap();

        let expense = service
            .register_expense("r-1", "cashier-1", "  Gas bill  ", 2_500, ExpenseCategory::Utilities, None)
            .await
            .unwrap();
        assert_eq!(expense.concept, "Gas bill");

        let listed = service.session_expenses(&session.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
