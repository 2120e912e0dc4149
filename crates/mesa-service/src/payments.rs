//! # Payment Operations
//!
//! Taking money for an order.
//!
//! ## Idempotency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  process_payment(order X) twice (double-tap, retry after a timeout):   │
//! │                                                                         │
//! │  1st call: records the transaction, marks X paid, frees the table     │
//! │  2nd call: hits the UNIQUE(order_id) index, the transaction unwinds,   │
//! │            and the EXISTING record is returned with                    │
//! │            `already_paid = true`. No second charge, no second event.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::events::DomainEvent;
use crate::PosService;
use mesa_core::{
    Action, CashTransaction, DomainError, Money, OrderStatus, PaymentMethod, ValidationError,
};
use mesa_db::{DbError, NewPayment};

/// A payment request from a terminal.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub restaurant_id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    /// Cash only: what the customer handed over.
    pub received_cents: Option<i64>,
    pub cashier_id: String,
}

/// Result of a payment: the transaction, and whether it was a replay.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub transaction: CashTransaction,
    /// True when the order already had a transaction and the existing
    /// record was returned unchanged.
    pub already_paid: bool,
}

/// Parses a wire-format payment method string.
///
/// For boundaries that receive the method as text; typed callers construct
/// [`PaymentMethod`] directly.
pub fn parse_payment_method(s: &str) -> Result<PaymentMethod, DomainError> {
    match s.trim().to_lowercase().as_str() {
        "cash" => Ok(PaymentMethod::Cash),
        "card" => Ok(PaymentMethod::Card),
        "digital" => Ok(PaymentMethod::Digital),
        other => Err(DomainError::InvalidPaymentMethod {
            method: other.to_string(),
        }),
    }
}

impl PosService {
    /// Processes a payment for an order.
    ///
    /// ## Pipeline
    /// 1. Permission gate
    /// 2. `REQUIRES_OPEN_SESSION` unless the restaurant's register is open
    /// 3. `ORDER_NOT_FOUND` / replay detection
    /// 4. Cash: tender must cover the total (`INSUFFICIENT_AMOUNT`),
    ///    change computed exactly in minor units
    /// 5. One storage transaction: record payment, mark order paid, free
    ///    the table
    #[instrument(skip(self, request), fields(order_id = %request.order_id, method = ?request.method))]
    pub async fn process_payment(&self, request: PaymentRequest) -> ServiceResult<PaymentOutcome> {
        self.authorize(&request.cashier_id, Action::ProcessPayment).await?;

        let session = self
            .db
            .sessions()
            .find_open(&request.restaurant_id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::RequiresOpenSession))?;

        let order = self
            .db
            .orders()
            .get_by_id(&request.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::from(DomainError::OrderNotFound {
                    id: request.order_id.clone(),
                })
            })?;

        // Fast replay path: the order is already paid, return its record.
        if order.status == OrderStatus::Paid {
            return self.replay_existing(&request.order_id).await;
        }

        let total = order.total();
        let (received_cents, change_cents) = match request.method {
            PaymentMethod::Cash => {
                let received = request.received_cents.ok_or_else(|| {
                    ServiceError::from(ValidationError::Required {
                        field: "received".to_string(),
                    })
                })?;
                let change = Money::change_due(Money::from_cents(received), total)
                    .map_err(ServiceError::from)?;
                (Some(received), Some(change.cents()))
            }
            // Exact-amount methods carry no tender and no change
            PaymentMethod::Card | PaymentMethod::Digital => (None, None),
        };

        let result = self
            .db
            .payments()
            .record_payment(NewPayment {
                cash_session_id: session.id.clone(),
                order_id: request.order_id.clone(),
                method: request.method,
                total_cents: total.cents(),
                received_cents,
                change_cents,
                cashier_id: request.cashier_id.clone(),
            })
            .await;

        match result {
            Ok(transaction) => {
                info!(
                    transaction_id = %transaction.id,
                    total_cents = transaction.total_cents,
                    "Payment processed"
                );

                self.events.publish(DomainEvent::PaymentProcessed {
                    transaction: transaction.clone(),
                });

                Ok(PaymentOutcome {
                    transaction,
                    already_paid: false,
                })
            }
            // Slow replay path: a concurrent call won the race between our
            // status read and our insert.
            Err(e) if e.is_unique_violation_on("transactions") => {
                warn!(order_id = %request.order_id, "Concurrent duplicate payment, replaying existing record");
                self.replay_existing(&request.order_id).await
            }
            // The register closed between our open-session read and the write
            Err(DbError::StaleState { ref entity, .. }) if entity == "CashSession" => {
                Err(DomainError::SessionAlreadyClosed {
                    id: session.id.clone(),
                }
                .into())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Returns the existing transaction for a paid order.
    async fn replay_existing(&self, order_id: &str) -> ServiceResult<PaymentOutcome> {
        let existing = self
            .db
            .payments()
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::from(DomainError::OrderAlreadyPaid {
                    order_id: order_id.to_string(),
                })
            })?;

        Ok(PaymentOutcome {
            transaction: existing,
            already_paid: true,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::OrderItemInput;
    use crate::StaticRoleProvider;
    use mesa_core::{Role, TableState};
    use mesa_db::{Database, DbConfig};
    use std::sync::Arc;

    async fn service() -> PosService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let provider = StaticRoleProvider::new();
        provider.assign("cashier-1", vec![Role::Cashier]);
        PosService::new(db, Arc::new(provider))
    }

    async fn seed_order(service: &PosService, number: i64, cents: i64) -> (String, String) {
        let table = service
            .create_table("r-1", number, None, None, 4, None, "cashier-1")
            .await
            .unwrap();
        let order = service
            .create_order(
                "r-1",
                &table.id,
                vec![OrderItemInput {
                    product_ref: "p-1".to_string(),
                    name: "Menu".to_string(),
                    quantity: 1,
                    unit_price_cents: cents,
                    notes: None,
                }],
                None,
                "cashier-1",
            )
            .await
            .unwrap();
        (table.id, order.id)
    }

    fn cash_request(order_id: &str, received: i64) -> PaymentRequest {
        PaymentRequest {
            restaurant_id: "r-1".to_string(),
            order_id: order_id.to_string(),
            method: PaymentMethod::Cash,
            received_cents: Some(received),
            cashier_id: "cashier-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_cash_payment_with_change() {
        let service = service().await;
        service.open_session("r-1", "cashier-1", 50_000, None).await.unwrap();
        let (table_id, order_id) = seed_order(&service, 1, 1_850).await;

        let outcome = service.process_payment(cash_request(&order_id, 2_000)).await.unwrap();
        assert!(!outcome.already_paid);
        assert_eq!(outcome.transaction.change_cents, Some(150));

        // Table freed, order paid
        let table = service.db().tables().get_by_id(&table_id).await.unwrap().unwrap();
        assert_eq!(table.state, TableState::Free);
        assert!(table.active_order_id.is_none());
    }

    #[tokio::test]
    async fn test_payment_requires_open_session() {
        let service = service().await;
        let session = service.open_session("r-1", "cashier-1", 0, None).await.unwrap();
        let (_, order_id) = seed_order(&service, 1, 500).await;

        // Register closed between seating and payment
        service.close_session(&session.id, "cashier-1", None, None).await.unwrap();

        let err = service.process_payment(cash_request(&order_id, 500)).await.unwrap_err();
        assert_eq!(err.code, "REQUIRES_OPEN_SESSION");
        assert_eq!(err.suggested_action, Some("Open the register first"));
    }

    #[tokio::test]
    async fn test_insufficient_tender() {
        let service = service().await;
        service.open_session("r-1", "cashier-1", 0, None).await.unwrap();
        let (_, order_id) = seed_order(&service, 1, 1_000).await;

        let err = service.process_payment(cash_request(&order_id, 999)).await.unwrap_err();
        assert_eq!(err.code, "INSUFFICIENT_AMOUNT");

        // Nothing was mutated: the order is still payable
        let outcome = service.process_payment(cash_request(&order_id, 1_000)).await.unwrap();
        assert_eq!(outcome.transaction.change_cents, Some(0));
    }

    #[tokio::test]
    async fn test_replay_returns_existing_record() {
        let service = service().await;
        service.open_session("r-1", "cashier-1", 0, None).await.unwrap();
        let (_, order_id) = seed_order(&service, 1, 700).await;

        let first = service.process_payment(cash_request(&order_id, 700)).await.unwrap();
        let second = service.process_payment(cash_request(&order_id, 700)).await.unwrap();

        assert!(second.already_paid);
        assert_eq!(second.transaction.id, first.transaction.id);
    }

    #[tokio::test]
    async fn test_card_payment_ignores_tender_fields() {
        let service = service().await;
        service.open_session("r-1", "cashier-1", 0, None).await.unwrap();
        let (_, order_id) = seed_order(&service, 1, 4_200).await;

        let outcome = service
            .process_payment(PaymentRequest {
                restaurant_id: "r-1".to_string(),
                order_id,
                method: PaymentMethod::Card,
                received_cents: None,
                cashier_id: "cashier-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.transaction.received_cents, None);
        assert_eq!(outcome.transaction.change_cents, None);

        // Card money never enters the drawer
        let session = service.current_session("r-1").await.unwrap().unwrap();
        let summary = service.session_summary(&session.id).await.unwrap();
        assert_eq!(summary.cash_total_cents, 0);
        assert_eq!(summary.card_total_cents, 4_200);
    }

    #[tokio::test]
    async fn test_cash_without_received_rejected() {
        let service = service().await;
        service.open_session("r-1", "cashier-1", 0, None).await.unwrap();
        let (_, order_id) = seed_order(&service, 1, 500).await;

        let err = service
            .process_payment(PaymentRequest {
                restaurant_id: "r-1".to_string(),
                order_id,
                method: PaymentMethod::Cash,
                received_cents: None,
                cashier_id: "cashier-1".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let service = service().await;
        service.open_session("r-1", "cashier-1", 0, None).await.unwrap();

        let err = service
            .process_payment(cash_request("no-such-order", 1_000))
            .await
            .unwrap_err();
        assert_eq!(err.code, "ORDER_NOT_FOUND");
    }

    #[test]
    fn test_parse_payment_method() {
        assert_eq!(parse_payment_method("cash").unwrap(), PaymentMethod::Cash);
        assert_eq!(parse_payment_method(" Card ").unwrap(), PaymentMethod::Card);
        assert_eq!(parse_payment_method("digital").unwrap(), PaymentMethod::Digital);

        let err = parse_payment_method("cheque").unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYMENT_METHOD");
    }
}
