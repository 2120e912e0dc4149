//! # Table Operations
//!
//! The floor-plan side of the subsystem: creating tables, seating them
//! with orders, walking orders through the kitchen, reservations, and the
//! soft lifecycle (inactive/maintenance).
//!
//! ## Identity
//! Operations key by the table's uuid `id`, not by its printed `number`:
//! numbers are unique only within a restaurant and can be renumbered when
//! the floor is rearranged. A terminal that only knows the number resolves
//! it once via [`PosService::table_by_number`] and works with the id from
//! then on.
//!
//! ## Where Legality Lives
//! ```text
//! mesa-core::TableState::can_transition_to  →  is this edge legal at all?
//! mesa-db guarded UPDATE (state = expected) →  is it still legal right now?
//! ```
//! Both checks run on every mutation. The first produces
//! `INVALID_TRANSITION` with a clear message; the second catches the
//! concurrent terminal that moved the table after our read.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::events::DomainEvent;
use crate::PosService;
use mesa_core::{validation, Action, DiningTable, DomainError, Order, TableState, ValidationError};
use mesa_db::{DbError, NewOrderItem, NewTable};

/// A line item as submitted by a terminal.
#[derive(Debug, Clone)]
pub struct OrderItemInput {
    pub product_ref: String,
    /// Display name at order time; snapshotted onto the item.
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub notes: Option<String>,
}

impl PosService {
    /// Creates a new table on the floor, starting `free`.
    #[instrument(skip(self, name, zone, notes))]
    pub async fn create_table(
        &self,
        restaurant_id: &str,
        number: i64,
        name: Option<&str>,
        zone: Option<&str>,
        capacity: i64,
        notes: Option<&str>,
        staff_id: &str,
    ) -> ServiceResult<DiningTable> {
        self.authorize(staff_id, Action::TableTransition).await?;
        validation::validate_capacity(capacity).map_err(ServiceError::from)?;

        let table = self
            .db
            .tables()
            .create(NewTable {
                restaurant_id: restaurant_id.to_string(),
                number,
                name: name.map(String::from),
                zone: zone.map(String::from),
                capacity,
                notes: notes.map(String::from),
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation_on("tables") {
                    ServiceError::from(ValidationError::Duplicate {
                        field: "number".to_string(),
                        value: number.to_string(),
                    })
                } else {
                    e.into()
                }
            })?;

        info!(table_id = %table.id, number, "Table created");
        Ok(table)
    }

    /// Returns a table by id.
    pub async fn get_table(&self, table_id: &str) -> ServiceResult<Option<DiningTable>> {
        Ok(self.db.tables().get_by_id(table_id).await?)
    }

    /// Resolves a table by its printed number within a restaurant.
    pub async fn table_by_number(
        &self,
        restaurant_id: &str,
        number: i64,
    ) -> ServiceResult<Option<DiningTable>> {
        Ok(self.db.tables().get_by_number(restaurant_id, number).await?)
    }

    /// Returns the full floor plan for a restaurant.
    pub async fn floor_plan(&self, restaurant_id: &str) -> ServiceResult<Vec<DiningTable>> {
        Ok(self.db.tables().list_by_restaurant(restaurant_id).await?)
    }

    /// Creates an order on a table, seating it (`free`/`reserved` →
    /// `occupied`).
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for empty/oversized orders or bad quantities
    /// - `REQUIRES_OPEN_SESSION` when the restaurant's register is closed
    /// - `TABLE_NOT_AVAILABLE` when the table is not seatable
    /// - `INVALID_TRANSITION` if another terminal seated it first
    #[instrument(skip(self, items, notes), fields(item_count = items.len()))]
    pub async fn create_order(
        &self,
        restaurant_id: &str,
        table_id: &str,
        items: Vec<OrderItemInput>,
        notes: Option<&str>,
        staff_id: &str,
    ) -> ServiceResult<Order> {
        self.authorize(staff_id, Action::TableTransition).await?;

        validation::validate_order_size(items.len()).map_err(ServiceError::from)?;
        for item in &items {
            validation::validate_quantity(item.quantity).map_err(ServiceError::from)?;
            validation::validate_unit_price(item.unit_price_cents).map_err(ServiceError::from)?;
        }

        // There is no one to take money without an open register, so an
        // order may not even start.
        if self.db.sessions().find_open(restaurant_id).await?.is_none() {
            return Err(DomainError::RequiresOpenSession.into());
        }

        let table = self.require_table(table_id).await?;

        if !table.state.is_seatable() {
            return Err(DomainError::TableNotAvailable {
                number: table.number,
                state: table.state.as_str().to_string(),
            }
            .into());
        }

        let new_items: Vec<NewOrderItem> = items
            .into_iter()
            .map(|i| NewOrderItem {
                product_ref: i.product_ref,
                name_snapshot: i.name,
                quantity: i.quantity,
                unit_price_cents: i.unit_price_cents,
                notes: i.notes,
            })
            .collect();

        let order = self
            .db
            .orders()
            .create_for_table(restaurant_id, table_id, table.state, &new_items, notes)
            .await
            .map_err(|e| self.map_stale_table(e, table.state, TableState::Occupied))?;

        info!(order_id = %order.id, table_id, total_cents = order.total_cents, "Order created");

        self.emit_table_changed(table_id, table.state).await;
        Ok(order)
    }

    /// Moves a table between occupancy states (kitchen, served, awaiting
    /// payment).
    ///
    /// Edges in or out of occupancy are owned by other operations
    /// (`create_order`, `remove_order`, `process_payment`) because they
    /// carry order bookkeeping; this one is pure state progression.
    #[instrument(skip(self))]
    pub async fn advance_order_state(
        &self,
        table_id: &str,
        to: TableState,
        staff_id: &str,
    ) -> ServiceResult<DiningTable> {
        self.authorize(staff_id, Action::TableTransition).await?;

        let table = self.require_table(table_id).await?;

        table.state.assert_transition(to).map_err(ServiceError::from)?;
        if !table.state.requires_active_order() || !to.requires_active_order() {
            // Legal edge, wrong operation
            return Err(DomainError::InvalidTransition {
                from: table.state.as_str().to_string(),
                to: to.as_str().to_string(),
            }
            .into());
        }

        self.db
            .tables()
            .transition(table_id, table.state, to)
            .await
            .map_err(|e| self.map_stale_table(e, table.state, to))?;

        self.emit_table_changed(table_id, table.state).await;
        self.require_table(table_id).await
    }

    /// Removes (voids) an open order, freeing its table.
    #[instrument(skip(self))]
    pub async fn remove_order(&self, order_id: &str, staff_id: &str) -> ServiceResult<()> {
        self.authorize(staff_id, Action::TableTransition).await?;

        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::from(DomainError::OrderNotFound {
                    id: order_id.to_string(),
                })
            })?;

        let previous_state = match &order.table_id {
            Some(table_id) => self.require_table(table_id).await?.state,
            None => TableState::Free,
        };

        self.db.orders().void_order(order_id).await.map_err(|e| match e {
            // The order stopped being open - it was paid meanwhile
            DbError::StaleState { .. } => ServiceError::from(DomainError::OrderAlreadyPaid {
                order_id: order_id.to_string(),
            }),
            other => other.into(),
        })?;

        info!(order_id, "Order removed");

        if let Some(table_id) = &order.table_id {
            self.emit_table_changed(table_id, previous_state).await;
        }
        Ok(())
    }

    /// Reserves a free table for a named party.
    #[instrument(skip(self, customer_name, customer_phone))]
    pub async fn reserve_table(
        &self,
        table_id: &str,
        customer_name: &str,
        customer_phone: Option<&str>,
        reserved_for: Option<DateTime<Utc>>,
        staff_id: &str,
    ) -> ServiceResult<DiningTable> {
        self.authorize(staff_id, Action::TableTransition).await?;
        validation::validate_customer_name(customer_name).map_err(ServiceError::from)?;

        let table = self.require_table(table_id).await?;
        table
            .state
            .assert_transition(TableState::Reserved)
            .map_err(ServiceError::from)?;

        self.db
            .tables()
            .reserve(table_id, customer_name.trim(), customer_phone, reserved_for)
            .await
            .map_err(|e| self.map_stale_table(e, table.state, TableState::Reserved))?;

        self.emit_table_changed(table_id, table.state).await;
        self.require_table(table_id).await
    }

    /// Releases a reservation (no-show, cancellation), freeing the table.
    #[instrument(skip(self))]
    pub async fn release_reservation(
        &self,
        table_id: &str,
        staff_id: &str,
    ) -> ServiceResult<DiningTable> {
        self.authorize(staff_id, Action::TableTransition).await?;

        let table = self.require_table(table_id).await?;
        table
            .state
            .assert_transition(TableState::Free)
            .map_err(ServiceError::from)?;

        self.db
            .tables()
            .release_reservation(table_id)
            .await
            .map_err(|e| self.map_stale_table(e, table.state, TableState::Free))?;

        self.emit_table_changed(table_id, table.state).await;
        self.require_table(table_id).await
    }

    /// Takes a free table off the floor (`inactive` or `maintenance`).
    ///
    /// The row survives: historical orders keep referencing it.
    #[instrument(skip(self, reason))]
    pub async fn deactivate_table(
        &self,
        table_id: &str,
        target: TableState,
        reason: &str,
        staff_id: &str,
    ) -> ServiceResult<DiningTable> {
        self.authorize(staff_id, Action::TableTransition).await?;
        validation::validate_reason(reason).map_err(ServiceError::from)?;

        if !matches!(target, TableState::Inactive | TableState::Maintenance) {
            return Err(DomainError::InvalidTransition {
                from: "free".to_string(),
                to: target.as_str().to_string(),
            }
            .into());
        }

        let table = self.require_table(table_id).await?;
        table.state.assert_transition(target).map_err(ServiceError::from)?;

        self.db
            .tables()
            .transition(table_id, table.state, target)
            .await
            .map_err(|e| self.map_stale_table(e, table.state, target))?;

        info!(table_id, target = %target, reason, "Table taken off the floor");

        self.emit_table_changed(table_id, table.state).await;
        self.require_table(table_id).await
    }

    /// Returns an `inactive`/`maintenance` table to the floor.
    #[instrument(skip(self))]
    pub async fn reactivate_table(
        &self,
        table_id: &str,
        staff_id: &str,
    ) -> ServiceResult<DiningTable> {
        self.authorize(staff_id, Action::TableTransition).await?;

        let table = self.require_table(table_id).await?;
        table
            .state
            .assert_transition(TableState::Free)
            .map_err(ServiceError::from)?;

        self.db
            .tables()
            .transition(table_id, table.state, TableState::Free)
            .await
            .map_err(|e| self.map_stale_table(e, table.state, TableState::Free))?;

        self.emit_table_changed(table_id, table.state).await;
        self.require_table(table_id).await
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Fetches a table or fails with a validation error on a malformed or
    /// unknown id.
    async fn require_table(&self, table_id: &str) -> ServiceResult<DiningTable> {
        validation::validate_uuid(table_id).map_err(ServiceError::from)?;

        self.db.tables().get_by_id(table_id).await?.ok_or_else(|| {
            ServiceError::from(ValidationError::InvalidFormat {
                field: "table_id".to_string(),
                reason: format!("unknown table: {table_id}"),
            })
        })
    }

    /// Re-types a lost optimistic race as INVALID_TRANSITION. The `from`
    /// is the state we read before the race; the table has since moved.
    fn map_stale_table(&self, err: DbError, expected: TableState, to: TableState) -> ServiceError {
        match err {
            DbError::StaleState { .. } => ServiceError::from(DomainError::InvalidTransition {
                from: expected.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
            other => other.into(),
        }
    }

    /// Publishes `TableChanged` with a fresh read of the table.
    async fn emit_table_changed(&self, table_id: &str, previous_state: TableState) {
        if let Ok(Some(table)) = self.db.tables().get_by_id(table_id).await {
            self.events
                .publish(DomainEvent::TableChanged { table, previous_state });
        }
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
        provider.assign("waiter-1", vec![Role::Cashier]);
        PosService::new(db, Arc::new(provider))
    }

    async fn seed_table(service: &PosService, number: i64) -> DiningTable {
        service
            .create_table("r-1", number, None, Some("terrace"), 4, None, "waiter-1")
            .await
            .unwrap()
    }

    async fn open_register(service: &PosService) {
        service.open_session("r-1", "waiter-1", 10_000, None).await.unwrap();
    }

    fn items(cents: i64) -> Vec<OrderItemInput> {
        vec![OrderItemInput {
            product_ref: "p-1".to_string(),
            name: "Plato".to_string(),
            quantity: 1,
            unit_price_cents: cents,
            notes: None,
        }]
    }

    #[tokio::test]
    async fn test_order_walkthrough_to_awaiting_payment() {
        let service = service().await;
        open_register(&service).await;
        let table = seed_table(&service, 1).await;

        service
            .create_order("r-1", &table.id, items(1_200), None, "waiter-1")
            .await
            .unwrap();

        let t = service
            .advance_order_state(&table.id, TableState::InKitchen, "waiter-1")
            .await
            .unwrap();
        assert_eq!(t.state, TableState::InKitchen);

        let t = service
            .advance_order_state(&table.id, TableState::Served, "waiter-1")
            .await
            .unwrap();
        assert_eq!(t.state, TableState::Served);

        let t = service
            .advance_order_state(&table.id, TableState::AwaitingPayment, "waiter-1")
            .await
            .unwrap();
        assert_eq!(t.state, TableState::AwaitingPayment);
        assert!(t.occupancy_consistent());
    }

    #[tokio::test]
    async fn test_occupied_table_not_seatable() {
        let service = service().await;
        open_register(&service).await;
        let table = seed_table(&service, 1).await;

        service
            .create_order("r-1", &table.id, items(500), None, "waiter-1")
            .await
            .unwrap();

        let err = service
            .create_order("r-1", &table.id, items(500), None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "TABLE_NOT_AVAILABLE");
    }

    #[tokio::test]
    async fn test_inactive_table_cannot_be_occupied() {
        let service = service().await;
        open_register(&service).await;
        let table = seed_table(&service, 1).await;

        service
            .deactivate_table(&table.id, TableState::Inactive, "broken leg", "waiter-1")
            .await
            .unwrap();

        // Seating an inactive table is refused
        let err = service
            .create_order("r-1", &table.id, items(500), None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "TABLE_NOT_AVAILABLE");

        // It must pass through free first
        let t = service.reactivate_table(&table.id, "waiter-1").await.unwrap();
        assert_eq!(t.state, TableState::Free);
        service
            .create_order("r-1", &table.id, items(500), None, "waiter-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_advance_rejects_non_occupancy_edges() {
        let service = service().await;
        open_register(&service).await;
        let table = seed_table(&service, 1).await;

        // free → in_kitchen is not even legal
        let err = service
            .advance_order_state(&table.id, TableState::InKitchen, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "INVALID_TRANSITION");

        // occupied → free is legal but owned by remove_order/process_payment
        service
            .create_order("r-1", &table.id, items(500), None, "waiter-1")
            .await
            .unwrap();
        let err = service
            .advance_order_state(&table.id, TableState::Free, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "INVALID_TRANSITION");
    }

    #[tokio::test]
    async fn test_remove_order_frees_table() {
        let service = service().await;
        open_register(&service).await;
        let table = seed_table(&service, 1).await;

        let order = service
            .create_order("r-1", &table.id, items(800), None, "waiter-1")
            .await
            .unwrap();

        service.remove_order(&order.id, "waiter-1").await.unwrap();

        let t = service.get_table(&table.id).await.unwrap().unwrap();
        assert_eq!(t.state, TableState::Free);
        assert!(t.active_order_id.is_none());
    }

    #[tokio::test]
    async fn test_reservation_flow() {
        let service = service().await;
        open_register(&service).await;
        let table = seed_table(&service, 1).await;

        let t = service
            .reserve_table(&table.id, "Ana García", Some("+34-600-000-000"), None, "waiter-1")
            .await
            .unwrap();
        assert_eq!(t.state, TableState::Reserved);
        assert_eq!(t.reservation_name.as_deref(), Some("Ana García"));

        // A reserved table can be seated directly; reservation data clears
        service
            .create_order("r-1", &table.id, items(2_000), None, "waiter-1")
            .await
            .unwrap();
        let t = service.get_table(&table.id).await.unwrap().unwrap();
        assert_eq!(t.state, TableState::Occupied);
        assert!(t.reservation_name.is_none());
    }

    #[tokio::test]
    async fn test_release_reservation() {
        let service = service().await;
        let table = seed_table(&service, 1).await;

        service
            .reserve_table(&table.id, "Lopez", None, None, "waiter-1")
            .await
            .unwrap();
        let t = service.release_reservation(&table.id, "waiter-1").await.unwrap();
        assert_eq!(t.state, TableState::Free);
        assert!(t.reservation_name.is_none());
    }

    #[tokio::test]
    async fn test_order_needs_open_register() {
        let service = service().await;
        let table = seed_table(&service, 5).await;

        // Register closed: the order is refused and the table untouched
        let err = service
            .create_order("r-1", &table.id, items(500), None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "REQUIRES_OPEN_SESSION");

        let t = service.get_table(&table.id).await.unwrap().unwrap();
        assert_eq!(t.state, TableState::Free);
        assert!(t.active_order_id.is_none());
    }

    #[tokio::test]
    async fn test_order_validation() {
        let service = service().await;
        let table = seed_table(&service, 1).await;

        // Empty order
        let err = service
            .create_order("r-1", &table.id, vec![], None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        // Bad quantity
        let mut bad = items(500);
        bad[0].quantity = 0;
        let err = service
            .create_order("r-1", &table.id, bad, None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        // Unit price beyond the cap
        let mut pricey = items(500);
        pricey[0].unit_price_cents = mesa_core::MAX_UNIT_PRICE_CENTS + 1;
        let err = service
            .create_order("r-1", &table.id, pricey, None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_table_by_number() {
        let service = service().await;
        let table = seed_table(&service, 7).await;

        let found = service.table_by_number("r-1", 7).await.unwrap().unwrap();
        assert_eq!(found.id, table.id);

        assert!(service.table_by_number("r-1", 99).await.unwrap().is_none());
        assert!(service.table_by_number("r-2", 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_table_id_rejected() {
        let service = service().await;

        let err = service
            .reserve_table("not-a-table", "Ana", None, None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_duplicate_table_number() {
        let service = service().await;
        seed_table(&service, 5).await;

        let err = service
            .create_table("r-1", 5, None, None, 2, None, "waiter-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_table_changed_events_carry_previous_state() {
        let service = service().await;
        open_register(&service).await;
        let table = seed_table(&service, 1).await;
        let mut rx = service.subscribe();

        service
            .create_order("r-1", &table.id, items(500), None, "waiter-1")
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            DomainEvent::TableChanged { table: t, previous_state } => {
                assert_eq!(previous_state, TableState::Free);
                assert_eq!(t.state, TableState::Occupied);
            }
            other => panic!("unexpected event: {}", other.name()),
        }
    }
}
