//! # Order Repository
//!
//! Database operations for orders and their line items.
//!
//! ## Two-Sided Writes
//! Seating a table and creating its order is ONE fact, so it is one SQLite
//! transaction:
//!
//! ```text
//! BEGIN
//!   INSERT INTO orders ...
//!   INSERT INTO order_items ... (per line)
//!   UPDATE tables SET state = 'occupied', active_order_id = ?
//!     WHERE id = ? AND state = <expected>      -- guarded
//! COMMIT
//! ```
//!
//! Voiding an order is the mirror image. Either both sides land or neither
//! does; the table never points at an order that doesn't exist.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::{Money, Order, OrderItem, OrderStatus, TableState};

/// A line item for a new order. Prices are snapshotted by the caller.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_ref: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub notes: Option<String>,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

const SELECT_ORDER: &str = r#"
    SELECT id, restaurant_id, table_id, status, total_cents, notes, created_at, paid_at
    FROM orders
"#;

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order for a table and seats the table, atomically.
    ///
    /// ## Arguments
    /// * `expected_state` - Table state the caller observed (`free` or
    ///   `reserved`). The seat is guarded on it.
    ///
    /// ## Errors
    /// [`DbError::StaleState`] if the table left `expected_state` between
    /// the caller's read and this write. Nothing is inserted in that case.
    pub async fn create_for_table(
        &self,
        restaurant_id: &str,
        table_id: &str,
        expected_state: TableState,
        items: &[NewOrderItem],
        notes: Option<&str>,
    ) -> DbResult<Order> {
        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let total = Money::sum(
            items
                .iter()
                .map(|i| Money::from_cents(i.unit_price_cents).multiply_quantity(i.quantity)),
        );

        debug!(
            order_id = %order_id,
            table_id = %table_id,
            items = items.len(),
            total_cents = total.cents(),
            "Creating order for table"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, restaurant_id, table_id, status, total_cents, notes, created_at, paid_at)
            VALUES (?1, ?2, ?3, 'open', ?4, ?5, ?6, NULL)
            "#,
        )
        .bind(&order_id)
        .bind(restaurant_id)
        .bind(table_id)
        .bind(total.cents())
        .bind(notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for item in items {
            let line_total = Money::from_cents(item.unit_price_cents).multiply_quantity(item.quantity);
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_ref, name_snapshot,
                                         quantity, unit_price_cents, line_total_cents, notes)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order_id)
            .bind(&item.product_ref)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(line_total.cents())
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;
        }

        // Seat the table. Clears any reservation: the party has arrived.
        let result = sqlx::query(
            r#"
            UPDATE tables
            SET state = 'occupied',
                active_order_id = ?1,
                reservation_name = NULL,
                reservation_phone = NULL,
                reservation_time = NULL,
                updated_at = ?2
            WHERE id = ?3 AND state = ?4
            "#,
        )
        .bind(&order_id)
        .bind(now)
        .bind(table_id)
        .bind(expected_state)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::stale("Table", table_id));
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            restaurant_id: restaurant_id.to_string(),
            table_id: Some(table_id.to_string()),
            status: OrderStatus::Open,
            total_cents: total.cents(),
            notes: notes.map(String::from),
            created_at: now,
            paid_at: None,
        })
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets all line items for an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_ref, name_snapshot,
                   quantity, unit_price_cents, line_total_cents, notes
            FROM order_items
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Voids an open order and frees its table, atomically.
    ///
    /// Only open orders can be voided; a paid order is immutable history.
    ///
    /// ## Errors
    /// - [`DbError::StaleState`] if the order is no longer open
    pub async fn void_order(&self, order_id: &str) -> DbResult<()> {
        debug!(order_id = %order_id, "Voiding order");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM orders WHERE id = ?1 AND status = 'open'")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::stale("Order", order_id));
        }

        // No state guard here: whatever occupancy stage the table reached,
        // voiding the order sends it back to free.
        sqlx::query(
            r#"
            UPDATE tables
            SET state = 'free', active_order_id = NULL, updated_at = ?1
            WHERE active_order_id = ?2
            "#,
        )
        .bind(Utc::now())
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
