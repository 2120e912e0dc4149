//! # Table Repository
//!
//! Database operations for dining tables.
//!
//! ## Guarded Writes
//! Every state-changing UPDATE here carries the *expected current state* in
//! its WHERE clause and checks `rows_affected`:
//!
//! ```text
//! UPDATE tables SET state = 'occupied', ...
//! WHERE id = ?1 AND state = 'free'
//! ```
//!
//! If another terminal moved the table first, zero rows match and the call
//! returns [`DbError::StaleState`] instead of silently overwriting. This is
//! the storage half of the table state machine; the legal-transition table
//! itself lives in mesa-core.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::{DiningTable, TableState};

/// Fields for creating a new table.
#[derive(Debug, Clone)]
pub struct NewTable {
    pub restaurant_id: String,
    pub number: i64,
    pub name: Option<String>,
    pub zone: Option<String>,
    pub capacity: i64,
    pub notes: Option<String>,
}

/// Repository for dining table database operations.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

const SELECT_TABLE: &str = r#"
    SELECT id, restaurant_id, number, name, zone, capacity, state, notes,
           active_order_id, reservation_name, reservation_phone, reservation_time,
           created_at, updated_at
    FROM tables
"#;

impl TableRepository {
    /// Creates a new TableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Creates a new table in the `free` state.
    ///
    /// ## Errors
    /// - [`DbError::UniqueViolation`] if the number is already taken within
    ///   the restaurant
    /// - [`DbError::CheckViolation`] if capacity is not positive
    pub async fn create(&self, new: NewTable) -> DbResult<DiningTable> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, number = new.number, "Creating table");

        sqlx::query(
            r#"
            INSERT INTO tables (
                id, restaurant_id, number, name, zone, capacity, state, notes,
                active_order_id, reservation_name, reservation_phone, reservation_time,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'free', ?7, NULL, NULL, NULL, NULL, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(&new.restaurant_id)
        .bind(new.number)
        .bind(&new.name)
        .bind(&new.zone)
        .bind(new.capacity)
        .bind(&new.notes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(DiningTable {
            id,
            restaurant_id: new.restaurant_id,
            number: new.number,
            name: new.name,
            zone: new.zone,
            capacity: new.capacity,
            state: TableState::Free,
            notes: new.notes,
            active_order_id: None,
            reservation_name: None,
            reservation_phone: None,
            reservation_time: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a table by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiningTable>> {
        let table = sqlx::query_as::<_, DiningTable>(&format!("{SELECT_TABLE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(table)
    }

    /// Gets a table by business number within a restaurant.
    pub async fn get_by_number(&self, restaurant_id: &str, number: i64) -> DbResult<Option<DiningTable>> {
        let table = sqlx::query_as::<_, DiningTable>(&format!(
            "{SELECT_TABLE} WHERE restaurant_id = ?1 AND number = ?2"
        ))
        .bind(restaurant_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(table)
    }

    /// Lists all tables for a restaurant, ordered by number.
    pub async fn list_by_restaurant(&self, restaurant_id: &str) -> DbResult<Vec<DiningTable>> {
        let tables = sqlx::query_as::<_, DiningTable>(&format!(
            "{SELECT_TABLE} WHERE restaurant_id = ?1 ORDER BY number"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    /// Moves a table from `expected` to `next`, guarded.
    ///
    /// Used for transitions that touch neither the active order nor the
    /// reservation fields (occupancy progression, maintenance toggles).
    ///
    /// ## Errors
    /// [`DbError::StaleState`] if the table was no longer in `expected`.
    pub async fn transition(&self, id: &str, expected: TableState, next: TableState) -> DbResult<()> {
        debug!(id = %id, from = %expected, to = %next, "Table transition");

        let result = sqlx::query(
            r#"
            UPDATE tables SET state = ?1, updated_at = ?2
            WHERE id = ?3 AND state = ?4
            "#,
        )
        .bind(next)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("Table", id));
        }

        Ok(())
    }

    /// Reserves a free table, attaching the reservation details.
    pub async fn reserve(
        &self,
        id: &str,
        customer_name: &str,
        customer_phone: Option<&str>,
        reserved_for: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        debug!(id = %id, customer = %customer_name, "Reserving table");

        let result = sqlx::query(
            r#"
            UPDATE tables
            SET state = 'reserved',
                reservation_name = ?1,
                reservation_phone = ?2,
                reservation_time = ?3,
                updated_at = ?4
            WHERE id = ?5 AND state = 'free'
            "#,
        )
        .bind(customer_name)
        .bind(customer_phone)
        .bind(reserved_for)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("Table", id));
        }

        Ok(())
    }

    /// Releases a reservation, returning the table to `free` and clearing
    /// the reservation fields.
    pub async fn release_reservation(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Releasing reservation");

        let result = sqlx::query(
            r#"
            UPDATE tables
            SET state = 'free',
                reservation_name = NULL,
                reservation_phone = NULL,
                reservation_time = NULL,
                updated_at = ?1
            WHERE id = ?2 AND state = 'reserved'
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("Table", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
