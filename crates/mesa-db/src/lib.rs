//! # mesa-db: Storage Layer for Mesa POS
//!
//! SQLite persistence for the table/cash coordination subsystem.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           mesa-db                                       │
//! │                                                                         │
//! │  ┌───────────┐   ┌──────────────────────────────────────────────┐      │
//! │  │ Database  │──▶│ TableRepository / OrderRepository /           │      │
//! │  │ (pool)    │   │ SessionRepository / PaymentRepository /       │      │
//! │  └─────┬─────┘   │ ExpenseRepository                             │      │
//! │        │         └──────────────────────────────────────────────┘      │
//! │        ▼                                                                │
//! │  ┌───────────┐   Embedded migrations, WAL mode, foreign keys on.       │
//! │  │  SQLite   │   Two invariants live in the schema itself:             │
//! │  └───────────┘   one open session per restaurant, one payment          │
//! │                  per order.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use mesa_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./mesa.db")).await?;
//! let session = db.sessions().open("r-1", "cashier-1", 50_000, None).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::expense::{ExpenseRepository, NewExpense};
pub use repository::order::{NewOrderItem, OrderRepository};
pub use repository::payment::{NewPayment, PaymentRepository};
pub use repository::session::{SessionClose, SessionRepository};
pub use repository::table::{NewTable, TableRepository};
