//! # Repository Modules
//!
//! Each repository encapsulates the SQL for one aggregate. Multi-entity
//! writes (seat a table + create its order, record a payment + mark the
//! order paid + free the table) live in whichever repository owns the
//! primary row, inside a single SQLite transaction.

pub mod expense;
pub mod order;
pub mod payment;
pub mod session;
pub mod table;

pub use expense::ExpenseRepository;
pub use order::OrderRepository;
pub use payment::PaymentRepository;
pub use session::SessionRepository;
pub use table::TableRepository;
