//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Every driven port of the ledger has a Diesel implementation here, backed
//! by `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: repositories translate between row structs and
//!   domain types; business rules stay in the domain services.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: Diesel and pool failures are mapped onto the
//!   port error enums.
//!
//! # Example
//!
//! ```no_run
//! use marketplace::outbound::persistence::{DbPool, DieselSettlementLedger, PoolConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/ledger")).await?;
//! let ledger = DieselSettlementLedger::new(pool);
//! # let _ = ledger;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_cart_repository;
mod diesel_class_repository;
mod diesel_ledger_query_repository;
mod diesel_settlement_ledger;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_cart_repository::DieselCartRepository;
pub use diesel_class_repository::DieselClassRepository;
pub use diesel_ledger_query_repository::DieselLedgerQueryRepository;
pub use diesel_settlement_ledger::DieselSettlementLedger;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
