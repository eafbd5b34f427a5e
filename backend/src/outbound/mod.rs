//! Outbound adapters implementing the ledger's driven ports.
//!
//! - **memory**: in-process store behind one `RwLock`, for tests and local
//!   runs
//! - **persistence**: PostgreSQL repositories using Diesel ORM
//!
//! Adapters translate between domain types and storage representations and
//! contain no business logic.

pub mod memory;
pub mod persistence;
