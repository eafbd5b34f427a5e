//! Enrollment settlement ledger for a class marketplace.
//!
//! The crate is laid out hexagonally:
//!
//! - [`domain`]: entities, the settlement, catalog, cart and dashboard
//!   services, and the ports they talk through.
//! - [`outbound`]: ledger store adapters, in-process and PostgreSQL.
//! - [`services`]: the composition root handing driving ports to a
//!   transport.
//! - [`config`] and [`telemetry`]: settings and tracing setup.
//!
//! ```
//! use std::sync::Arc;
//!
//! use marketplace::domain::ServiceTimeouts;
//! use marketplace::outbound::memory::InMemoryLedgerStore;
//! use marketplace::services::MarketplaceServices;
//! use mockable::DefaultClock;
//!
//! let services = MarketplaceServices::in_memory(
//!     Arc::new(InMemoryLedgerStore::new()),
//!     Arc::new(DefaultClock),
//!     ServiceTimeouts::default(),
//! );
//! let _settlement = Arc::clone(&services.settlement);
//! ```

pub mod config;
pub mod domain;
pub mod outbound;
pub mod services;
pub mod telemetry;
