//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`SettlementLedger`]) are implemented by the
//! outbound adapters. Driving ports (`*Command`, `*Query`) are implemented by
//! the domain services and consumed by whatever transport sits in front.

mod macros;
pub(crate) use macros::define_port_error;

mod cart_command;
mod cart_query;
mod cart_repository;
mod catalog_command;
mod catalog_query;
mod class_repository;
mod dashboard_query;
mod ledger_query_repository;
mod settlement_command;
mod settlement_ledger;
mod user_repository;

#[cfg(test)]
pub use cart_command::MockCartCommand;
pub use cart_command::CartCommand;
#[cfg(test)]
pub use cart_query::MockCartQuery;
pub use cart_query::CartQuery;
#[cfg(test)]
pub use cart_repository::MockCartRepository;
pub use cart_repository::{CartRepository, CartRepositoryError, FixtureCartRepository};
#[cfg(test)]
pub use catalog_command::MockCatalogCommand;
pub use catalog_command::{
    CatalogCommand, CreateClassRequest, SetClassStatusRequest, UpdateClassRequest,
};
#[cfg(test)]
pub use catalog_query::MockCatalogQuery;
pub use catalog_query::CatalogQuery;
#[cfg(test)]
pub use class_repository::MockClassRepository;
pub use class_repository::{ClassRepository, ClassRepositoryError, FixtureClassRepository};
#[cfg(test)]
pub use dashboard_query::MockDashboardQuery;
pub use dashboard_query::DashboardQuery;
#[cfg(test)]
pub use ledger_query_repository::MockLedgerQueryRepository;
pub use ledger_query_repository::{
    FixtureLedgerQueryRepository, LedgerQueryRepository, LedgerQueryRepositoryError,
};
#[cfg(test)]
pub use settlement_command::MockSettlementCommand;
pub use settlement_command::SettlementCommand;
#[cfg(test)]
pub use settlement_ledger::MockSettlementLedger;
pub use settlement_ledger::{SettlementLedger, SettlementLedgerError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{FixtureUserRepository, UserRepository, UserRepositoryError};
