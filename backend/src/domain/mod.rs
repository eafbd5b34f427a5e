//! Domain primitives, aggregates and services.
//!
//! Purpose: define strongly typed marketplace entities, the ports the core
//! talks through, and the services implementing the driving ports. Types
//! document their invariants and serde contracts in their own Rustdoc.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - User, Principal, Class, CartItem, Enrollment, Payment: ledger records.
//! - SettlementService, CatalogService, CartService, DashboardService: the
//!   driving port implementations.

pub mod cart;
pub mod cart_service;
pub mod catalog_service;
pub mod class;
pub mod dashboard_service;
pub mod deadline;
pub mod error;
pub mod ledger;
pub mod ports;
pub mod settlement;
pub mod settlement_service;
pub mod user;
pub mod views;

pub use self::cart::{CartItem, CartItemId, CartLine};
pub use self::cart_service::CartService;
pub use self::catalog_service::CatalogService;
pub use self::class::{
    Class, ClassDetails, ClassDraft, ClassId, ClassStatus, ClassValidationError, SeatCounters,
    StatusChange,
};
pub use self::dashboard_service::DashboardService;
pub use self::deadline::{DEFAULT_STORAGE_TIMEOUT, ServiceTimeouts};
pub use self::error::{Error, ErrorCode, ErrorValidationError, FieldViolation};
pub use self::ledger::{
    Amount, Enrollment, EnrollmentId, Payment, PaymentId, TransactionRef,
    TransactionRefValidationError,
};
pub use self::settlement::{
    PurchaseValidationError, PurchasedClasses, SettledTransaction, SettlementOutcome,
    SettlementPlan, SettlementReceipt, SettlementRequest, SettlementStage,
};
pub use self::settlement_service::SettlementService;
pub use self::user::{Principal, Role, User, UserEmail, UserId, UserValidationError};
pub use self::views::{AdminStats, EnrolledClassView, InstructorPopularity};

/// Convenient result alias for driving port calls.
///
/// # Examples
/// ```
/// use marketplace::domain::{Error, LedgerResult};
///
/// fn lookup() -> LedgerResult<u32> {
///     Err(Error::not_found("class missing"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type LedgerResult<T> = Result<T, Error>;
