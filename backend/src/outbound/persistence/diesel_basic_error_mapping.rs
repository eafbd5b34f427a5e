//! Shared Diesel error mapping for the ledger repositories.
//!
//! Repositories whose port error only distinguishes connection failures
//! from query failures route through [`map_basic_pool_error`] and
//! [`map_basic_diesel_error`]. Adapters with richer errors use
//! [`unique_violation`] to pick out constraint conflicts first. Deadlocks
//! and serialization failures are reported through the connection
//! constructor, which callers surface as retryable.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub(crate) fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Log a Diesel failure at debug level without leaking row data.
pub(crate) fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            "diesel operation failed"
        ),
    }
}

/// Whether `error` is a unique violation, optionally of one named constraint.
pub(crate) fn unique_violation(error: &DieselError, constraint: Option<&str>) -> bool {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            constraint.is_none_or(|wanted| info.constraint_name() == Some(wanted))
        }
        _ => false,
    }
}

/// Whether `error` means the connection itself is gone.
pub(crate) fn connection_lost(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
            | DieselError::BrokenTransactionManager
    )
}

/// Whether PostgreSQL aborted the transaction to resolve a lock or
/// snapshot conflict. Retrying the whole transaction can succeed.
pub(crate) fn transaction_aborted(error: &DieselError) -> bool {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => true,
        DieselError::DatabaseError(_, info) => info.message().starts_with("deadlock detected"),
        _ => false,
    }
}

/// Short, data-free description of a Diesel failure.
pub(crate) fn describe_diesel_error(error: &DieselError) -> &'static str {
    match error {
        DieselError::NotFound => "record not found",
        DieselError::QueryBuilderError(_) => "database query error",
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            "serialization failure"
        }
        DieselError::DatabaseError(_, info) if info.message().starts_with("deadlock detected") => {
            "deadlock detected"
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _) => {
            "check constraint violated"
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => "database connection error",
        _ => "database error",
    }
}

/// Map Diesel errors into query or connection constructors.
pub(crate) fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: FnOnce(&'static str) -> E,
    C: FnOnce(&'static str) -> E,
{
    log_diesel_error(&error);
    let description = describe_diesel_error(&error);
    if connection_lost(&error) || transaction_aborted(&error) {
        connection(description)
    } else {
        query(description)
    }
}
