//! Read port over the append-only ledger collections.

use async_trait::async_trait;

use crate::domain::{AdminStats, Enrollment, Payment, UserEmail};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger query adapters.
    pub enum LedgerQueryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "ledger query connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "ledger query failed: {message}",
    }
}

/// Reads over enrollments, payments and the admin counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerQueryRepository: Send + Sync {
    /// Enrollments of one user, oldest first.
    async fn enrollments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<Enrollment>, LedgerQueryRepositoryError>;

    /// Payments of one user, newest first.
    async fn payments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<Payment>, LedgerQueryRepositoryError>;

    /// Number of payments recorded for one user.
    async fn count_payments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<u64, LedgerQueryRepositoryError>;

    /// Admin dashboard counters, all read from one consistent snapshot.
    async fn admin_stats(&self) -> Result<AdminStats, LedgerQueryRepositoryError>;
}

/// Fixture implementation over an empty ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLedgerQueryRepository;

#[async_trait]
impl LedgerQueryRepository for FixtureLedgerQueryRepository {
    async fn enrollments_for_user(
        &self,
        _user_email: &UserEmail,
    ) -> Result<Vec<Enrollment>, LedgerQueryRepositoryError> {
        Ok(Vec::new())
    }

    async fn payments_for_user(
        &self,
        _user_email: &UserEmail,
    ) -> Result<Vec<Payment>, LedgerQueryRepositoryError> {
        Ok(Vec::new())
    }

    async fn count_payments_for_user(
        &self,
        _user_email: &UserEmail,
    ) -> Result<u64, LedgerQueryRepositoryError> {
        Ok(0)
    }

    async fn admin_stats(&self) -> Result<AdminStats, LedgerQueryRepositoryError> {
        Ok(AdminStats::default())
    }
}
