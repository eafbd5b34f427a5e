//! PostgreSQL-backed `LedgerQueryRepository` implementation using Diesel ORM.
//!
//! Admin statistics are read in one read-only `REPEATABLE READ` transaction
//! so every count observes the same snapshot. Enrollment and payment
//! listings break timestamp ties with `ledger_seq`, the insertion order.

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::ports::{LedgerQueryRepository, LedgerQueryRepositoryError};
use crate::domain::{AdminStats, ClassStatus, Enrollment, Payment, Role, UserEmail};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{EnrollmentRow, PaymentRow, RowDecodeError};
use super::pool::{DbPool, PoolError};
use super::schema::{classes, enrollments, payments, users};

/// Diesel-backed implementation of the [`LedgerQueryRepository`] port.
#[derive(Clone)]
pub struct DieselLedgerQueryRepository {
    pool: DbPool,
}

impl DieselLedgerQueryRepository {
    /// Create a repository reading from connections in `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> LedgerQueryRepositoryError {
    map_basic_pool_error(error, LedgerQueryRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> LedgerQueryRepositoryError {
    map_basic_diesel_error(
        error,
        LedgerQueryRepositoryError::query,
        LedgerQueryRepositoryError::connection,
    )
}

fn map_decode_error(error: RowDecodeError) -> LedgerQueryRepositoryError {
    LedgerQueryRepositoryError::query(error.to_string())
}

fn count(value: i64) -> Result<u64, LedgerQueryRepositoryError> {
    u64::try_from(value)
        .map_err(|_| LedgerQueryRepositoryError::query(format!("negative count {value}")))
}

/// Fold per-status class counts and the other totals into [`AdminStats`].
fn build_admin_stats(
    by_status: Vec<(String, i64)>,
    instructors: i64,
    total_enrollments: i64,
) -> Result<AdminStats, LedgerQueryRepositoryError> {
    let mut stats = AdminStats::default();
    for (status, classes) in by_status {
        let status = status
            .parse::<ClassStatus>()
            .map_err(|error| LedgerQueryRepositoryError::query(error.to_string()))?;
        stats.record_classes(status, count(classes)?);
    }
    stats.instructors = count(instructors)?;
    stats.total_enrollments = count(total_enrollments)?;
    Ok(stats)
}

#[async_trait]
impl LedgerQueryRepository for DieselLedgerQueryRepository {
    async fn enrollments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<Enrollment>, LedgerQueryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<EnrollmentRow> = enrollments::table
            .filter(enrollments::user_email.eq(user_email.as_ref()))
            .order_by((enrollments::enrolled_at.asc(), enrollments::ledger_seq.asc()))
            .select(EnrollmentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|row| Enrollment::try_from(row).map_err(map_decode_error))
            .collect()
    }

    async fn payments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<Payment>, LedgerQueryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<PaymentRow> = payments::table
            .filter(payments::user_email.eq(user_email.as_ref()))
            .order_by((payments::paid_at.desc(), payments::ledger_seq.desc()))
            .select(PaymentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|row| Payment::try_from(row).map_err(map_decode_error))
            .collect()
    }

    async fn count_payments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<u64, LedgerQueryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let total: i64 = payments::table
            .filter(payments::user_email.eq(user_email.as_ref()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        count(total)
    }

    async fn admin_stats(&self) -> Result<AdminStats, LedgerQueryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let (by_status, instructors, total_enrollments) = conn
            .build_transaction()
            .read_only()
            .repeatable_read()
            .run(|conn| {
                async move {
                    let by_status: Vec<(String, i64)> = classes::table
                        .group_by(classes::status)
                        .select((classes::status, count_star()))
                        .load(conn)
                        .await?;
                    let instructors: i64 = users::table
                        .filter(users::role.eq(Role::Instructor.as_str()))
                        .count()
                        .get_result(conn)
                        .await?;
                    let total_enrollments: i64 =
                        enrollments::table.count().get_result(conn).await?;
                    Ok::<_, DieselError>((by_status, instructors, total_enrollments))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        build_admin_stats(by_status, instructors, total_enrollments)
    }
}
