//! PostgreSQL-backed `SettlementLedger` implementation using Diesel ORM.
//!
//! A settlement runs in one transaction:
//!
//! 1. `UPDATE classes SET available_seats = available_seats - 1,
//!    total_enrolled = total_enrolled + 1 WHERE id = $1 AND
//!    available_seats > 0` for each purchased class, in ascending id order
//!    so overlapping settlements acquire row locks in the same sequence. An
//!    update touching no row means the class is missing or sold out and the
//!    transaction is rolled back. Counters are reported in purchase order.
//! 2. Insert the enrollment.
//! 3. Insert the payment. The unique `transaction_ref` turns a concurrent
//!    replay into [`SettlementLedgerError::DuplicateTransaction`].
//! 4. Delete the buyer's cart rows for the purchased classes.
//!
//! The conditional update takes a row lock, so concurrent buyers of the last
//! seat serialise on it and exactly one of them sees `available_seats > 0`.
//! Deadlocks and serialization failures still abort the transaction as a
//! retryable [`SettlementLedgerError::Connection`].

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{SettlementLedger, SettlementLedgerError};
use crate::domain::{
    ClassId, Enrollment, Payment, SeatCounters, SettledTransaction, SettlementPlan,
    SettlementReceipt, SettlementStage, TransactionRef,
};

use super::diesel_basic_error_mapping::{
    connection_lost, describe_diesel_error, log_diesel_error, map_basic_diesel_error,
    map_basic_pool_error, transaction_aborted, unique_violation,
};
use super::models::{EnrollmentRow, NewEnrollmentRow, NewPaymentRow, PaymentRow, RowDecodeError};
use super::pool::{DbPool, PoolError};
use super::schema::{cart_items, classes, enrollments, payments};

/// Diesel-backed implementation of the [`SettlementLedger`] port.
#[derive(Clone)]
pub struct DieselSettlementLedger {
    pool: DbPool,
}

impl DieselSettlementLedger {
    /// Create a ledger that settles through connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure raised inside the settlement transaction.
#[derive(Debug)]
enum SettlementFailure {
    /// Diesel failed. `stage` is `None` for `BEGIN` and `COMMIT`.
    Storage {
        stage: Option<SettlementStage>,
        error: DieselError,
    },
    /// The ledger refused the settlement.
    Rejected(SettlementLedgerError),
}

impl From<DieselError> for SettlementFailure {
    fn from(error: DieselError) -> Self {
        Self::Storage { stage: None, error }
    }
}

impl SettlementFailure {
    fn at(stage: SettlementStage) -> impl FnOnce(DieselError) -> Self {
        move |error| Self::Storage {
            stage: Some(stage),
            error,
        }
    }

    fn into_ledger_error(self, transaction_ref: &TransactionRef) -> SettlementLedgerError {
        let (stage, error) = match self {
            Self::Rejected(rejection) => return rejection,
            Self::Storage { stage, error } => (stage, error),
        };
        log_diesel_error(&error);
        let description = describe_diesel_error(&error);
        match stage {
            Some(SettlementStage::RecordEnrollment | SettlementStage::RecordPayment)
                if unique_violation(&error, None) =>
            {
                SettlementLedgerError::duplicate_transaction(transaction_ref.clone())
            }
            _ if connection_lost(&error) || transaction_aborted(&error) => {
                SettlementLedgerError::connection(description)
            }
            Some(stage) => SettlementLedgerError::query(stage, description),
            None => SettlementLedgerError::connection(description),
        }
    }
}

fn map_pool_error(error: PoolError) -> SettlementLedgerError {
    map_basic_pool_error(error, SettlementLedgerError::connection)
}

fn map_lookup_error(error: DieselError) -> SettlementLedgerError {
    map_basic_diesel_error(
        error,
        SettlementLedgerError::lookup,
        SettlementLedgerError::connection,
    )
}

fn seat_counters(
    class_id: ClassId,
    available_seats: i32,
    total_enrolled: i32,
) -> Result<SeatCounters, SettlementFailure> {
    let decode = |_| {
        SettlementFailure::Rejected(SettlementLedgerError::query(
            SettlementStage::ReserveSeats,
            format!("class {class_id} has negative seat counters"),
        ))
    };
    Ok(SeatCounters {
        class_id,
        available_seats: u32::try_from(available_seats).map_err(decode)?,
        total_enrolled: u32::try_from(total_enrolled).map_err(decode)?,
    })
}

/// Take one seat of `class_id`, or explain why none could be taken.
async fn reserve_seat(
    conn: &mut AsyncPgConnection,
    class_id: ClassId,
) -> Result<SeatCounters, SettlementFailure> {
    let stage = SettlementStage::ReserveSeats;
    let updated: Option<(i32, i32)> = diesel::update(
        classes::table
            .filter(classes::id.eq(class_id.as_uuid()))
            .filter(classes::available_seats.gt(0)),
    )
    .set((
        classes::available_seats.eq(classes::available_seats - 1),
        classes::total_enrolled.eq(classes::total_enrolled + 1),
    ))
    .returning((classes::available_seats, classes::total_enrolled))
    .get_result(conn)
    .await
    .optional()
    .map_err(SettlementFailure::at(stage))?;

    if let Some((available_seats, total_enrolled)) = updated {
        return seat_counters(class_id, available_seats, total_enrolled);
    }

    let exists: bool = diesel::select(diesel::dsl::exists(
        classes::table.filter(classes::id.eq(class_id.as_uuid())),
    ))
    .get_result(conn)
    .await
    .map_err(SettlementFailure::at(stage))?;

    Err(SettlementFailure::Rejected(if exists {
        SettlementLedgerError::seats_exhausted(class_id)
    } else {
        SettlementLedgerError::class_not_found(class_id)
    }))
}

/// Purchased classes sorted by id, the order in which their rows are locked.
fn locking_order(purchased: &[ClassId]) -> Vec<ClassId> {
    let mut ordered = purchased.to_vec();
    ordered.sort_unstable();
    ordered
}

/// Rearrange counters reserved in locking order back into purchase order.
fn in_purchase_order(purchased: &[ClassId], mut reserved: Vec<SeatCounters>) -> Vec<SeatCounters> {
    reserved.sort_by_key(|counters| {
        purchased
            .iter()
            .position(|class_id| *class_id == counters.class_id)
    });
    reserved
}

async fn apply_in_transaction(
    conn: &mut AsyncPgConnection,
    plan: &SettlementPlan,
) -> Result<(Vec<SeatCounters>, usize), SettlementFailure> {
    let enrollment_row = NewEnrollmentRow::from(&plan.enrollment);
    let payment_row = NewPaymentRow::from_payment(&plan.payment).map_err(|error| {
        SettlementFailure::Rejected(SettlementLedgerError::query(
            SettlementStage::RecordPayment,
            error.to_string(),
        ))
    })?;
    let purchased: Vec<uuid::Uuid> = plan.class_ids().iter().map(|id| *id.as_uuid()).collect();
    let buyer = plan.user_email().as_ref();

    conn.transaction(|conn| {
        async move {
            let mut reserved = Vec::with_capacity(plan.class_ids().len());
            for class_id in locking_order(plan.class_ids()) {
                reserved.push(reserve_seat(conn, class_id).await?);
            }
            let counters = in_purchase_order(plan.class_ids(), reserved);

            diesel::insert_into(enrollments::table)
                .values(&enrollment_row)
                .execute(conn)
                .await
                .map_err(SettlementFailure::at(SettlementStage::RecordEnrollment))?;

            diesel::insert_into(payments::table)
                .values(&payment_row)
                .execute(conn)
                .await
                .map_err(SettlementFailure::at(SettlementStage::RecordPayment))?;

            let removed = diesel::delete(
                cart_items::table
                    .filter(cart_items::user_email.eq(buyer))
                    .filter(cart_items::class_id.eq_any(purchased)),
            )
            .execute(conn)
            .await
            .map_err(SettlementFailure::at(SettlementStage::ClearCart))?;

            Ok((counters, removed))
        }
        .scope_boxed()
    })
    .await
}

#[async_trait]
impl SettlementLedger for DieselSettlementLedger {
    async fn find_settlement(
        &self,
        transaction_ref: &TransactionRef,
    ) -> Result<Option<SettledTransaction>, SettlementLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let payment: Option<PaymentRow> = payments::table
            .filter(payments::transaction_ref.eq(transaction_ref.as_ref()))
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_lookup_error)?;
        let Some(payment) = payment else {
            return Ok(None);
        };

        let enrollment: Option<EnrollmentRow> = enrollments::table
            .filter(enrollments::transaction_ref.eq(transaction_ref.as_ref()))
            .select(EnrollmentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_lookup_error)?;
        let enrollment = enrollment.ok_or_else(|| {
            SettlementLedgerError::lookup(format!("payment {transaction_ref} has no enrollment"))
        })?;

        let decode = |error: RowDecodeError| {
            SettlementLedgerError::lookup(error.to_string())
        };
        Ok(Some(SettledTransaction {
            payment: Payment::try_from(payment).map_err(decode)?,
            enrollment: Enrollment::try_from(enrollment).map_err(decode)?,
        }))
    }

    async fn apply_settlement(
        &self,
        plan: &SettlementPlan,
    ) -> Result<SettlementReceipt, SettlementLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let (classes, removed) = apply_in_transaction(&mut conn, plan)
            .await
            .map_err(|failure| failure.into_ledger_error(plan.transaction_ref()))?;

        debug!(
            transaction_ref = %plan.transaction_ref(),
            cart_items_removed = removed,
            "settlement committed"
        );
        Ok(SettlementReceipt {
            transaction_ref: plan.transaction_ref().clone(),
            user_email: plan.user_email().clone(),
            enrollment_id: plan.enrollment.id,
            payment_id: plan.payment.id,
            classes,
            cart_items_removed: removed as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Failure classification for the settlement transaction.
    use super::*;
    use diesel::result::DatabaseErrorKind;
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new("database said no".to_string()))
    }

    fn reference() -> TransactionRef {
        TransactionRef::new("pi_123").expect("valid reference")
    }

    #[rstest]
    #[case(SettlementStage::RecordEnrollment)]
    #[case(SettlementStage::RecordPayment)]
    fn unique_violation_on_record_is_a_duplicate(#[case] stage: SettlementStage) {
        let failure = SettlementFailure::at(stage)(database_error(DatabaseErrorKind::UniqueViolation));

        assert_eq!(
            failure.into_ledger_error(&reference()),
            SettlementLedgerError::duplicate_transaction(reference())
        );
    }

    #[rstest]
    fn unique_violation_elsewhere_keeps_its_stage() {
        let failure = SettlementFailure::at(SettlementStage::ClearCart)(database_error(
            DatabaseErrorKind::UniqueViolation,
        ));

        assert_eq!(
            failure.into_ledger_error(&reference()),
            SettlementLedgerError::query(SettlementStage::ClearCart, "database error")
        );
    }

    #[rstest]
    fn lost_connection_is_a_connection_error() {
        let failure = SettlementFailure::at(SettlementStage::ReserveSeats)(database_error(
            DatabaseErrorKind::ClosedConnection,
        ));

        assert!(matches!(
            failure.into_ledger_error(&reference()),
            SettlementLedgerError::Connection { .. }
        ));
    }

    #[rstest]
    #[case(DatabaseErrorKind::SerializationFailure, "could not serialize access")]
    #[case(DatabaseErrorKind::Unknown, "deadlock detected")]
    fn aborted_transactions_are_connection_errors(
        #[case] kind: DatabaseErrorKind,
        #[case] message: &str,
    ) {
        let failure = SettlementFailure::at(SettlementStage::ReserveSeats)(DieselError::DatabaseError(
            kind,
            Box::new(message.to_string()),
        ));

        assert!(matches!(
            failure.into_ledger_error(&reference()),
            SettlementLedgerError::Connection { .. }
        ));
    }

    #[rstest]
    fn rows_lock_in_id_order_and_report_in_purchase_order() {
        let mut ids = [ClassId::random(), ClassId::random(), ClassId::random()];
        ids.sort_unstable();
        let [low, mid, high] = ids;
        let purchased = [high, low, mid];

        let locked = locking_order(&purchased);
        let reserved = locked
            .iter()
            .map(|class_id| SeatCounters {
                class_id: *class_id,
                available_seats: 1,
                total_enrolled: 1,
            })
            .collect();
        let reported: Vec<ClassId> = in_purchase_order(&purchased, reserved)
            .into_iter()
            .map(|counters| counters.class_id)
            .collect();

        assert_eq!(locked, vec![low, mid, high]);
        assert_eq!(reported, purchased.to_vec());
    }

    #[rstest]
    fn unstaged_failure_is_a_connection_error() {
        let failure = SettlementFailure::from(DieselError::BrokenTransactionManager);

        assert!(matches!(
            failure.into_ledger_error(&reference()),
            SettlementLedgerError::Connection { .. }
        ));
    }

    #[rstest]
    fn rejection_passes_through() {
        let class_id = ClassId::random();
        let failure =
            SettlementFailure::Rejected(SettlementLedgerError::seats_exhausted(class_id));

        assert_eq!(
            failure.into_ledger_error(&reference()),
            SettlementLedgerError::seats_exhausted(class_id)
        );
    }

    #[rstest]
    fn negative_counters_are_rejected() {
        let failure = seat_counters(ClassId::random(), -1, 3).expect_err("corrupt counters");

        assert!(matches!(
            failure,
            SettlementFailure::Rejected(SettlementLedgerError::Query {
                stage: SettlementStage::ReserveSeats,
                ..
            })
        ));
    }
}
