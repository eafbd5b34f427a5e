//! Settlement values: turning a confirmed payment into enrollment state.
//!
//! A settlement is keyed by its [`TransactionRef`]. The service validates a
//! [`SettlementRequest`], builds a [`SettlementPlan`] with fresh record ids
//! and timestamps, and hands the plan to the ledger port, which applies every
//! step in one storage transaction.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::class::{ClassId, SeatCounters};
use super::ledger::{Amount, Enrollment, EnrollmentId, Payment, PaymentId, TransactionRef};
use super::user::UserEmail;

/// Steps of a settlement, used to report where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStage {
    /// Conditional seat decrement on every purchased class.
    ReserveSeats,
    /// Enrollment insert.
    RecordEnrollment,
    /// Payment insert.
    RecordPayment,
    /// Removal of the purchased classes from the buyer's cart.
    ClearCart,
}

impl SettlementStage {
    /// Stable name used in logs and error details.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReserveSeats => "reserve_seats",
            Self::RecordEnrollment => "record_enrollment",
            Self::RecordPayment => "record_payment",
            Self::ClearCart => "clear_cart",
        }
    }
}

impl fmt::Display for SettlementStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for the purchased class list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseValidationError {
    NoClasses,
    DuplicateClass { class_id: ClassId },
}

impl fmt::Display for PurchaseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoClasses => write!(f, "a settlement must purchase at least one class"),
            Self::DuplicateClass { class_id } => {
                write!(f, "class {class_id} appears more than once in the purchase")
            }
        }
    }
}

impl std::error::Error for PurchaseValidationError {}

/// Non-empty, duplicate-free list of purchased classes in purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ClassId>", into = "Vec<ClassId>")]
pub struct PurchasedClasses(Vec<ClassId>);

impl PurchasedClasses {
    /// Purchased ids in purchase order.
    pub fn as_slice(&self) -> &[ClassId] {
        self.0.as_slice()
    }
}

impl TryFrom<Vec<ClassId>> for PurchasedClasses {
    type Error = PurchaseValidationError;

    fn try_from(class_ids: Vec<ClassId>) -> Result<Self, Self::Error> {
        if class_ids.is_empty() {
            return Err(PurchaseValidationError::NoClasses);
        }
        let mut seen = HashSet::with_capacity(class_ids.len());
        for class_id in &class_ids {
            if !seen.insert(*class_id) {
                return Err(PurchaseValidationError::DuplicateClass {
                    class_id: *class_id,
                });
            }
        }
        Ok(Self(class_ids))
    }
}

impl From<PurchasedClasses> for Vec<ClassId> {
    fn from(value: PurchasedClasses) -> Self {
        value.0
    }
}

/// Request to settle a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub user_email: UserEmail,
    pub class_ids: Vec<ClassId>,
    pub transaction_ref: TransactionRef,
    pub amount: Amount,
}

/// Fully materialised settlement handed to the ledger port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub enrollment: Enrollment,
    pub payment: Payment,
}

impl SettlementPlan {
    /// Build the records written by one settlement.
    pub fn new(
        user_email: UserEmail,
        classes: PurchasedClasses,
        transaction_ref: TransactionRef,
        amount: Amount,
        settled_at: DateTime<Utc>,
    ) -> Self {
        let class_ids: Vec<ClassId> = classes.into();
        Self {
            enrollment: Enrollment {
                id: EnrollmentId::random(),
                user_email: user_email.clone(),
                class_ids: class_ids.clone(),
                transaction_ref: transaction_ref.clone(),
                enrolled_at: settled_at,
            },
            payment: Payment {
                id: PaymentId::random(),
                user_email,
                class_ids,
                amount,
                transaction_ref,
                paid_at: settled_at,
            },
        }
    }

    /// Purchased class ids in purchase order.
    pub fn class_ids(&self) -> &[ClassId] {
        self.enrollment.class_ids.as_slice()
    }

    /// Buyer email.
    pub fn user_email(&self) -> &UserEmail {
        &self.enrollment.user_email
    }

    /// Idempotency key.
    pub fn transaction_ref(&self) -> &TransactionRef {
        &self.payment.transaction_ref
    }
}

/// Ledger records previously written for a transaction reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledTransaction {
    pub payment: Payment,
    pub enrollment: Enrollment,
}

impl SettledTransaction {
    /// Whether a retried request describes the same purchase.
    pub fn matches(&self, user_email: &UserEmail, class_ids: &[ClassId]) -> bool {
        &self.payment.user_email == user_email && self.enrollment.class_ids.as_slice() == class_ids
    }
}

/// Aggregate result of the settlement steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub transaction_ref: TransactionRef,
    pub user_email: UserEmail,
    pub enrollment_id: EnrollmentId,
    pub payment_id: PaymentId,
    /// Counters of every purchased class after settlement, in purchase order.
    pub classes: Vec<SeatCounters>,
    pub cart_items_removed: u64,
}

/// Settlement result returned to callers.
///
/// `replayed` is set when the transaction reference had already been settled
/// and nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutcome {
    pub receipt: SettlementReceipt,
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for settlement value types.
    use super::*;
    use rstest::rstest;

    fn email() -> UserEmail {
        UserEmail::new("a@x.com").expect("valid email")
    }

    #[rstest]
    fn empty_purchase_is_rejected() {
        assert_eq!(
            PurchasedClasses::try_from(Vec::new()),
            Err(PurchaseValidationError::NoClasses)
        );
    }

    #[rstest]
    fn duplicate_class_is_rejected() {
        let repeated = ClassId::random();
        let result = PurchasedClasses::try_from(vec![repeated, ClassId::random(), repeated]);
        assert_eq!(
            result,
            Err(PurchaseValidationError::DuplicateClass { class_id: repeated })
        );
    }

    #[rstest]
    fn plan_shares_ids_and_reference_between_records() {
        let first = ClassId::random();
        let second = ClassId::random();
        let classes = PurchasedClasses::try_from(vec![first, second]).expect("valid purchase");
        let reference = TransactionRef::new("t1").expect("valid reference");
        let now = Utc::now();

        let plan = SettlementPlan::new(
            email(),
            classes,
            reference.clone(),
            Amount::from_minor_units(5_000),
            now,
        );

        assert_eq!(plan.class_ids(), &[first, second]);
        assert_eq!(plan.payment.class_ids, plan.enrollment.class_ids);
        assert_eq!(plan.transaction_ref(), &reference);
        assert_eq!(plan.enrollment.enrolled_at, plan.payment.paid_at);
    }

    #[rstest]
    fn settled_transaction_matches_same_buyer_and_order_only() {
        let first = ClassId::random();
        let second = ClassId::random();
        let plan = SettlementPlan::new(
            email(),
            PurchasedClasses::try_from(vec![first, second]).expect("valid purchase"),
            TransactionRef::new("t1").expect("valid reference"),
            Amount::from_minor_units(1),
            Utc::now(),
        );
        let settled = SettledTransaction {
            payment: plan.payment,
            enrollment: plan.enrollment,
        };

        assert!(settled.matches(&email(), &[first, second]));
        assert!(!settled.matches(&email(), &[second, first]));
        let other = UserEmail::new("b@x.com").expect("valid email");
        assert!(!settled.matches(&other, &[first, second]));
    }
}
