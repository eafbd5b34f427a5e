//! Port for the settlement unit of work.
//!
//! [`SettlementLedger::apply_settlement`] performs every settlement step in
//! a single storage transaction:
//!
//! 1. For each purchased class, `available_seats -= 1` and
//!    `total_enrolled += 1`, conditional on `available_seats > 0`.
//! 2. Insert the enrollment.
//! 3. Insert the payment; `transaction_ref` is unique.
//! 4. Delete the buyer's cart entries for the purchased classes.
//!
//! Any failure rolls back all of the above.

use async_trait::async_trait;

use crate::domain::{
    ClassId, SettledTransaction, SettlementPlan, SettlementReceipt, SettlementStage,
    TransactionRef,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by settlement ledger adapters.
    pub enum SettlementLedgerError {
        /// Storage connection could not be established.
        Connection { message: String } =>
            "settlement ledger connection failed: {message}",
        /// Looking up an earlier settlement failed.
        Lookup { message: String } =>
            "settlement lookup failed: {message}",
        /// A settlement step failed; nothing was written.
        Query { stage: SettlementStage, message: String } =>
            "settlement failed at {stage}: {message}",
        /// A purchased class does not exist.
        ClassNotFound { class_id: ClassId } =>
            "class {class_id} does not exist",
        /// A purchased class has no seats left.
        SeatsExhausted { class_id: ClassId } =>
            "class {class_id} has no seats left",
        /// A payment with this reference was committed concurrently.
        DuplicateTransaction { transaction_ref: TransactionRef } =>
            "transaction {transaction_ref} is already settled",
    }
}

/// Transactional settlement storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Fetch the payment and enrollment recorded under a reference.
    async fn find_settlement(
        &self,
        transaction_ref: &TransactionRef,
    ) -> Result<Option<SettledTransaction>, SettlementLedgerError>;

    /// Apply a settlement atomically.
    ///
    /// The receipt carries the post-settlement counters of every purchased
    /// class in purchase order.
    async fn apply_settlement(
        &self,
        plan: &SettlementPlan,
    ) -> Result<SettlementReceipt, SettlementLedgerError>;
}
