//! Settlement domain service.
//!
//! Implements [`SettlementCommand`]: validates the purchase, resolves retries
//! through the transaction reference, and hands a [`SettlementPlan`] to the
//! [`SettlementLedger`], which applies it in one storage transaction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    ClassRepository, ClassRepositoryError, SettlementCommand, SettlementLedger,
    SettlementLedgerError,
};
use crate::domain::{
    Error, Principal, PurchasedClasses, ServiceTimeouts, SettledTransaction, SettlementOutcome,
    SettlementPlan, SettlementReceipt, SettlementRequest, SettlementStage,
};

/// Settlement service implementing the driving port.
#[derive(Clone)]
pub struct SettlementService<C, L> {
    class_repo: Arc<C>,
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    timeouts: ServiceTimeouts,
}

impl<C, L> SettlementService<C, L> {
    /// Create a new service.
    ///
    /// # Examples
    /// ```
    /// # use std::sync::Arc;
    /// # use mockable::DefaultClock;
    /// use marketplace::domain::{ServiceTimeouts, SettlementService};
    /// use marketplace::outbound::memory::InMemoryLedgerStore;
    ///
    /// let store = Arc::new(InMemoryLedgerStore::new());
    /// let _service = SettlementService::new(
    ///     store.clone(),
    ///     store,
    ///     Arc::new(DefaultClock),
    ///     ServiceTimeouts::default(),
    /// );
    /// ```
    pub fn new(
        class_repo: Arc<C>,
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        timeouts: ServiceTimeouts,
    ) -> Self {
        Self {
            class_repo,
            ledger,
            clock,
            timeouts,
        }
    }
}

impl<C, L> SettlementService<C, L>
where
    C: ClassRepository,
    L: SettlementLedger,
{
    fn map_ledger_error(error: SettlementLedgerError) -> Error {
        match error {
            SettlementLedgerError::Connection { message } => {
                Error::service_unavailable(format!("settlement ledger unavailable: {message}"))
            }
            SettlementLedgerError::Lookup { message } => {
                Error::internal(format!("settlement lookup failed: {message}"))
            }
            SettlementLedgerError::Query { stage, message } => {
                Error::internal(format!("settlement failed at {stage}: {message}"))
                    .with_details(json!({ "stage": stage.as_str() }))
            }
            SettlementLedgerError::ClassNotFound { class_id } => {
                Error::not_found(format!("class {class_id} does not exist"))
                    .with_details(json!({ "classId": class_id }))
            }
            SettlementLedgerError::SeatsExhausted { class_id } => {
                Error::insufficient_capacity(format!("class {class_id} has no seats left"))
                    .with_details(json!({
                        "classId": class_id,
                        "stage": SettlementStage::ReserveSeats.as_str(),
                    }))
            }
            SettlementLedgerError::DuplicateTransaction { transaction_ref } => {
                Self::reference_conflict(transaction_ref.as_ref())
            }
        }
    }

    fn map_class_error(error: ClassRepositoryError) -> Error {
        match error {
            ClassRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("class repository unavailable: {message}"))
            }
            ClassRepositoryError::Query { message } => {
                Error::internal(format!("class repository error: {message}"))
            }
        }
    }

    fn reference_conflict(transaction_ref: &str) -> Error {
        Error::conflict("transaction reference already settled with a different purchase")
            .with_details(json!({ "transactionRef": transaction_ref }))
    }

    fn validate(
        principal: &Principal,
        request: &SettlementRequest,
    ) -> Result<PurchasedClasses, Error> {
        if !principal.acts_for(&request.user_email) {
            warn!(
                principal = %principal.email,
                buyer = %request.user_email,
                "settlement refused for foreign buyer"
            );
            return Err(Error::forbidden(
                "only the buyer or an admin may settle a purchase",
            ));
        }
        PurchasedClasses::try_from(request.class_ids.clone()).map_err(Error::from)
    }

    /// Rebuild the receipt of an earlier settlement from its ledger records.
    ///
    /// Counters reflect the classes as they are now; nothing is written.
    async fn replay(
        &self,
        settled: SettledTransaction,
        request: &SettlementRequest,
    ) -> Result<SettlementOutcome, Error> {
        if !settled.matches(&request.user_email, &request.class_ids) {
            warn!(
                transaction_ref = %request.transaction_ref,
                "transaction reference reused with a different purchase"
            );
            return Err(Self::reference_conflict(request.transaction_ref.as_ref()));
        }

        let class_ids = settled.enrollment.class_ids;
        let classes = self
            .timeouts
            .bound(
                "load settled classes",
                self.class_repo.find_by_ids(&class_ids),
                Self::map_class_error,
            )
            .await?;
        let mut by_id: HashMap<_, _> = classes.into_iter().map(|c| (c.id, c)).collect();
        let counters = class_ids
            .iter()
            .filter_map(|class_id| by_id.remove(class_id))
            .map(|class| class.counters())
            .collect();

        info!(transaction_ref = %request.transaction_ref, "settlement replayed");
        Ok(SettlementOutcome {
            receipt: SettlementReceipt {
                transaction_ref: settled.payment.transaction_ref,
                user_email: settled.payment.user_email,
                enrollment_id: settled.enrollment.id,
                payment_id: settled.payment.id,
                classes: counters,
                cart_items_removed: 0,
            },
            replayed: true,
        })
    }

    async fn find_settled(
        &self,
        request: &SettlementRequest,
    ) -> Result<Option<SettledTransaction>, Error> {
        self.timeouts
            .bound(
                "find settlement",
                self.ledger.find_settlement(&request.transaction_ref),
                Self::map_ledger_error,
            )
            .await
    }

    async fn handle_duplicate_transaction_race(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementOutcome, Error> {
        match self.find_settled(request).await? {
            Some(settled) => self.replay(settled, request).await,
            None => Err(Error::internal(
                "settlement disappeared during duplicate resolution",
            )),
        }
    }
}

#[async_trait]
impl<C, L> SettlementCommand for SettlementService<C, L>
where
    C: ClassRepository,
    L: SettlementLedger,
{
    async fn settle(
        &self,
        principal: &Principal,
        request: SettlementRequest,
    ) -> Result<SettlementOutcome, Error> {
        let classes = Self::validate(principal, &request)?;

        if let Some(settled) = self.find_settled(&request).await? {
            return self.replay(settled, &request).await;
        }

        let plan = SettlementPlan::new(
            request.user_email.clone(),
            classes,
            request.transaction_ref.clone(),
            request.amount,
            self.clock.utc(),
        );

        match self
            .timeouts
            .run("apply settlement", self.ledger.apply_settlement(&plan))
            .await?
        {
            Ok(receipt) => {
                info!(
                    transaction_ref = %receipt.transaction_ref,
                    buyer = %receipt.user_email,
                    classes = receipt.classes.len(),
                    cart_items_removed = receipt.cart_items_removed,
                    "settlement applied"
                );
                Ok(SettlementOutcome {
                    receipt,
                    replayed: false,
                })
            }
            Err(SettlementLedgerError::DuplicateTransaction { .. }) => {
                self.handle_duplicate_transaction_race(&request).await
            }
            Err(err) => {
                warn!(
                    transaction_ref = %request.transaction_ref,
                    kind = err.kind(),
                    error = %err,
                    "settlement rejected"
                );
                Err(Self::map_ledger_error(err))
            }
        }
    }
}

#[cfg(test)]
#[path = "settlement_service_tests.rs"]
mod tests;
