//! In-process ledger store.
//!
//! [`InMemoryLedgerStore`] implements every driven port over one
//! `tokio::sync::RwLock`. A settlement takes the write lock once, checks
//! every purchased class and only then applies the writes, so it is as
//! atomic as the PostgreSQL transaction and seat counters cannot oversell.
//! Used by tests and local runs without a database.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::ports::{
    CartRepository, CartRepositoryError, ClassRepository, ClassRepositoryError,
    LedgerQueryRepository, LedgerQueryRepositoryError, SettlementLedger, SettlementLedgerError,
    UserRepository, UserRepositoryError,
};
use crate::domain::views;
use crate::domain::{
    AdminStats, CartItem, Class, ClassDetails, ClassId, ClassStatus, Enrollment, Payment, Role,
    SettledTransaction, SettlementPlan, SettlementReceipt, StatusChange, TransactionRef, User,
    UserEmail,
};

#[derive(Debug, Default)]
struct LedgerState {
    /// Classes in insertion order.
    classes: Vec<Class>,
    class_index: HashMap<ClassId, usize>,
    users: HashMap<UserEmail, User>,
    /// Cart entries in insertion order.
    cart: Vec<CartItem>,
    enrollments: Vec<Enrollment>,
    payments: Vec<Payment>,
}

impl LedgerState {
    fn class(&self, id: &ClassId) -> Option<&Class> {
        self.class_index
            .get(id)
            .and_then(|index| self.classes.get(*index))
    }

    fn class_mut(&mut self, id: &ClassId) -> Option<&mut Class> {
        let index = *self.class_index.get(id)?;
        self.classes.get_mut(index)
    }

    fn payment_for(&self, transaction_ref: &TransactionRef) -> Option<&Payment> {
        self.payments
            .iter()
            .find(|payment| &payment.transaction_ref == transaction_ref)
    }

    /// Verify every purchased class can take one more enrollment.
    fn check_seats(&self, plan: &SettlementPlan) -> Result<(), SettlementLedgerError> {
        for class_id in plan.class_ids() {
            let class = self
                .class(class_id)
                .ok_or_else(|| SettlementLedgerError::class_not_found(*class_id))?;
            if !class.has_seat() {
                return Err(SettlementLedgerError::seats_exhausted(*class_id));
            }
        }
        Ok(())
    }
}

/// Ledger store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClassRepository for InMemoryLedgerStore {
    async fn insert(&self, class: &Class) -> Result<(), ClassRepositoryError> {
        let mut state = self.state.write().await;
        if state.class_index.contains_key(&class.id) {
            return Err(ClassRepositoryError::query(format!(
                "class {} already exists",
                class.id
            )));
        }
        let index = state.classes.len();
        state.classes.push(class.clone());
        state.class_index.insert(class.id, index);
        Ok(())
    }

    async fn find_by_id(&self, id: &ClassId) -> Result<Option<Class>, ClassRepositoryError> {
        Ok(self.state.read().await.class(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[ClassId]) -> Result<Vec<Class>, ClassRepositoryError> {
        let state = self.state.read().await;
        let wanted: HashSet<&ClassId> = ids.iter().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.class(id).cloned())
            .collect())
    }

    async fn list_by_instructor(
        &self,
        instructor_email: &UserEmail,
    ) -> Result<Vec<Class>, ClassRepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .classes
            .iter()
            .filter(|class| &class.instructor_email == instructor_email)
            .cloned()
            .collect())
    }

    async fn list_by_status(
        &self,
        status: ClassStatus,
    ) -> Result<Vec<Class>, ClassRepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .classes
            .iter()
            .filter(|class| class.status == status)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Class>, ClassRepositoryError> {
        Ok(self.state.read().await.classes.clone())
    }

    async fn update_details(
        &self,
        id: &ClassId,
        details: &ClassDetails,
    ) -> Result<Option<Class>, ClassRepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.class_mut(id).map(|class| {
            class.apply_details(details);
            class.clone()
        }))
    }

    async fn update_status(
        &self,
        id: &ClassId,
        change: &StatusChange,
    ) -> Result<Option<Class>, ClassRepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.class_mut(id).map(|class| {
            class.apply_status(change);
            class.clone()
        }))
    }

    async fn most_enrolled(&self, limit: usize) -> Result<Vec<Class>, ClassRepositoryError> {
        let classes = self.state.read().await.classes.clone();
        Ok(views::rank_classes(classes, limit))
    }
}

#[async_trait]
impl UserRepository for InMemoryLedgerStore {
    async fn upsert(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut state = self.state.write().await;
        state.users.insert(user.email().clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.state.read().await.users.get(email).cloned())
    }

    async fn find_by_emails(&self, emails: &[UserEmail]) -> Result<Vec<User>, UserRepositoryError> {
        let state = self.state.read().await;
        let wanted: HashSet<&UserEmail> = emails.iter().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|email| state.users.get(email).cloned())
            .collect())
    }
}

#[async_trait]
impl CartRepository for InMemoryLedgerStore {
    async fn insert(&self, item: &CartItem) -> Result<(), CartRepositoryError> {
        let mut state = self.state.write().await;
        let taken = state
            .cart
            .iter()
            .any(|held| held.user_email == item.user_email && held.class_id == item.class_id);
        if taken {
            return Err(CartRepositoryError::duplicate_entry(item.class_id));
        }
        state.cart.push(item.clone());
        Ok(())
    }

    async fn find(
        &self,
        user_email: &UserEmail,
        class_id: &ClassId,
    ) -> Result<Option<CartItem>, CartRepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .cart
            .iter()
            .find(|item| &item.user_email == user_email && &item.class_id == class_id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<CartItem>, CartRepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .cart
            .iter()
            .filter(|item| &item.user_email == user_email)
            .cloned()
            .collect())
    }

    async fn remove_for_user(
        &self,
        user_email: &UserEmail,
        class_id: &ClassId,
    ) -> Result<u64, CartRepositoryError> {
        let mut state = self.state.write().await;
        let before = state.cart.len();
        state
            .cart
            .retain(|item| !(&item.user_email == user_email && &item.class_id == class_id));
        Ok((before - state.cart.len()) as u64)
    }
}

#[async_trait]
impl SettlementLedger for InMemoryLedgerStore {
    async fn find_settlement(
        &self,
        transaction_ref: &TransactionRef,
    ) -> Result<Option<SettledTransaction>, SettlementLedgerError> {
        let state = self.state.read().await;
        let Some(payment) = state.payment_for(transaction_ref) else {
            return Ok(None);
        };
        let enrollment = state
            .enrollments
            .iter()
            .find(|enrollment| &enrollment.transaction_ref == transaction_ref)
            .ok_or_else(|| {
                SettlementLedgerError::lookup(format!(
                    "payment {transaction_ref} has no enrollment"
                ))
            })?;
        Ok(Some(SettledTransaction {
            payment: payment.clone(),
            enrollment: enrollment.clone(),
        }))
    }

    async fn apply_settlement(
        &self,
        plan: &SettlementPlan,
    ) -> Result<SettlementReceipt, SettlementLedgerError> {
        let mut state = self.state.write().await;
        if state.payment_for(plan.transaction_ref()).is_some() {
            return Err(SettlementLedgerError::duplicate_transaction(
                plan.transaction_ref().clone(),
            ));
        }
        state.check_seats(plan)?;

        let mut counters = Vec::with_capacity(plan.class_ids().len());
        for class_id in plan.class_ids() {
            let class = state
                .class_mut(class_id)
                .ok_or_else(|| SettlementLedgerError::class_not_found(*class_id))?;
            if !class.reserve_seat() {
                return Err(SettlementLedgerError::seats_exhausted(*class_id));
            }
            counters.push(class.counters());
        }
        state.enrollments.push(plan.enrollment.clone());
        state.payments.push(plan.payment.clone());

        let before = state.cart.len();
        state.cart.retain(|item| {
            !(&item.user_email == plan.user_email() && plan.class_ids().contains(&item.class_id))
        });
        let cart_items_removed = (before - state.cart.len()) as u64;

        debug!(
            transaction_ref = %plan.transaction_ref(),
            cart_items_removed,
            "in-memory settlement applied"
        );
        Ok(SettlementReceipt {
            transaction_ref: plan.transaction_ref().clone(),
            user_email: plan.user_email().clone(),
            enrollment_id: plan.enrollment.id,
            payment_id: plan.payment.id,
            classes: counters,
            cart_items_removed,
        })
    }
}

#[async_trait]
impl LedgerQueryRepository for InMemoryLedgerStore {
    async fn enrollments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<Enrollment>, LedgerQueryRepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .filter(|enrollment| &enrollment.user_email == user_email)
            .cloned()
            .collect())
    }

    async fn payments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<Payment>, LedgerQueryRepositoryError> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .iter()
            .rev()
            .filter(|payment| &payment.user_email == user_email)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(payments)
    }

    async fn count_payments_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<u64, LedgerQueryRepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .iter()
            .filter(|payment| &payment.user_email == user_email)
            .count() as u64)
    }

    async fn admin_stats(&self) -> Result<AdminStats, LedgerQueryRepositoryError> {
        let state = self.state.read().await;
        let mut stats = AdminStats::default();
        for class in &state.classes {
            stats.record_class(class.status);
        }
        stats.instructors = state
            .users
            .values()
            .filter(|user| user.role() == Role::Instructor)
            .count() as u64;
        stats.total_enrollments = state.enrollments.len() as u64;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests;
