//! Port for cart entries.
//!
//! Storage enforces at most one entry per `(user_email, class_id)`; a second
//! insert for the same pair fails with
//! [`CartRepositoryError::DuplicateEntry`].

use async_trait::async_trait;

use crate::domain::{CartItem, ClassId, UserEmail};

use super::define_port_error;

define_port_error! {
    /// Errors raised by cart repository adapters.
    pub enum CartRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "cart repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "cart repository query failed: {message}",
        /// The user already holds an entry for this class.
        DuplicateEntry { class_id: ClassId } =>
            "class {class_id} is already in the cart",
    }
}

/// Storage for cart entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Insert a new entry.
    async fn insert(&self, item: &CartItem) -> Result<(), CartRepositoryError>;

    /// Fetch the user's entry for one class.
    async fn find(
        &self,
        user_email: &UserEmail,
        class_id: &ClassId,
    ) -> Result<Option<CartItem>, CartRepositoryError>;

    /// Every entry of one user, oldest first.
    async fn list_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<CartItem>, CartRepositoryError>;

    /// Remove the user's entry for one class, returning how many rows went.
    async fn remove_for_user(
        &self,
        user_email: &UserEmail,
        class_id: &ClassId,
    ) -> Result<u64, CartRepositoryError>;
}

/// Fixture implementation with an always-empty cart.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCartRepository;

#[async_trait]
impl CartRepository for FixtureCartRepository {
    async fn insert(&self, _item: &CartItem) -> Result<(), CartRepositoryError> {
        Ok(())
    }

    async fn find(
        &self,
        _user_email: &UserEmail,
        _class_id: &ClassId,
    ) -> Result<Option<CartItem>, CartRepositoryError> {
        Ok(None)
    }

    async fn list_for_user(
        &self,
        _user_email: &UserEmail,
    ) -> Result<Vec<CartItem>, CartRepositoryError> {
        Ok(Vec::new())
    }

    async fn remove_for_user(
        &self,
        _user_email: &UserEmail,
        _class_id: &ClassId,
    ) -> Result<u64, CartRepositoryError> {
        Ok(0)
    }
}
