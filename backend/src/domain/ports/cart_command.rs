//! Driving port for cart changes.

use async_trait::async_trait;

use crate::domain::{CartItem, ClassId, Error, Principal};

/// Driving port for adding and removing cart entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartCommand: Send + Sync {
    /// Put a class in the principal's cart.
    ///
    /// Adding a class that is already in the cart returns the existing entry.
    async fn add(&self, principal: &Principal, class_id: &ClassId) -> Result<CartItem, Error>;

    /// Remove a class from the principal's cart. Returns whether an entry was
    /// removed; other users' entries are never touched.
    async fn remove(&self, principal: &Principal, class_id: &ClassId) -> Result<bool, Error>;
}
