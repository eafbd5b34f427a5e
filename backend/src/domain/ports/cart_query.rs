//! Driving port for cart reads.

use async_trait::async_trait;

use crate::domain::{CartLine, Error, UserEmail};

/// Driving port for rendering a cart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartQuery: Send + Sync {
    /// Cart entries of one user joined to their classes, oldest first.
    /// Entries whose class no longer resolves are omitted.
    async fn cart_for(&self, user_email: &UserEmail) -> Result<Vec<CartLine>, Error>;
}
