//! Driving port for catalog reads.

use async_trait::async_trait;

use crate::domain::{Class, ClassId, Error, UserEmail};

/// Driving port for class listings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    /// One class, or `not_found`.
    async fn get(&self, class_id: &ClassId) -> Result<Class, Error>;

    /// Classes submitted by one instructor, in submission order.
    async fn list_by_instructor(&self, instructor_email: &UserEmail) -> Result<Vec<Class>, Error>;

    /// Classes visible to students.
    async fn list_approved(&self) -> Result<Vec<Class>, Error>;

    /// Every class, for the admin manage view.
    async fn list_all(&self) -> Result<Vec<Class>, Error>;
}
