//! Port for class listing persistence.
//!
//! Listing methods return classes in insertion order. Seat and enrollment
//! counters are never written through this port: settlement owns them via
//! [`super::SettlementLedger`], and catalog edits go through
//! [`ClassRepository::update_details`] and [`ClassRepository::update_status`]
//! so that neither overwrites the other with a stale read.

use async_trait::async_trait;

use crate::domain::{Class, ClassDetails, ClassId, ClassStatus, StatusChange, UserEmail};

use super::define_port_error;

define_port_error! {
    /// Errors raised by class repository adapters.
    pub enum ClassRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "class repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "class repository query failed: {message}",
    }
}

/// Storage for class listings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassRepository: Send + Sync {
    /// Persist a newly submitted class.
    async fn insert(&self, class: &Class) -> Result<(), ClassRepositoryError>;

    /// Fetch one class.
    async fn find_by_id(&self, id: &ClassId) -> Result<Option<Class>, ClassRepositoryError>;

    /// Fetch every class whose id is listed. Unknown ids are skipped and the
    /// result order is unspecified.
    async fn find_by_ids(&self, ids: &[ClassId]) -> Result<Vec<Class>, ClassRepositoryError>;

    /// Classes submitted by one instructor.
    async fn list_by_instructor(
        &self,
        instructor_email: &UserEmail,
    ) -> Result<Vec<Class>, ClassRepositoryError>;

    /// Classes in one review status.
    async fn list_by_status(&self, status: ClassStatus)
    -> Result<Vec<Class>, ClassRepositoryError>;

    /// Every class regardless of status.
    async fn list_all(&self) -> Result<Vec<Class>, ClassRepositoryError>;

    /// Overwrite the editable fields and reset the class to pending.
    ///
    /// Returns the updated class, or `None` when the id is unknown.
    /// `total_enrolled` is left untouched.
    async fn update_details(
        &self,
        id: &ClassId,
        details: &ClassDetails,
    ) -> Result<Option<Class>, ClassRepositoryError>;

    /// Record a review decision. Returns `None` when the id is unknown.
    async fn update_status(
        &self,
        id: &ClassId,
        change: &StatusChange,
    ) -> Result<Option<Class>, ClassRepositoryError>;

    /// Up to `limit` classes ordered by `total_enrolled` descending, ties in
    /// insertion order.
    async fn most_enrolled(&self, limit: usize) -> Result<Vec<Class>, ClassRepositoryError>;
}

/// Fixture implementation for tests that do not exercise class storage.
///
/// Lookups find nothing and writes are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureClassRepository;

#[async_trait]
impl ClassRepository for FixtureClassRepository {
    async fn insert(&self, _class: &Class) -> Result<(), ClassRepositoryError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: &ClassId) -> Result<Option<Class>, ClassRepositoryError> {
        Ok(None)
    }

    async fn find_by_ids(&self, _ids: &[ClassId]) -> Result<Vec<Class>, ClassRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_by_instructor(
        &self,
        _instructor_email: &UserEmail,
    ) -> Result<Vec<Class>, ClassRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_by_status(
        &self,
        _status: ClassStatus,
    ) -> Result<Vec<Class>, ClassRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_all(&self) -> Result<Vec<Class>, ClassRepositoryError> {
        Ok(Vec::new())
    }

    async fn update_details(
        &self,
        _id: &ClassId,
        _details: &ClassDetails,
    ) -> Result<Option<Class>, ClassRepositoryError> {
        Ok(None)
    }

    async fn update_status(
        &self,
        _id: &ClassId,
        _change: &StatusChange,
    ) -> Result<Option<Class>, ClassRepositoryError> {
        Ok(None)
    }

    async fn most_enrolled(&self, _limit: usize) -> Result<Vec<Class>, ClassRepositoryError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn fixture_repository_finds_nothing() {
        let repo = FixtureClassRepository;

        let found = repo
            .find_by_id(&ClassId::random())
            .await
            .expect("fixture lookup should succeed");
        assert!(found.is_none());
        assert!(repo.most_enrolled(5).await.expect("fixture list").is_empty());
    }

    #[rstest]
    fn connection_error_formats_message() {
        let error = ClassRepositoryError::connection("pool exhausted");
        assert_eq!(
            error.to_string(),
            "class repository connection failed: pool exhausted"
        );
    }
}
