//! Driving port for dashboard projections.
//!
//! Projections never fail because a join target is missing; they only fail
//! when storage does.

use async_trait::async_trait;

use crate::domain::{
    AdminStats, Class, EnrolledClassView, Error, InstructorPopularity, Payment, UserEmail,
};

/// Driving port for the read-side views.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DashboardQuery: Send + Sync {
    /// Classes a student is enrolled in with their instructors, oldest
    /// enrollment first and purchase order within an enrollment.
    async fn enrolled_classes(&self, user_email: &UserEmail)
    -> Result<Vec<EnrolledClassView>, Error>;

    /// Up to `limit` classes by enrollment, most enrolled first.
    async fn popular_classes(&self, limit: usize) -> Result<Vec<Class>, Error>;

    /// Up to `limit` instructors by summed enrollment.
    async fn popular_instructors(&self, limit: usize) -> Result<Vec<InstructorPopularity>, Error>;

    /// Admin dashboard counters.
    async fn admin_stats(&self) -> Result<AdminStats, Error>;

    /// Payments of one user, newest first.
    async fn payment_history(&self, user_email: &UserEmail) -> Result<Vec<Payment>, Error>;

    /// Number of payments of one user.
    async fn payment_count(&self, user_email: &UserEmail) -> Result<u64, Error>;
}
