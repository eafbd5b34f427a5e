//! Dashboard domain service: the read-side projections.
//!
//! Rows are loaded through the driven ports and joined by the pure functions
//! in [`crate::domain::views`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    ClassRepository, ClassRepositoryError, DashboardQuery, LedgerQueryRepository,
    LedgerQueryRepositoryError, UserRepository, UserRepositoryError,
};
use crate::domain::views;
use crate::domain::{
    AdminStats, Class, ClassId, EnrolledClassView, Error, InstructorPopularity, Payment,
    ServiceTimeouts, User, UserEmail,
};

/// Dashboard service implementing [`DashboardQuery`].
#[derive(Clone)]
pub struct DashboardService<C, U, Q> {
    class_repo: Arc<C>,
    user_repo: Arc<U>,
    ledger_query: Arc<Q>,
    timeouts: ServiceTimeouts,
}

impl<C, U, Q> DashboardService<C, U, Q> {
    /// Create a new service.
    pub fn new(
        class_repo: Arc<C>,
        user_repo: Arc<U>,
        ledger_query: Arc<Q>,
        timeouts: ServiceTimeouts,
    ) -> Self {
        Self {
            class_repo,
            user_repo,
            ledger_query,
            timeouts,
        }
    }
}

impl<C, U, Q> DashboardService<C, U, Q>
where
    C: ClassRepository,
    U: UserRepository,
    Q: LedgerQueryRepository,
{
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

    fn map_user_error(error: UserRepositoryError) -> Error {
        match error {
            UserRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("user repository unavailable: {message}"))
            }
            UserRepositoryError::Query { message } => {
                Error::internal(format!("user repository error: {message}"))
            }
        }
    }

    fn map_ledger_error(error: LedgerQueryRepositoryError) -> Error {
        match error {
            LedgerQueryRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("ledger unavailable: {message}"))
            }
            LedgerQueryRepositoryError::Query { message } => {
                Error::internal(format!("ledger query error: {message}"))
            }
        }
    }

    /// Load the instructors of `classes`, keyed by email.
    async fn instructors_of(&self, classes: &[Class]) -> Result<HashMap<UserEmail, User>, Error> {
        let emails: Vec<UserEmail> = classes
            .iter()
            .map(|class| class.instructor_email.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if emails.is_empty() {
            return Ok(HashMap::new());
        }
        let users = self
            .timeouts
            .bound(
                "load instructors",
                self.user_repo.find_by_emails(&emails),
                Self::map_user_error,
            )
            .await?;
        Ok(users
            .into_iter()
            .map(|user| (user.email().clone(), user))
            .collect())
    }
}

#[async_trait]
impl<C, U, Q> DashboardQuery for DashboardService<C, U, Q>
where
    C: ClassRepository,
    U: UserRepository,
    Q: LedgerQueryRepository,
{
    async fn enrolled_classes(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<EnrolledClassView>, Error> {
        let enrollments = self
            .timeouts
            .bound(
                "load enrollments",
                self.ledger_query.enrollments_for_user(user_email),
                Self::map_ledger_error,
            )
            .await?;
        let class_ids: Vec<ClassId> = enrollments
            .iter()
            .flat_map(|enrollment| enrollment.class_ids.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }

        let classes = self
            .timeouts
            .bound(
                "load enrolled classes",
                self.class_repo.find_by_ids(&class_ids),
                Self::map_class_error,
            )
            .await?;
        let instructors = self.instructors_of(&classes).await?;
        let classes: HashMap<ClassId, Class> =
            classes.into_iter().map(|class| (class.id, class)).collect();

        Ok(views::enrolled_classes(&enrollments, &classes, &instructors))
    }

    async fn popular_classes(&self, limit: usize) -> Result<Vec<Class>, Error> {
        self.timeouts
            .bound(
                "load popular classes",
                self.class_repo.most_enrolled(limit),
                Self::map_class_error,
            )
            .await
    }

    async fn popular_instructors(&self, limit: usize) -> Result<Vec<InstructorPopularity>, Error> {
        let classes = self
            .timeouts
            .bound(
                "load classes",
                self.class_repo.list_all(),
                Self::map_class_error,
            )
            .await?;
        let instructors = self.instructors_of(&classes).await?;
        Ok(views::rank_instructors(&classes, &instructors, limit))
    }

    async fn admin_stats(&self) -> Result<AdminStats, Error> {
        self.timeouts
            .bound(
                "load admin stats",
                self.ledger_query.admin_stats(),
                Self::map_ledger_error,
            )
            .await
    }

    async fn payment_history(&self, user_email: &UserEmail) -> Result<Vec<Payment>, Error> {
        self.timeouts
            .bound(
                "load payments",
                self.ledger_query.payments_for_user(user_email),
                Self::map_ledger_error,
            )
            .await
    }

    async fn payment_count(&self, user_email: &UserEmail) -> Result<u64, Error> {
        self.timeouts
            .bound(
                "count payments",
                self.ledger_query.count_payments_for_user(user_email),
                Self::map_ledger_error,
            )
            .await
    }
}
