//! Catalog domain service: class submission, edits and admin review.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    CatalogCommand, CatalogQuery, ClassRepository, ClassRepositoryError, CreateClassRequest,
    SetClassStatusRequest, UpdateClassRequest,
};
use crate::domain::{
    Class, ClassDetails, ClassId, ClassStatus, Error, Principal, ServiceTimeouts, StatusChange,
    UserEmail,
};

/// Catalog service implementing [`CatalogCommand`] and [`CatalogQuery`].
#[derive(Clone)]
pub struct CatalogService<C> {
    class_repo: Arc<C>,
    clock: Arc<dyn Clock>,
    timeouts: ServiceTimeouts,
}

impl<C> CatalogService<C> {
    /// Create a new service over a class repository.
    pub fn new(class_repo: Arc<C>, clock: Arc<dyn Clock>, timeouts: ServiceTimeouts) -> Self {
        Self {
            class_repo,
            clock,
            timeouts,
        }
    }
}

impl<C> CatalogService<C>
where
    C: ClassRepository,
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

    fn class_not_found(class_id: &ClassId) -> Error {
        Error::not_found(format!("class {class_id} does not exist"))
            .with_details(json!({ "classId": class_id }))
    }

    async fn find(&self, class_id: &ClassId) -> Result<Class, Error> {
        self.timeouts
            .bound(
                "find class",
                self.class_repo.find_by_id(class_id),
                Self::map_class_error,
            )
            .await?
            .ok_or_else(|| Self::class_not_found(class_id))
    }
}

#[async_trait]
impl<C> CatalogCommand for CatalogService<C>
where
    C: ClassRepository,
{
    async fn create(
        &self,
        principal: &Principal,
        request: CreateClassRequest,
    ) -> Result<Class, Error> {
        if !principal.role.can_publish() {
            warn!(principal = %principal.email, role = %principal.role, "class submission refused");
            return Err(Error::forbidden(
                "only instructors and admins may submit classes",
            ));
        }
        let instructor_name = request.instructor_name.trim();
        if instructor_name.is_empty() {
            return Err(Error::invalid_request("instructor name must not be empty")
                .with_details(json!({ "field": "instructorName" })));
        }
        let details = ClassDetails::try_from(request.draft)?;

        let class = Class::submit(
            ClassId::random(),
            principal.email.clone(),
            instructor_name,
            details,
            self.clock.utc(),
        );
        self.timeouts
            .bound(
                "insert class",
                self.class_repo.insert(&class),
                Self::map_class_error,
            )
            .await?;

        info!(class_id = %class.id, instructor = %class.instructor_email, "class submitted");
        Ok(class)
    }

    async fn update(
        &self,
        principal: &Principal,
        request: UpdateClassRequest,
    ) -> Result<Class, Error> {
        let details = ClassDetails::try_from(request.draft)?;
        let existing = self.find(&request.class_id).await?;
        if !principal.acts_for(&existing.instructor_email) {
            warn!(
                principal = %principal.email,
                class_id = %request.class_id,
                "class edit refused for non-owner"
            );
            return Err(Error::forbidden(
                "only the owning instructor or an admin may edit a class",
            ));
        }

        let updated = self
            .timeouts
            .bound(
                "update class details",
                self.class_repo.update_details(&request.class_id, &details),
                Self::map_class_error,
            )
            .await?
            .ok_or_else(|| Self::class_not_found(&request.class_id))?;

        info!(class_id = %updated.id, "class edited and returned to review");
        Ok(updated)
    }

    async fn set_status(
        &self,
        principal: &Principal,
        request: SetClassStatusRequest,
    ) -> Result<Class, Error> {
        if !principal.is_admin() {
            warn!(principal = %principal.email, "class review refused for non-admin");
            return Err(Error::forbidden("only admins may review classes"));
        }
        let change = StatusChange::new(request.status, request.reason)?;

        let updated = self
            .timeouts
            .bound(
                "update class status",
                self.class_repo.update_status(&request.class_id, &change),
                Self::map_class_error,
            )
            .await?
            .ok_or_else(|| Self::class_not_found(&request.class_id))?;

        info!(class_id = %updated.id, status = %updated.status, "class reviewed");
        Ok(updated)
    }
}

#[async_trait]
impl<C> CatalogQuery for CatalogService<C>
where
    C: ClassRepository,
{
    async fn get(&self, class_id: &ClassId) -> Result<Class, Error> {
        self.find(class_id).await
    }

    async fn list_by_instructor(&self, instructor_email: &UserEmail) -> Result<Vec<Class>, Error> {
        self.timeouts
            .bound(
                "list instructor classes",
                self.class_repo.list_by_instructor(instructor_email),
                Self::map_class_error,
            )
            .await
    }

    async fn list_approved(&self) -> Result<Vec<Class>, Error> {
        self.timeouts
            .bound(
                "list approved classes",
                self.class_repo.list_by_status(ClassStatus::Approved),
                Self::map_class_error,
            )
            .await
    }

    async fn list_all(&self) -> Result<Vec<Class>, Error> {
        self.timeouts
            .bound(
                "list classes",
                self.class_repo.list_all(),
                Self::map_class_error,
            )
            .await
    }
}
