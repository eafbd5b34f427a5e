//! Driving port for class lifecycle changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Class, ClassDraft, ClassId, ClassStatus, Error, Principal};

/// Request to submit a new class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    /// Display name shown next to the class.
    pub instructor_name: String,
    pub draft: ClassDraft,
}

/// Request to edit an existing class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    pub class_id: ClassId,
    pub draft: ClassDraft,
}

/// Admin review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetClassStatusRequest {
    pub class_id: ClassId,
    pub status: ClassStatus,
    /// Required when rejecting.
    pub reason: Option<String>,
}

/// Driving port for catalog mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogCommand: Send + Sync {
    /// Submit a class for review. The instructor email comes from the
    /// principal, which must be an instructor or admin.
    async fn create(
        &self,
        principal: &Principal,
        request: CreateClassRequest,
    ) -> Result<Class, Error>;

    /// Edit a class and send it back to review. Only the owning instructor
    /// or an admin may edit.
    async fn update(
        &self,
        principal: &Principal,
        request: UpdateClassRequest,
    ) -> Result<Class, Error>;

    /// Approve, reject or re-queue a class. Admin only.
    async fn set_status(
        &self,
        principal: &Principal,
        request: SetClassStatusRequest,
    ) -> Result<Class, Error>;
}
