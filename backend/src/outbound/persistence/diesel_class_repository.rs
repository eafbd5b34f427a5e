//! PostgreSQL-backed `ClassRepository` implementation using Diesel ORM.
//!
//! Listings are ordered by `listing_seq`, the database-assigned insertion
//! sequence. Catalog edits are single-statement updates that never write
//! `total_enrolled`, so they cannot race a settlement into losing seats.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ClassRepository, ClassRepositoryError};
use crate::domain::{Class, ClassDetails, ClassId, ClassStatus, StatusChange, UserEmail};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{
    to_column, ClassDetailsChangeset, ClassRow, ClassStatusChangeset, ColumnRangeError,
    NewClassRow, RowDecodeError,
};
use super::pool::{DbPool, PoolError};
use super::schema::classes;

/// Diesel-backed implementation of the [`ClassRepository`] port.
#[derive(Clone)]
pub struct DieselClassRepository {
    pool: DbPool,
}

impl DieselClassRepository {
    /// Create a repository over connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ClassRepositoryError {
    map_basic_pool_error(error, ClassRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ClassRepositoryError {
    map_basic_diesel_error(
        error,
        ClassRepositoryError::query,
        ClassRepositoryError::connection,
    )
}

fn map_decode_error(error: RowDecodeError) -> ClassRepositoryError {
    ClassRepositoryError::query(error.to_string())
}

fn map_range_error(error: ColumnRangeError) -> ClassRepositoryError {
    ClassRepositoryError::query(error.to_string())
}

fn rows_to_classes(rows: Vec<ClassRow>) -> Result<Vec<Class>, ClassRepositoryError> {
    rows.into_iter()
        .map(|row| Class::try_from(row).map_err(map_decode_error))
        .collect()
}

fn uuids(ids: &[ClassId]) -> Vec<uuid::Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

#[async_trait]
impl ClassRepository for DieselClassRepository {
    async fn insert(&self, class: &Class) -> Result<(), ClassRepositoryError> {
        let row = NewClassRow::from_class(class).map_err(map_range_error)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(classes::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: &ClassId) -> Result<Option<Class>, ClassRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ClassRow> = classes::table
            .find(id.as_uuid())
            .select(ClassRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(Class::try_from)
            .transpose()
            .map_err(map_decode_error)
    }

    async fn find_by_ids(&self, ids: &[ClassId]) -> Result<Vec<Class>, ClassRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ClassRow> = classes::table
            .filter(classes::id.eq_any(uuids(ids)))
            .order_by(classes::listing_seq)
            .select(ClassRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_classes(rows)
    }

    async fn list_by_instructor(
        &self,
        instructor_email: &UserEmail,
    ) -> Result<Vec<Class>, ClassRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ClassRow> = classes::table
            .filter(classes::instructor_email.eq(instructor_email.as_ref()))
            .order_by(classes::listing_seq)
            .select(ClassRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_classes(rows)
    }

    async fn list_by_status(
        &self,
        status: ClassStatus,
    ) -> Result<Vec<Class>, ClassRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ClassRow> = classes::table
            .filter(classes::status.eq(status.as_str()))
            .order_by(classes::listing_seq)
            .select(ClassRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_classes(rows)
    }

    async fn list_all(&self) -> Result<Vec<Class>, ClassRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ClassRow> = classes::table
            .order_by(classes::listing_seq)
            .select(ClassRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_classes(rows)
    }

    async fn update_details(
        &self,
        id: &ClassId,
        details: &ClassDetails,
    ) -> Result<Option<Class>, ClassRepositoryError> {
        let changeset = ClassDetailsChangeset {
            name: &details.name,
            description: &details.description,
            price_cents: to_column("price_cents", details.price_cents).map_err(map_range_error)?,
            available_seats: to_column("available_seats", details.available_seats)
                .map_err(map_range_error)?,
            video_url: &details.video_url,
            status: ClassStatus::Pending.as_str(),
            rejection_reason: None,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ClassRow> = diesel::update(classes::table.find(id.as_uuid()))
            .set(&changeset)
            .returning(ClassRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(Class::try_from)
            .transpose()
            .map_err(map_decode_error)
    }

    async fn update_status(
        &self,
        id: &ClassId,
        change: &StatusChange,
    ) -> Result<Option<Class>, ClassRepositoryError> {
        let changeset = ClassStatusChangeset {
            status: change.status().as_str(),
            rejection_reason: change.reason(),
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ClassRow> = diesel::update(classes::table.find(id.as_uuid()))
            .set(&changeset)
            .returning(ClassRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(Class::try_from)
            .transpose()
            .map_err(map_decode_error)
    }

    async fn most_enrolled(&self, limit: usize) -> Result<Vec<Class>, ClassRepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ClassRow> = classes::table
            .order_by((classes::total_enrolled.desc(), classes::listing_seq.asc()))
            .limit(limit)
            .select(ClassRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_classes(rows)
    }
}
