//! PostgreSQL-backed `CartRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CartRepository, CartRepositoryError};
use crate::domain::{CartItem, ClassId, UserEmail};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation,
};
use super::models::{CartItemRow, NewCartItemRow, RowDecodeError};
use super::pool::{DbPool, PoolError};
use super::schema::cart_items;

/// Diesel-backed implementation of the [`CartRepository`] port.
#[derive(Clone)]
pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    /// Create a repository over connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CartRepositoryError {
    map_basic_pool_error(error, CartRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CartRepositoryError {
    map_basic_diesel_error(
        error,
        CartRepositoryError::query,
        CartRepositoryError::connection,
    )
}

/// Map insert failures. The only unique key besides the random id is
/// `(user_email, class_id)`, so any unique violation is a duplicate entry.
fn map_insert_error(error: diesel::result::Error, class_id: ClassId) -> CartRepositoryError {
    if unique_violation(&error, None) {
        return CartRepositoryError::duplicate_entry(class_id);
    }
    map_diesel_error(error)
}

fn map_decode_error(error: RowDecodeError) -> CartRepositoryError {
    CartRepositoryError::query(error.to_string())
}

#[async_trait]
impl CartRepository for DieselCartRepository {
    async fn insert(&self, item: &CartItem) -> Result<(), CartRepositoryError> {
        let row = NewCartItemRow::from(item);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(cart_items::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|error| map_insert_error(error, item.class_id))
    }

    async fn find(
        &self,
        user_email: &UserEmail,
        class_id: &ClassId,
    ) -> Result<Option<CartItem>, CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CartItemRow> = cart_items::table
            .filter(cart_items::user_email.eq(user_email.as_ref()))
            .filter(cart_items::class_id.eq(class_id.as_uuid()))
            .select(CartItemRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(CartItem::try_from)
            .transpose()
            .map_err(map_decode_error)
    }

    async fn list_for_user(
        &self,
        user_email: &UserEmail,
    ) -> Result<Vec<CartItem>, CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<CartItemRow> = cart_items::table
            .filter(cart_items::user_email.eq(user_email.as_ref()))
            .order_by((cart_items::added_at, cart_items::id))
            .select(CartItemRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|row| CartItem::try_from(row).map_err(map_decode_error))
            .collect()
    }

    async fn remove_for_user(
        &self,
        user_email: &UserEmail,
        class_id: &ClassId,
    ) -> Result<u64, CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let removed = diesel::delete(
            cart_items::table
                .filter(cart_items::user_email.eq(user_email.as_ref()))
                .filter(cart_items::class_id.eq(class_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(removed as u64)
    }
}
