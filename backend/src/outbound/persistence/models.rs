//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions to and from domain types live
//! next to the rows so every adapter decodes stored values the same way.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Amount, CartItem, CartItemId, Class, ClassId, ClassStatus, Enrollment, EnrollmentId,
    Payment, PaymentId, Role, TransactionRef, User, UserEmail, UserId,
};

use super::schema::{cart_items, classes, enrollments, payments, users};

/// Error raised when a stored row no longer satisfies a domain invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("corrupt {table} row {id}: {reason}")]
pub(crate) struct RowDecodeError {
    pub table: &'static str,
    pub id: Uuid,
    pub reason: String,
}

impl RowDecodeError {
    fn new(table: &'static str, id: Uuid, reason: impl ToString) -> Self {
        Self {
            table,
            id,
            reason: reason.to_string(),
        }
    }
}

/// Error raised when a domain value does not fit its column type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} value {value} does not fit the column")]
pub(crate) struct ColumnRangeError {
    pub field: &'static str,
    pub value: u64,
}

/// Convert an unsigned counter or amount into its signed column type.
pub(crate) fn to_column<T>(field: &'static str, value: impl Into<u64> + Copy) -> Result<T, ColumnRangeError>
where
    T: TryFrom<u64>,
{
    let wide: u64 = value.into();
    T::try_from(wide).map_err(|_| ColumnRangeError { field, value: wide })
}

/// Row struct for reading from the classes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = classes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ClassRow {
    pub id: Uuid,
    pub instructor_email: String,
    pub instructor_name: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub available_seats: i32,
    pub total_enrolled: i32,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ClassRow> for Class {
    type Error = RowDecodeError;

    fn try_from(row: ClassRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let decode = |reason: &dyn std::fmt::Display| RowDecodeError::new("classes", id, reason);
        Ok(Self {
            id: ClassId::from_uuid(row.id),
            instructor_email: UserEmail::new(&row.instructor_email).map_err(|e| decode(&e))?,
            instructor_name: row.instructor_name,
            name: row.name,
            description: row.description,
            price_cents: u64::try_from(row.price_cents).map_err(|e| decode(&e))?,
            status: row.status.parse::<ClassStatus>().map_err(|e| decode(&e))?,
            rejection_reason: row.rejection_reason,
            available_seats: u32::try_from(row.available_seats).map_err(|e| decode(&e))?,
            total_enrolled: u32::try_from(row.total_enrolled).map_err(|e| decode(&e))?,
            video_url: row.video_url,
            created_at: row.created_at,
        })
    }
}

/// Insertable struct for new class listings. `listing_seq` is assigned by
/// the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = classes)]
pub(crate) struct NewClassRow<'a> {
    pub id: Uuid,
    pub instructor_email: &'a str,
    pub instructor_name: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub price_cents: i64,
    pub status: &'a str,
    pub rejection_reason: Option<&'a str>,
    pub available_seats: i32,
    pub total_enrolled: i32,
    pub video_url: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewClassRow<'a> {
    pub(crate) fn from_class(class: &'a Class) -> Result<Self, ColumnRangeError> {
        Ok(Self {
            id: *class.id.as_uuid(),
            instructor_email: class.instructor_email.as_ref(),
            instructor_name: &class.instructor_name,
            name: &class.name,
            description: &class.description,
            price_cents: to_column("price_cents", class.price_cents)?,
            status: class.status.as_str(),
            rejection_reason: class.rejection_reason.as_deref(),
            available_seats: to_column("available_seats", class.available_seats)?,
            total_enrolled: to_column("total_enrolled", class.total_enrolled)?,
            video_url: &class.video_url,
            created_at: class.created_at,
        })
    }
}

/// Changeset for instructor edits. Always returns the class to review and
/// clears any rejection reason; seat counters other than
/// `available_seats` are not part of it.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = classes)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ClassDetailsChangeset<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub price_cents: i64,
    pub available_seats: i32,
    pub video_url: &'a str,
    pub status: &'a str,
    pub rejection_reason: Option<&'a str>,
}

/// Changeset for admin review decisions.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = classes)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ClassStatusChangeset<'a> {
    pub status: &'a str,
    pub rejection_reason: Option<&'a str>,
}

/// Row struct for the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub display_name: String,
    pub photo_url: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = RowDecodeError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let decode = |reason: &dyn std::fmt::Display| RowDecodeError::new("users", id, reason);
        let email = UserEmail::new(&row.email).map_err(|e| decode(&e))?;
        let role = row.role.parse::<Role>().map_err(|e| decode(&e))?;
        let user = User::new(UserId::from_uuid(row.id), email, role, row.display_name)
            .map_err(|e| decode(&e))?;
        Ok(match row.photo_url {
            Some(url) => user.with_photo_url(url),
            None => user,
        })
    }
}

/// Insertable and upsert changeset for users.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub role: &'a str,
    pub display_name: &'a str,
    pub photo_url: Option<&'a str>,
}

impl<'a> From<&'a User> for NewUserRow<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: *user.id().as_uuid(),
            email: user.email().as_ref(),
            role: user.role().as_str(),
            display_name: user.display_name(),
            photo_url: user.photo_url(),
        }
    }
}

/// Row struct for the cart_items table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CartItemRow {
    pub id: Uuid,
    pub user_email: String,
    pub class_id: Uuid,
    pub added_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RowDecodeError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let user_email = UserEmail::new(&row.user_email)
            .map_err(|e| RowDecodeError::new("cart_items", row.id, e))?;
        Ok(Self {
            id: CartItemId::from_uuid(row.id),
            user_email,
            class_id: ClassId::from_uuid(row.class_id),
            added_at: row.added_at,
        })
    }
}

/// Insertable struct for cart entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cart_items)]
pub(crate) struct NewCartItemRow<'a> {
    pub id: Uuid,
    pub user_email: &'a str,
    pub class_id: Uuid,
    pub added_at: DateTime<Utc>,
}

impl<'a> From<&'a CartItem> for NewCartItemRow<'a> {
    fn from(item: &'a CartItem) -> Self {
        Self {
            id: *item.id.as_uuid(),
            user_email: item.user_email.as_ref(),
            class_id: *item.class_id.as_uuid(),
            added_at: item.added_at,
        }
    }
}

/// Row struct for the enrollments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub user_email: String,
    pub class_ids: Vec<Uuid>,
    pub transaction_ref: String,
    pub enrolled_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = RowDecodeError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let decode = |reason: &dyn std::fmt::Display| RowDecodeError::new("enrollments", id, reason);
        Ok(Self {
            id: EnrollmentId::from_uuid(row.id),
            user_email: UserEmail::new(&row.user_email).map_err(|e| decode(&e))?,
            class_ids: row.class_ids.into_iter().map(ClassId::from_uuid).collect(),
            transaction_ref: TransactionRef::new(row.transaction_ref).map_err(|e| decode(&e))?,
            enrolled_at: row.enrolled_at,
        })
    }
}

/// Insertable struct for enrollments.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = enrollments)]
pub(crate) struct NewEnrollmentRow<'a> {
    pub id: Uuid,
    pub user_email: &'a str,
    pub class_ids: Vec<Uuid>,
    pub transaction_ref: &'a str,
    pub enrolled_at: DateTime<Utc>,
}

impl<'a> From<&'a Enrollment> for NewEnrollmentRow<'a> {
    fn from(enrollment: &'a Enrollment) -> Self {
        Self {
            id: *enrollment.id.as_uuid(),
            user_email: enrollment.user_email.as_ref(),
            class_ids: enrollment.class_ids.iter().map(|id| *id.as_uuid()).collect(),
            transaction_ref: enrollment.transaction_ref.as_ref(),
            enrolled_at: enrollment.enrolled_at,
        }
    }
}

/// Row struct for the payments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentRow {
    pub id: Uuid,
    pub user_email: String,
    pub class_ids: Vec<Uuid>,
    pub amount_minor: i64,
    pub transaction_ref: String,
    pub paid_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RowDecodeError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let decode = |reason: &dyn std::fmt::Display| RowDecodeError::new("payments", id, reason);
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            user_email: UserEmail::new(&row.user_email).map_err(|e| decode(&e))?,
            class_ids: row.class_ids.into_iter().map(ClassId::from_uuid).collect(),
            amount: Amount::from_minor_units(
                u64::try_from(row.amount_minor).map_err(|e| decode(&e))?,
            ),
            transaction_ref: TransactionRef::new(row.transaction_ref).map_err(|e| decode(&e))?,
            paid_at: row.paid_at,
        })
    }
}

/// Insertable struct for payments.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub(crate) struct NewPaymentRow<'a> {
    pub id: Uuid,
    pub user_email: &'a str,
    pub class_ids: Vec<Uuid>,
    pub amount_minor: i64,
    pub transaction_ref: &'a str,
    pub paid_at: DateTime<Utc>,
}

impl<'a> NewPaymentRow<'a> {
    pub(crate) fn from_payment(payment: &'a Payment) -> Result<Self, ColumnRangeError> {
        Ok(Self {
            id: *payment.id.as_uuid(),
            user_email: payment.user_email.as_ref(),
            class_ids: payment.class_ids.iter().map(|id| *id.as_uuid()).collect(),
            amount_minor: to_column("amount_minor", payment.amount.minor_units())?,
            transaction_ref: payment.transaction_ref.as_ref(),
            paid_at: payment.paid_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn class_row(status: &str, available_seats: i32) -> ClassRow {
        ClassRow {
            id: Uuid::new_v4(),
            instructor_email: "Tutor@X.com".to_owned(),
            instructor_name: "Tutor".to_owned(),
            name: "Yoga".to_owned(),
            description: String::new(),
            price_cents: 1_000,
            status: status.to_owned(),
            rejection_reason: None,
            available_seats,
            total_enrolled: 2,
            video_url: String::new(),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn class_row_decodes_into_domain() {
        let class = Class::try_from(class_row("approved", 4)).expect("valid row");
        assert_eq!(class.status, ClassStatus::Approved);
        assert_eq!(class.instructor_email.as_ref(), "tutor@x.com");
        assert_eq!(class.available_seats, 4);
    }

    #[rstest]
    #[case("archived", 1)]
    #[case("pending", -1)]
    fn corrupt_class_rows_are_reported(#[case] status: &str, #[case] seats: i32) {
        let row = class_row(status, seats);
        let id = row.id;
        let err = Class::try_from(row).expect_err("corrupt row");
        assert_eq!(err.table, "classes");
        assert_eq!(err.id, id);
    }

    #[rstest]
    fn oversized_counter_is_rejected() {
        let err = to_column::<i32>("available_seats", u32::MAX).expect_err("out of range");
        assert_eq!(err.field, "available_seats");
        assert_eq!(err.value, u64::from(u32::MAX));
    }
}
