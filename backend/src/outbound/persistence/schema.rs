//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. The
//! `diesel print-schema` command regenerates them from a live database.

diesel::table! {
    /// Class listings.
    ///
    /// `listing_seq` records insertion order for stable tie-breaking in the
    /// ranked projections. The seat counters carry `CHECK (>= 0)`
    /// constraints.
    classes (id) {
        id -> Uuid,
        listing_seq -> Int8,
        instructor_email -> Text,
        instructor_name -> Text,
        name -> Text,
        description -> Text,
        price_cents -> Int8,
        /// One of `pending`, `approved`, `rejected`.
        status -> Text,
        rejection_reason -> Nullable<Text>,
        available_seats -> Int4,
        total_enrolled -> Int4,
        video_url -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Marketplace users, unique by normalised email.
    users (id) {
        id -> Uuid,
        email -> Text,
        /// One of `student`, `instructor`, `admin`.
        role -> Text,
        display_name -> Text,
        photo_url -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Cart entries, unique per `(user_email, class_id)`.
    cart_items (id) {
        id -> Uuid,
        user_email -> Text,
        class_id -> Uuid,
        added_at -> Timestamptz,
    }
}

diesel::table! {
    /// Enrollment records, one per settlement. `class_ids` keeps purchase
    /// order; `ledger_seq` breaks ties between equal `enrolled_at` values.
    enrollments (id) {
        id -> Uuid,
        ledger_seq -> Int8,
        user_email -> Text,
        class_ids -> Array<Uuid>,
        transaction_ref -> Text,
        enrolled_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only payment ledger. `transaction_ref` is unique and
    /// `ledger_seq` records insertion order.
    payments (id) {
        id -> Uuid,
        ledger_seq -> Int8,
        user_email -> Text,
        class_ids -> Array<Uuid>,
        amount_minor -> Int8,
        transaction_ref -> Text,
        paid_at -> Timestamptz,
    }
}

diesel::joinable!(cart_items -> classes (class_id));

diesel::allow_tables_to_appear_in_same_query!(cart_items, classes, enrollments, payments, users,);
