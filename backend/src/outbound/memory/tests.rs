//! Tests for the in-process ledger store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::{Amount, CartItemId, PurchasedClasses, UserId};

fn email(raw: &str) -> UserEmail {
    UserEmail::new(raw).expect("valid email")
}

fn class_with_seats(seats: u32) -> Class {
    Class::submit(
        ClassId::random(),
        email("tutor@x.com"),
        "Tutor",
        ClassDetails {
            name: "Sketching".to_owned(),
            description: String::new(),
            price_cents: 1_500,
            available_seats: seats,
            video_url: String::new(),
        },
        Utc::now(),
    )
}

fn plan(buyer: &str, class_ids: Vec<ClassId>, reference: &str) -> SettlementPlan {
    SettlementPlan::new(
        email(buyer),
        PurchasedClasses::try_from(class_ids).expect("valid purchase"),
        TransactionRef::new(reference).expect("valid reference"),
        Amount::from_minor_units(1_500),
        Utc::now(),
    )
}

fn cart_entry(buyer: &str, class_id: ClassId) -> CartItem {
    CartItem {
        id: CartItemId::random(),
        user_email: email(buyer),
        class_id,
        added_at: Utc::now(),
    }
}

#[fixture]
fn store() -> InMemoryLedgerStore {
    InMemoryLedgerStore::new()
}

#[rstest]
#[tokio::test]
async fn settlement_moves_seat_and_clears_only_purchased_entries(store: InMemoryLedgerStore) {
    let bought = class_with_seats(1);
    let kept = class_with_seats(3);
    ClassRepository::insert(&store, &bought).await.expect("insert");
    ClassRepository::insert(&store, &kept).await.expect("insert");
    for entry in [
        cart_entry("a@x.com", bought.id),
        cart_entry("a@x.com", kept.id),
        cart_entry("b@x.com", bought.id),
    ] {
        CartRepository::insert(&store, &entry).await.expect("cart insert");
    }

    let receipt = store
        .apply_settlement(&plan("a@x.com", vec![bought.id], "t1"))
        .await
        .expect("settlement applies");

    assert_eq!(receipt.cart_items_removed, 1);
    assert_eq!(receipt.classes[0].available_seats, 0);
    assert_eq!(receipt.classes[0].total_enrolled, 1);
    let remaining = store.list_for_user(&email("a@x.com")).await.expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].class_id, kept.id);
    assert_eq!(
        store.list_for_user(&email("b@x.com")).await.expect("list").len(),
        1
    );
}

#[rstest]
#[tokio::test]
async fn exhausted_class_rolls_back_whole_settlement(store: InMemoryLedgerStore) {
    let open = class_with_seats(5);
    let full = class_with_seats(0);
    ClassRepository::insert(&store, &open).await.expect("insert");
    ClassRepository::insert(&store, &full).await.expect("insert");

    let error = store
        .apply_settlement(&plan("a@x.com", vec![open.id, full.id], "t1"))
        .await
        .expect_err("seats exhausted");

    assert_eq!(error, SettlementLedgerError::seats_exhausted(full.id));
    let untouched = store
        .find_by_id(&open.id)
        .await
        .expect("lookup")
        .expect("class exists");
    assert_eq!(untouched.available_seats, 5);
    assert_eq!(untouched.total_enrolled, 0);
    assert_eq!(store.admin_stats().await.expect("stats").total_enrollments, 0);
}

#[rstest]
#[tokio::test]
async fn unknown_class_is_reported(store: InMemoryLedgerStore) {
    let missing = ClassId::random();
    let error = store
        .apply_settlement(&plan("a@x.com", vec![missing], "t1"))
        .await
        .expect_err("class missing");

    assert_eq!(error, SettlementLedgerError::class_not_found(missing));
}

#[rstest]
#[tokio::test]
async fn reused_reference_is_a_duplicate(store: InMemoryLedgerStore) {
    let class = class_with_seats(2);
    ClassRepository::insert(&store, &class).await.expect("insert");
    store
        .apply_settlement(&plan("a@x.com", vec![class.id], "t1"))
        .await
        .expect("first settlement");

    let error = store
        .apply_settlement(&plan("a@x.com", vec![class.id], "t1"))
        .await
        .expect_err("duplicate");

    assert!(matches!(
        error,
        SettlementLedgerError::DuplicateTransaction { .. }
    ));
    let settled = store
        .find_settlement(&TransactionRef::new("t1").expect("valid reference"))
        .await
        .expect("lookup")
        .expect("settlement recorded");
    assert_eq!(settled.enrollment.class_ids, vec![class.id]);
    let class = store
        .find_by_id(&class.id)
        .await
        .expect("lookup")
        .expect("class exists");
    assert_eq!(class.available_seats, 1);
}

#[rstest]
#[case(1, 8)]
#[case(3, 8)]
#[case(8, 3)]
#[tokio::test]
async fn concurrent_settlements_never_oversell(#[case] seats: u32, #[case] buyers: usize) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let class = class_with_seats(seats);
    ClassRepository::insert(store.as_ref(), &class)
        .await
        .expect("insert");

    let handles: Vec<_> = (0..buyers)
        .map(|n| {
            let store = Arc::clone(&store);
            let plan = plan(&format!("buyer{n}@x.com"), vec![class.id], &format!("t{n}"));
            tokio::spawn(async move { store.apply_settlement(&plan).await })
        })
        .collect();
    let mut succeeded = 0_u32;
    for handle in handles {
        if handle.await.expect("task completes").is_ok() {
            succeeded += 1;
        }
    }

    let class = store
        .find_by_id(&class.id)
        .await
        .expect("lookup")
        .expect("class exists");
    let expected_sold = seats.min(u32::try_from(buyers).expect("small count"));
    assert_eq!(succeeded, expected_sold);
    assert_eq!(class.available_seats, seats - expected_sold);
    assert_eq!(class.total_enrolled, expected_sold);
}

#[rstest]
#[tokio::test]
async fn duplicate_cart_entry_is_rejected(store: InMemoryLedgerStore) {
    let class_id = ClassId::random();
    CartRepository::insert(&store, &cart_entry("a@x.com", class_id))
        .await
        .expect("first insert");

    let error = CartRepository::insert(&store, &cart_entry("a@x.com", class_id))
        .await
        .expect_err("duplicate");

    assert_eq!(error, CartRepositoryError::duplicate_entry(class_id));
}

#[rstest]
#[tokio::test]
async fn detail_edit_keeps_enrollment_counter(store: InMemoryLedgerStore) {
    let class = class_with_seats(2);
    ClassRepository::insert(&store, &class).await.expect("insert");
    store
        .apply_settlement(&plan("a@x.com", vec![class.id], "t1"))
        .await
        .expect("settle");
    let approval = StatusChange::new(ClassStatus::Approved, None).expect("valid");
    store
        .update_status(&class.id, &approval)
        .await
        .expect("review");

    let edited = store
        .update_details(
            &class.id,
            &ClassDetails {
                name: "Sketching II".to_owned(),
                description: String::new(),
                price_cents: 1_800,
                available_seats: 10,
                video_url: String::new(),
            },
        )
        .await
        .expect("edit")
        .expect("class exists");

    assert_eq!(edited.status, ClassStatus::Pending);
    assert_eq!(edited.available_seats, 10);
    assert_eq!(edited.total_enrolled, 1);
}

#[rstest]
#[tokio::test]
async fn payments_are_listed_newest_first(store: InMemoryLedgerStore) {
    let class = class_with_seats(5);
    ClassRepository::insert(&store, &class).await.expect("insert");
    let mut older = plan("a@x.com", vec![class.id], "t-old");
    older.payment.paid_at = Utc::now() - Duration::hours(1);
    older.enrollment.enrolled_at = older.payment.paid_at;
    store.apply_settlement(&older).await.expect("settle old");
    store
        .apply_settlement(&plan("a@x.com", vec![class.id], "t-new"))
        .await
        .expect("settle new");

    let payments = store
        .payments_for_user(&email("a@x.com"))
        .await
        .expect("history");

    let references: Vec<&str> = payments
        .iter()
        .map(|payment| payment.transaction_ref.as_ref())
        .collect();
    assert_eq!(references, vec!["t-new", "t-old"]);
    assert_eq!(
        store
            .count_payments_for_user(&email("a@x.com"))
            .await
            .expect("count"),
        2
    );
}

#[rstest]
#[tokio::test]
async fn admin_stats_count_statuses_instructors_and_enrollments(store: InMemoryLedgerStore) {
    let approved = class_with_seats(3);
    let pending = class_with_seats(3);
    ClassRepository::insert(&store, &approved).await.expect("insert");
    ClassRepository::insert(&store, &pending).await.expect("insert");
    store
        .update_status(
            &approved.id,
            &StatusChange::new(ClassStatus::Approved, None).expect("valid"),
        )
        .await
        .expect("review");
    for (raw, role) in [
        ("tutor@x.com", Role::Instructor),
        ("s@x.com", Role::Student),
        ("root@x.com", Role::Admin),
    ] {
        let user = User::new(UserId::random(), email(raw), role, raw).expect("valid user");
        store.upsert(&user).await.expect("upsert");
    }
    store
        .apply_settlement(&plan("s@x.com", vec![approved.id, pending.id], "t1"))
        .await
        .expect("settle");

    let stats = store.admin_stats().await.expect("stats");

    assert_eq!(
        stats,
        AdminStats {
            approved_classes: 1,
            pending_classes: 1,
            rejected_classes: 0,
            instructors: 1,
            total_classes: 2,
            total_enrollments: 1,
        }
    );
}

