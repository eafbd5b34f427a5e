//! Shared helpers for the marketplace integration tests.
//!
//! Integration tests compile as separate crates, so each suite pulls this
//! module in with `mod support;` and uses the parts it needs.

#![allow(dead_code, reason = "each suite uses a different subset of helpers")]

pub mod postgres;

use std::sync::Arc;

use marketplace::domain::ports::{
    CatalogCommand as _, CatalogQuery as _, CreateClassRequest, SetClassStatusRequest,
    UserRepository as _,
};
use marketplace::domain::{
    Amount, Class, ClassDraft, ClassId, ClassStatus, Principal, Role, SettlementRequest,
    ServiceTimeouts, TransactionRef, User, UserEmail, UserId,
};
use marketplace::outbound::memory::InMemoryLedgerStore;
use marketplace::services::MarketplaceServices;
use mockable::DefaultClock;

pub fn email(raw: &str) -> UserEmail {
    UserEmail::new(raw).expect("valid email")
}

pub fn principal(raw: &str, role: Role) -> Principal {
    Principal::new(email(raw), role)
}

pub fn admin() -> Principal {
    principal("root@x.com", Role::Admin)
}

pub fn draft(name: &str, seats: i64) -> ClassDraft {
    ClassDraft {
        name: name.to_owned(),
        description: format!("{name} for beginners"),
        price_cents: 2_500,
        available_seats: seats,
        video_url: String::new(),
    }
}

pub fn settle_request(buyer: &str, class_ids: &[ClassId], reference: &str) -> SettlementRequest {
    SettlementRequest {
        user_email: email(buyer),
        class_ids: class_ids.to_vec(),
        transaction_ref: TransactionRef::new(reference).expect("valid reference"),
        amount: Amount::from_minor_units(2_500),
    }
}

/// In-memory marketplace with its store exposed for seeding.
pub struct Marketplace {
    pub store: Arc<InMemoryLedgerStore>,
    pub services: MarketplaceServices,
}

impl Marketplace {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let services = MarketplaceServices::in_memory(
            Arc::clone(&store),
            Arc::new(DefaultClock),
            ServiceTimeouts::default(),
        );
        Self { store, services }
    }

    /// Register a user record so projections can join to it.
    pub async fn register(&self, raw: &str, role: Role) -> Principal {
        let user = User::new(UserId::random(), email(raw), role, raw).expect("valid user");
        self.store.upsert(&user).await.expect("user stored");
        principal(raw, role)
    }

    /// Submit a class as `instructor` and have it approved.
    pub async fn publish(&self, instructor: &Principal, name: &str, seats: i64) -> Class {
        let class = self
            .services
            .catalog
            .create(
                instructor,
                CreateClassRequest {
                    instructor_name: instructor.email.to_string(),
                    draft: draft(name, seats),
                },
            )
            .await
            .expect("class created");
        self.services
            .catalog
            .set_status(
                &admin(),
                SetClassStatusRequest {
                    class_id: class.id,
                    status: ClassStatus::Approved,
                    reason: None,
                },
            )
            .await
            .expect("class approved")
    }

    pub async fn class(&self, id: &ClassId) -> Class {
        self.services.catalog_query.get(id).await.expect("class exists")
    }
}
