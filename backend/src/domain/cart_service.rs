//! Cart domain service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::debug;

use crate::domain::ports::{
    CartCommand, CartQuery, CartRepository, CartRepositoryError, ClassRepository,
    ClassRepositoryError,
};
use crate::domain::{
    CartItem, CartItemId, CartLine, ClassId, Error, Principal, ServiceTimeouts, UserEmail,
};

/// Cart service implementing [`CartCommand`] and [`CartQuery`].
#[derive(Clone)]
pub struct CartService<C, K> {
    class_repo: Arc<C>,
    cart_repo: Arc<K>,
    clock: Arc<dyn Clock>,
    timeouts: ServiceTimeouts,
}

impl<C, K> CartService<C, K> {
    /// Create a new service.
    pub fn new(
        class_repo: Arc<C>,
        cart_repo: Arc<K>,
        clock: Arc<dyn Clock>,
        timeouts: ServiceTimeouts,
    ) -> Self {
        Self {
            class_repo,
            cart_repo,
            clock,
            timeouts,
        }
    }
}

impl<C, K> CartService<C, K>
where
    C: ClassRepository,
    K: CartRepository,
{
    fn map_cart_error(error: CartRepositoryError) -> Error {
        match error {
            CartRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("cart repository unavailable: {message}"))
            }
            CartRepositoryError::Query { message } => {
                Error::internal(format!("cart repository error: {message}"))
            }
            CartRepositoryError::DuplicateEntry { class_id } => {
                Error::internal(format!("unexpected duplicate cart entry for {class_id}"))
            }
        }
    }

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

    async fn existing_entry(
        &self,
        user_email: &UserEmail,
        class_id: &ClassId,
    ) -> Result<Option<CartItem>, Error> {
        self.timeouts
            .bound(
                "find cart entry",
                self.cart_repo.find(user_email, class_id),
                Self::map_cart_error,
            )
            .await
    }
}

#[async_trait]
impl<C, K> CartCommand for CartService<C, K>
where
    C: ClassRepository,
    K: CartRepository,
{
    async fn add(&self, principal: &Principal, class_id: &ClassId) -> Result<CartItem, Error> {
        let class = self
            .timeouts
            .bound(
                "find class",
                self.class_repo.find_by_id(class_id),
                Self::map_class_error,
            )
            .await?;
        if class.is_none() {
            return Err(Error::not_found(format!("class {class_id} does not exist"))
                .with_details(json!({ "classId": class_id })));
        }

        if let Some(item) = self.existing_entry(&principal.email, class_id).await? {
            return Ok(item);
        }

        let item = CartItem {
            id: CartItemId::random(),
            user_email: principal.email.clone(),
            class_id: *class_id,
            added_at: self.clock.utc(),
        };
        match self
            .timeouts
            .run("insert cart entry", self.cart_repo.insert(&item))
            .await?
        {
            Ok(()) => {
                debug!(user = %item.user_email, class_id = %item.class_id, "class added to cart");
                Ok(item)
            }
            Err(err @ CartRepositoryError::DuplicateEntry { .. }) => {
                debug!(kind = err.kind(), class_id = %class_id, "concurrent cart insert; reusing entry");
                self.existing_entry(&principal.email, class_id)
                    .await?
                    .ok_or_else(|| {
                        Error::internal("cart entry disappeared during duplicate resolution")
                    })
            }
            Err(err) => Err(Self::map_cart_error(err)),
        }
    }

    async fn remove(&self, principal: &Principal, class_id: &ClassId) -> Result<bool, Error> {
        let removed = self
            .timeouts
            .bound(
                "remove cart entry",
                self.cart_repo.remove_for_user(&principal.email, class_id),
                Self::map_cart_error,
            )
            .await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl<C, K> CartQuery for CartService<C, K>
where
    C: ClassRepository,
    K: CartRepository,
{
    async fn cart_for(&self, user_email: &UserEmail) -> Result<Vec<CartLine>, Error> {
        let items = self
            .timeouts
            .bound(
                "list cart",
                self.cart_repo.list_for_user(user_email),
                Self::map_cart_error,
            )
            .await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let class_ids: Vec<ClassId> = items.iter().map(|item| item.class_id).collect();
        let classes: HashMap<ClassId, _> = self
            .timeouts
            .bound(
                "load cart classes",
                self.class_repo.find_by_ids(&class_ids),
                Self::map_class_error,
            )
            .await?
            .into_iter()
            .map(|class| (class.id, class))
            .collect();

        Ok(items
            .into_iter()
            .filter_map(|item| {
                classes.get(&item.class_id).map(|class| CartLine {
                    class: class.clone(),
                    item,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        FixtureClassRepository, MockCartRepository, MockClassRepository,
    };
    use crate::domain::{Class, ClassDetails, ErrorCode, Role};
    use chrono::Utc;
    use mockable::DefaultClock;

    fn email(raw: &str) -> UserEmail {
        UserEmail::new(raw).expect("valid email")
    }

    fn student() -> Principal {
        Principal::new(email("s@x.com"), Role::Student)
    }

    fn class() -> Class {
        Class::submit(
            ClassId::random(),
            email("tutor@x.com"),
            "Tutor",
            ClassDetails {
                name: "Clay".to_owned(),
                description: String::new(),
                price_cents: 900,
                available_seats: 4,
                video_url: String::new(),
            },
            Utc::now(),
        )
    }

    fn entry(class_id: ClassId) -> CartItem {
        CartItem {
            id: CartItemId::random(),
            user_email: email("s@x.com"),
            class_id,
            added_at: Utc::now(),
        }
    }

    fn make_service<C: ClassRepository>(
        classes: C,
        cart: MockCartRepository,
    ) -> CartService<C, MockCartRepository> {
        CartService::new(
            Arc::new(classes),
            Arc::new(cart),
            Arc::new(DefaultClock),
            ServiceTimeouts::default(),
        )
    }

    fn known_class(class: Class) -> MockClassRepository {
        let mut classes = MockClassRepository::new();
        classes
            .expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(class)));
        classes
    }

    #[tokio::test]
    async fn add_inserts_new_entry() {
        let class = class();
        let class_id = class.id;
        let mut cart = MockCartRepository::new();
        cart.expect_find().times(1).return_once(|_, _| Ok(None));
        cart.expect_insert()
            .withf(move |item| item.class_id == class_id)
            .times(1)
            .return_once(|_| Ok(()));

        let item = make_service(known_class(class), cart)
            .add(&student(), &class_id)
            .await
            .expect("added");

        assert_eq!(item.user_email, email("s@x.com"));
    }

    #[tokio::test]
    async fn adding_twice_returns_existing_entry() {
        let class = class();
        let class_id = class.id;
        let existing = entry(class_id);
        let existing_id = existing.id;
        let mut cart = MockCartRepository::new();
        cart.expect_find()
            .times(1)
            .return_once(move |_, _| Ok(Some(existing)));
        cart.expect_insert().never();

        let item = make_service(known_class(class), cart)
            .add(&student(), &class_id)
            .await
            .expect("existing entry returned");

        assert_eq!(item.id, existing_id);
    }

    #[tokio::test]
    async fn duplicate_insert_race_returns_winner() {
        let class = class();
        let class_id = class.id;
        let winner = entry(class_id);
        let winner_id = winner.id;
        let mut seq = mockall::Sequence::new();
        let mut cart = MockCartRepository::new();
        cart.expect_find()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_, _| Ok(None));
        cart.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_| Err(CartRepositoryError::duplicate_entry(class_id)));
        cart.expect_find()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_, _| Ok(Some(winner)));

        let item = make_service(known_class(class), cart)
            .add(&student(), &class_id)
            .await
            .expect("race resolved");

        assert_eq!(item.id, winner_id);
    }

    #[tokio::test]
    async fn adding_unknown_class_is_not_found() {
        let error = make_service(FixtureClassRepository, MockCartRepository::new())
            .add(&student(), &ClassId::random())
            .await
            .expect_err("not found");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn remove_is_scoped_to_principal() {
        let class_id = ClassId::random();
        let mut cart = MockCartRepository::new();
        cart.expect_remove_for_user()
            .withf(move |user, id| user.as_ref() == "s@x.com" && *id == class_id)
            .times(1)
            .return_once(|_, _| Ok(0));

        let removed = make_service(FixtureClassRepository, cart)
            .remove(&student(), &class_id)
            .await
            .expect("remove succeeds");

        assert!(!removed);
    }

    #[tokio::test]
    async fn cart_lines_skip_missing_classes_and_keep_order() {
        let first = class();
        let second = class();
        let items = vec![
            entry(second.id),
            entry(ClassId::random()),
            entry(first.id),
        ];
        let mut cart = MockCartRepository::new();
        cart.expect_list_for_user()
            .times(1)
            .return_once(move |_| Ok(items));
        let mut classes = MockClassRepository::new();
        let (first_id, second_id) = (first.id, second.id);
        classes
            .expect_find_by_ids()
            .times(1)
            .return_once(move |_| Ok(vec![first, second]));

        let lines = make_service(classes, cart)
            .cart_for(&email("s@x.com"))
            .await
            .expect("cart listed");

        let ids: Vec<ClassId> = lines.iter().map(|line| line.class.id).collect();
        assert_eq!(ids, vec![second_id, first_id]);
    }
}
