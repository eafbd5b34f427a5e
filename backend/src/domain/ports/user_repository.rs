//! Port for marketplace user records.

use async_trait::async_trait;

use crate::domain::{User, UserEmail};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "user repository query failed: {message}",
    }
}

/// Storage for user records, keyed by their unique email.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user or replace the record stored under the same email.
    async fn upsert(&self, user: &User) -> Result<(), UserRepositoryError>;

    /// Fetch one user by email.
    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, UserRepositoryError>;

    /// Fetch every user whose email is listed. Unknown emails are skipped.
    async fn find_by_emails(&self, emails: &[UserEmail]) -> Result<Vec<User>, UserRepositoryError>;
}

/// Fixture implementation that knows no users.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserRepository;

#[async_trait]
impl UserRepository for FixtureUserRepository {
    async fn upsert(&self, _user: &User) -> Result<(), UserRepositoryError> {
        Ok(())
    }

    async fn find_by_email(&self, _email: &UserEmail) -> Result<Option<User>, UserRepositoryError> {
        Ok(None)
    }

    async fn find_by_emails(
        &self,
        _emails: &[UserEmail],
    ) -> Result<Vec<User>, UserRepositoryError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_repository_knows_no_users() {
        let repo = FixtureUserRepository;
        let email = UserEmail::new("nobody@x.com").expect("valid email");

        assert!(
            repo.find_by_email(&email)
                .await
                .expect("fixture lookup")
                .is_none()
        );
        assert!(
            repo.find_by_emails(&[email])
                .await
                .expect("fixture lookup")
                .is_empty()
        );
    }
}
