//! User repository double and fixture helpers.

use async_trait::async_trait;
use uuid::Uuid;

use reliefnet_user::{Role, User, UserError, UserRepository};

/// Builds an admin whose email is `{name}@relief.test`.
#[must_use]
pub fn admin(name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        email: format!("{name}@relief.test"),
        role: Role::Admin,
    }
}

/// Builds a contributor whose email is `{name}@relief.test`.
#[must_use]
pub fn contributor(name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        email: format!("{name}@relief.test"),
        role: Role::Contributor,
    }
}

/// An in-memory user repository.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Vec<User>,
}

impl InMemoryUserRepository {
    /// Creates a repository holding `users`.
    #[must_use]
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn admins(&self) -> Result<Vec<User>, UserError> {
        Ok(self
            .users
            .iter()
            .filter(|user| user.role == Role::Admin)
            .cloned()
            .collect())
    }
}
