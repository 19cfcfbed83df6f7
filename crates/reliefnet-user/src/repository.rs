//! User persistence trait.

use async_trait::async_trait;

use crate::domain::User;
use crate::error::UserError;

/// Persistence collaborator for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users with the admin role, the recipients of review
    /// notifications.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Repository`] when the store is unavailable.
    async fn admins(&self) -> Result<Vec<User>, UserError>;
}
