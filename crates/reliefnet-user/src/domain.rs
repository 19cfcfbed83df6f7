//! User domain types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a user may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reviews disasters and receives notification mail.
    Admin,
    /// Reports disasters.
    Contributor,
}

/// A registered user. Credentials and auth live with the gateway, out of
/// scope here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Record id.
    pub id: Uuid,
    /// Display name, used in the mail greeting.
    pub name: String,
    /// Delivery address.
    pub email: String,
    /// Role.
    pub role: Role,
}
