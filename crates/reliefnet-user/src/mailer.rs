//! Mail transport trait.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use reliefnet_core::retry::{ClassifyError, ErrorClass};

use crate::domain::User;

/// Template rendered for the admin review notification.
pub const ADMIN_NOTIFY_TEMPLATE: &str = "admin_notify";

/// Dynamic data for [`ADMIN_NOTIFY_TEMPLATE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminReviewEmail {
    /// The disaster awaiting review.
    pub disaster_id: Uuid,
    /// Who reported it.
    pub contributor_id: Uuid,
    /// Deep link into the review UI.
    pub review_url: String,
}

/// Mail transport failures.
#[derive(Debug, Error)]
pub enum MailError {
    /// The transport could not be reached or dropped the connection.
    #[error("mail transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("mail provider returned status {0}")]
    Status(u16),
}

impl ClassifyError for MailError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Transport(_) => ErrorClass::Transient,
            // Provider-side errors are retryable; a rejected request is not.
            Self::Status(code) if *code >= 500 => ErrorClass::Transient,
            Self::Status(_) => ErrorClass::Permanent,
        }
    }
}

/// The outbound mail collaborator (a SendGrid-style provider). Template
/// rendering and API specifics live behind an implementation at the binary
/// edge.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one templated message to `recipient`, returning the provider's
    /// status code. With `sandbox` set the provider validates but does not
    /// deliver.
    ///
    /// # Errors
    ///
    /// Returns a [`MailError`] when the message was not accepted.
    async fn send(
        &self,
        template: &str,
        recipient: &User,
        data: &AdminReviewEmail,
        sandbox: bool,
    ) -> Result<u16, MailError>;
}
