//! Admin-notify event handler (saga step C).

use std::sync::Arc;

use async_trait::async_trait;

use reliefnet_core::contract::SagaEvent;
use reliefnet_messaging::MessageHandler;

use crate::config::NotifierConfig;
use crate::error::UserError;
use crate::mailer::{AdminReviewEmail, Mailer};
use crate::notify::notify_many;
use crate::repository::UserRepository;

/// Consumes `user.notify.admin_review`: fetches the admins and fans out one
/// review-request mail per admin.
pub struct AdminNotifyHandler {
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    config: NotifierConfig,
}

impl AdminNotifyHandler {
    /// Creates the handler over the injected collaborators.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        config: NotifierConfig,
    ) -> Self {
        Self {
            users,
            mailer,
            config,
        }
    }
}

#[async_trait]
impl MessageHandler for AdminNotifyHandler {
    type Error = UserError;

    async fn handle(&self, event_type: &str, _key: &str, value: &[u8]) -> Result<(), Self::Error> {
        let payload = match SagaEvent::decode(event_type, value)? {
            SagaEvent::NotifyAdminReview(payload) => payload,
            other => {
                return Err(UserError::UnexpectedEvent {
                    topic: other.topic().to_owned(),
                });
            }
        };

        let admins = self.users.admins().await?;
        if admins.is_empty() {
            tracing::info!(disaster_id = %payload.disaster_id, "no admins to notify");
            return Ok(());
        }

        let email = AdminReviewEmail {
            disaster_id: payload.disaster_id,
            contributor_id: payload.contributor_id,
            review_url: self.config.review_url(payload.disaster_id),
        };
        tracing::info!(
            disaster_id = %payload.disaster_id,
            admins = admins.len(),
            "notifying admins for review"
        );
        notify_many(Arc::clone(&self.mailer), admins, email, self.config.sandbox).await?;
        Ok(())
    }
}
