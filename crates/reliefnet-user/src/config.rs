//! Notifier configuration.

use std::env;

/// Settings for the admin notification step.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Base URL of the review UI; the mail's deep link is
    /// `{review_base_url}/admin/review/{disaster_id}`.
    pub review_base_url: String,
    /// Ask the provider to validate without delivering.
    pub sandbox: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            review_base_url: "http://localhost:3000".to_owned(),
            sandbox: false,
        }
    }
}

impl NotifierConfig {
    /// Reads `WEB_URL` and `MAIL_SANDBOX` from the environment, falling
    /// back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            review_base_url: env::var("WEB_URL").unwrap_or(defaults.review_base_url),
            sandbox: env::var("MAIL_SANDBOX")
                .map(|raw| raw == "true" || raw == "1")
                .unwrap_or(defaults.sandbox),
        }
    }

    /// The review deep link for a disaster.
    #[must_use]
    pub fn review_url(&self, disaster_id: uuid::Uuid) -> String {
        format!("{}/admin/review/{disaster_id}", self.review_base_url)
    }
}
