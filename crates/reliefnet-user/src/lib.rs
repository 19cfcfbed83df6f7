//! ReliefNet User — the user bounded context.
//!
//! Final hop of the relief saga: consumes the admin-review event and fans
//! out one notification per admin, bounded to five concurrent sends, each
//! with its own retry budget, tolerating partial failure.

pub mod config;
pub mod domain;
pub mod error;
pub mod handler;
pub mod mailer;
pub mod notify;
pub mod repository;

pub use config::NotifierConfig;
pub use domain::{Role, User};
pub use error::UserError;
pub use handler::AdminNotifyHandler;
pub use mailer::{ADMIN_NOTIFY_TEMPLATE, AdminReviewEmail, MailError, Mailer};
pub use notify::{NotifyError, notify_many};
pub use repository::UserRepository;
