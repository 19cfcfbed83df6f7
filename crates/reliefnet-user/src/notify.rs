//! Bounded-concurrency notification fan-out.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use reliefnet_core::retry::{RetryPolicy, run_with_backoff};

use crate::domain::User;
use crate::mailer::{ADMIN_NOTIFY_TEMPLATE, AdminReviewEmail, Mailer};

/// Cap on concurrent outbound sends against the mail provider.
pub const MAX_CONCURRENT_SENDS: usize = 5;

/// The per-send retry budget: 3 attempts, 2 s initial delay doubling to a
/// 30 s cap, jittered. Independent of the saga-level retry around the
/// consuming handler.
#[must_use]
pub fn mail_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(30),
        backoff_factor: 2.0,
        jitter: true,
    }
}

/// Aggregate outcome of a fan-out that did not fully succeed.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// At least one recipient could not be notified.
    #[error("{failed} of {total} notifications failed ({succeeded} succeeded); failed recipients: {}", .failed_recipients.join(", "))]
    Partial {
        /// Recipients attempted.
        total: usize,
        /// Sends that were accepted.
        succeeded: usize,
        /// Sends that failed after their retry budget.
        failed: usize,
        /// Email addresses of the failed sends.
        failed_recipients: Vec<String>,
    },
}

/// Notifies every recipient, at most [`MAX_CONCURRENT_SENDS`] at a time.
///
/// One task per recipient, gated by a semaphore; each task retries its send
/// under [`mail_retry_policy`] and reports exactly one result over a
/// channel sized to the recipient count, so no task leaks and no result is
/// lost. One recipient's failure never cancels the others. An empty
/// recipient list succeeds trivially.
///
/// # Errors
///
/// Returns [`NotifyError::Partial`] naming every failed recipient when any
/// send failed; `Ok(())` only when all succeeded.
pub async fn notify_many(
    mailer: Arc<dyn Mailer>,
    recipients: Vec<User>,
    email: AdminReviewEmail,
    sandbox: bool,
) -> Result<(), NotifyError> {
    if recipients.is_empty() {
        return Ok(());
    }

    let total = recipients.len();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_SENDS));
    let (tx, mut rx) = mpsc::channel(total);

    for recipient in recipients {
        let mailer = Arc::clone(&mailer);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let email = email.clone();
        tokio::spawn(async move {
            let result = send_one(mailer.as_ref(), &semaphore, &recipient, &email, sandbox).await;
            // Capacity equals the task count, so this never blocks; the
            // receiver only closes after draining all results.
            let _ = tx.send((recipient.email, result)).await;
        });
    }
    drop(tx);

    let mut succeeded = 0;
    let mut failed_recipients = Vec::new();
    while let Some((address, result)) = rx.recv().await {
        match result {
            Ok(status) => {
                tracing::debug!(recipient = %address, status, "notification sent");
                succeeded += 1;
            }
            Err(err) => {
                tracing::warn!(recipient = %address, error = %err, "notification failed");
                failed_recipients.push(address);
            }
        }
    }

    if failed_recipients.is_empty() {
        tracing::info!(total, "all admins notified");
        Ok(())
    } else {
        failed_recipients.sort();
        Err(NotifyError::Partial {
            total,
            succeeded,
            failed: failed_recipients.len(),
            failed_recipients,
        })
    }
}

async fn send_one(
    mailer: &dyn Mailer,
    semaphore: &Semaphore,
    recipient: &User,
    email: &AdminReviewEmail,
    sandbox: bool,
) -> Result<u16, String> {
    let Ok(_permit) = semaphore.acquire().await else {
        return Err("send slot unavailable".to_owned());
    };

    // Sends run to completion even during shutdown; a half-notified admin
    // group would need manual follow-up.
    let token = CancellationToken::new();
    run_with_backoff(&token, &mail_retry_policy(), || {
        mailer.send(ADMIN_NOTIFY_TEMPLATE, recipient, email, sandbox)
    })
    .await
    .map_err(|err| err.to_string())
}
