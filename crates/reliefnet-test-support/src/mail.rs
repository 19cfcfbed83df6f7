//! Mailer double.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use reliefnet_user::{AdminReviewEmail, MailError, Mailer, User};

/// A mailer that records every send, fails scripted recipients on every
/// attempt, and tracks the peak number of concurrent sends so fan-out
/// bounds can be asserted without timing games.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sends: Mutex<Vec<(String, AdminReviewEmail)>>,
    failing: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingMailer {
    /// Creates a mailer that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send to `email` fail with a transient transport error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_for(&self, email: &str) {
        self.failing.lock().unwrap().insert(email.to_owned());
    }

    /// Every attempted send as `(recipient email, data)`, in completion
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn sends(&self) -> Vec<(String, AdminReviewEmail)> {
        self.sends.lock().unwrap().clone()
    }

    /// How many sends were attempted for `email`.
    #[must_use]
    pub fn attempts_for(&self, email: &str) -> usize {
        self.sends()
            .iter()
            .filter(|(recipient, _)| recipient == email)
            .count()
    }

    /// The peak number of sends in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        _template: &str,
        recipient: &User,
        data: &AdminReviewEmail,
        _sandbox: bool,
    ) -> Result<u16, MailError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        // Yield across the runtime so overlapping sends actually overlap.
        tokio::time::sleep(Duration::from_millis(1)).await;

        self.sends
            .lock()
            .unwrap()
            .push((recipient.email.clone(), data.clone()));
        let failing = self.failing.lock().unwrap().contains(&recipient.email);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if failing {
            Err(MailError::Transport("smtp 451 try again later".to_owned()))
        } else {
            Ok(202)
        }
    }
}
