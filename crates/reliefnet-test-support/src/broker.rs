//! Broker fakes for failure injection.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use reliefnet_messaging::{
    Broker, BrokerError, Delivery, Envelope, InMemoryBroker, Subscription,
};

/// A broker whose sends always fail as unavailable. Subscriptions delegate
/// to an inner in-memory broker, so consume paths still work while every
/// publish fails.
#[derive(Debug, Default)]
pub struct FailingBroker {
    inner: InMemoryBroker,
    send_attempts: AtomicU32,
}

impl FailingBroker {
    /// Creates the broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing in-memory broker. Messages already queued on
    /// `inner`, and offsets committed against it, stay observable through
    /// the caller's own handle.
    #[must_use]
    pub fn with_inner(inner: InMemoryBroker) -> Self {
        Self {
            inner,
            send_attempts: AtomicU32::new(0),
        }
    }

    /// How many sends were attempted (and failed).
    #[must_use]
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for FailingBroker {
    async fn send(&self, _envelope: Envelope) -> Result<Delivery, BrokerError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::Unavailable("broker down".to_owned()))
    }

    async fn subscribe(
        &self,
        group: &str,
        topics: &[&str],
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        self.inner.subscribe(group, topics).await
    }
}

/// A broker whose first `failures` sends fail transiently, then delegates
/// to an inner in-memory broker. Exercises producer-side retries.
#[derive(Debug)]
pub struct FlakyBroker {
    inner: InMemoryBroker,
    failures_remaining: AtomicU32,
    send_attempts: AtomicU32,
}

impl FlakyBroker {
    /// Wraps `inner`, failing the first `failures` sends.
    #[must_use]
    pub fn new(inner: InMemoryBroker, failures: u32) -> Self {
        Self {
            inner,
            failures_remaining: AtomicU32::new(failures),
            send_attempts: AtomicU32::new(0),
        }
    }

    /// How many sends were attempted, failed and successful alike.
    #[must_use]
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for FlakyBroker {
    async fn send(&self, envelope: Envelope) -> Result<Delivery, BrokerError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(BrokerError::Timeout("injected delivery timeout".to_owned()));
        }
        self.inner.send(envelope).await
    }

    async fn subscribe(
        &self,
        group: &str,
        topics: &[&str],
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        self.inner.subscribe(group, topics).await
    }
}
