//! Broker abstraction.
//!
//! The bus talks to the log through these traits. The contract they demand
//! of an implementation: durable append with acknowledgment, per-key
//! partition ordering, consumer groups with manual offset commit, and
//! at-least-once redelivery of uncommitted records. Idempotent-producer
//! duplicate suppression is the broker's job, not the bus's.

use std::time::Duration;

use async_trait::async_trait;
use reliefnet_core::retry::{ClassifyError, ErrorClass};
use thiserror::Error;

use crate::envelope::{Delivery, Envelope, Inbound};

/// Producer/consumer endpoint of a partitioned, at-least-once log.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Appends `envelope` to the log, returning once the broker acknowledges
    /// the write.
    ///
    /// # Errors
    ///
    /// Returns a [`BrokerError`] when the record was not durably appended.
    async fn send(&self, envelope: Envelope) -> Result<Delivery, BrokerError>;

    /// Opens a subscription for the consumer group `group` over `topics`.
    /// Fetching resumes from the group's last committed offsets.
    ///
    /// One subscription per group at a time; group rebalancing is not
    /// modelled.
    ///
    /// # Errors
    ///
    /// Returns a [`BrokerError`] when the subscription cannot be opened.
    async fn subscribe(
        &self,
        group: &str,
        topics: &[&str],
    ) -> Result<Box<dyn Subscription>, BrokerError>;
}

/// A consumer-group subscription handle.
#[async_trait]
pub trait Subscription: Send {
    /// Returns the next available message, or `None` when `max_wait` elapses
    /// with nothing to fetch.
    ///
    /// # Errors
    ///
    /// Returns a [`BrokerError`] when the subscription is unusable.
    async fn poll(&mut self, max_wait: Duration) -> Result<Option<Inbound>, BrokerError>;

    /// Durably marks `message` consumed for this group. Messages left
    /// uncommitted are redelivered to the group's next subscription.
    ///
    /// # Errors
    ///
    /// Returns a [`BrokerError`] when the commit could not be recorded.
    async fn commit(&mut self, message: &Inbound) -> Result<(), BrokerError>;

    /// Releases the subscription. Polling or committing afterwards fails
    /// with [`BrokerError::Closed`].
    async fn close(&mut self);
}

/// Failures reported by a broker.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// The broker cannot be reached or is not ready.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The broker did not acknowledge within its deadline.
    #[error("broker timed out: {0}")]
    Timeout(String),

    /// The broker rejected the record outright.
    #[error("record rejected by broker: {0}")]
    Rejected(String),

    /// The handle was used after being closed.
    #[error("broker handle closed")]
    Closed,
}

impl ClassifyError for BrokerError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => ErrorClass::Transient,
            Self::Rejected(_) | Self::Closed => ErrorClass::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_and_timeout_are_transient() {
        assert_eq!(
            BrokerError::Unavailable("connection refused".into()).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            BrokerError::Timeout("delivery report".into()).class(),
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_rejected_and_closed_are_permanent() {
        assert_eq!(
            BrokerError::Rejected("record too large".into()).class(),
            ErrorClass::Permanent
        );
        assert_eq!(BrokerError::Closed.class(), ErrorClass::Permanent);
    }
}
