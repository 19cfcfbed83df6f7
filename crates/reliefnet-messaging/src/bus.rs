//! The message-bus client.
//!
//! [`MessageBus`] is the one way services touch the event log. Publishing
//! waits for a broker acknowledgment under the bus retry policy, so callers
//! can treat a returned `Ok` as a commit point for the saga. Consuming runs
//! a sequential poll loop that retries each message with backoff, redirects
//! poison messages to `<topic>-DLQ`, and commits the offset regardless of
//! the outcome so one bad message never wedges a partition.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reliefnet_core::retry::{ClassifyError, RetryError, RetryPolicy, run_with_backoff};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::broker::{Broker, BrokerError, Subscription};
use crate::config::BusConfig;
use crate::envelope::{Delivery, Envelope, Inbound};
use crate::trace;

/// Returns the dead-letter topic for `topic`.
#[must_use]
pub fn dlq_topic(topic: &str) -> String {
    format!("{topic}-DLQ")
}

/// The retry policy applied to every publish attempt and to every consumed
/// message's handler: 5 attempts, 100 ms initial delay doubling to a 5 s
/// cap, jittered.
#[must_use]
pub fn bus_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(5),
        backoff_factor: 2.0,
        jitter: true,
    }
}

/// Consumer-side message handler.
///
/// Invoked once per delivered message, wrapped in the bus retry policy. The
/// error's [`ClassifyError`] implementation decides whether the bus retries
/// (transient) or dead-letters immediately (permanent); unknown event types
/// and malformed payloads must classify as permanent.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// The handler's failure type.
    type Error: ClassifyError + std::error::Error + Send;

    /// Processes one message.
    ///
    /// # Errors
    ///
    /// Returns the handler's error when the message could not be processed.
    async fn handle(&self, event_type: &str, key: &str, value: &[u8]) -> Result<(), Self::Error>;
}

/// Failures surfaced by the bus to its callers.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus was closed (or the shutdown token cancelled) mid-operation.
    #[error("message bus closed")]
    Cancelled,

    /// Every publish attempt failed transiently.
    #[error("publish to {topic} failed after {attempts} attempt(s)")]
    Publish {
        /// Destination topic.
        topic: String,
        /// Attempts made.
        attempts: u32,
        /// The last broker failure.
        #[source]
        source: BrokerError,
    },

    /// The broker rejected the record outright; retrying cannot help.
    #[error("record rejected on {topic}")]
    Rejected {
        /// Destination topic.
        topic: String,
        /// The rejection.
        #[source]
        source: BrokerError,
    },

    /// The consumer-group subscription could not be opened.
    #[error("subscribe failed")]
    Subscribe(#[source] BrokerError),
}

/// Publish/consume client over a [`Broker`].
///
/// Constructed once per service and passed by reference to everything that
/// publishes or consumes; holds a child of the application shutdown token,
/// so cancelling the parent stops in-flight publishes and poll loops.
pub struct MessageBus {
    broker: Arc<dyn Broker>,
    config: BusConfig,
    retry: RetryPolicy,
    token: CancellationToken,
}

impl MessageBus {
    /// Creates a bus over `broker`, scoped to a child of `shutdown`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, config: BusConfig, shutdown: &CancellationToken) -> Self {
        Self {
            broker,
            config,
            retry: bus_retry_policy(),
            token: shutdown.child_token(),
        }
    }

    /// Publishes `value` to `topic` keyed by `key`, injecting the current
    /// trace context into the message headers, and waits for the broker's
    /// delivery acknowledgment. Retries transient broker failures under the
    /// bus retry policy. Never fire-and-forget: the returned `Ok` carries
    /// the acknowledged partition and offset.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Cancelled`] when the bus is closed before the
    /// broker acknowledges, [`BusError::Rejected`] when the broker refuses
    /// the record, and [`BusError::Publish`] when every attempt failed.
    pub async fn publish(
        &self,
        topic: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<Delivery, BusError> {
        let span = tracing::info_span!("bus.publish", topic, key);
        async {
            let mut envelope = Envelope::new(topic, key, value);
            trace::inject(&mut envelope.headers);

            let result = tokio::select! {
                () = self.token.cancelled() => return Err(BusError::Cancelled),
                result = run_with_backoff(&self.token, &self.retry, || {
                    self.broker.send(envelope.clone())
                }) => result,
            };

            match result {
                Ok(delivery) => {
                    tracing::debug!(
                        partition = delivery.partition,
                        offset = delivery.offset,
                        "message acknowledged"
                    );
                    Ok(delivery)
                }
                Err(RetryError::Cancelled) => Err(BusError::Cancelled),
                Err(RetryError::Permanent { source, .. }) => Err(BusError::Rejected {
                    topic: topic.to_owned(),
                    source,
                }),
                Err(RetryError::Exhausted { attempts, source }) => Err(BusError::Publish {
                    topic: topic.to_owned(),
                    attempts,
                    source,
                }),
            }
        }
        .instrument(span)
        .await
    }

    /// Consumes `topics` under this bus's consumer group, invoking `handler`
    /// for every message until the bus is closed, then returns `Ok(())`.
    ///
    /// Handling is sequential within the loop: a slow or retry-exhausting
    /// message delays the next one on this consumer, never another group.
    /// The offset is committed whether the handler succeeded, exhausted its
    /// retries, or the dead-letter publish failed; only cancellation
    /// mid-message leaves it uncommitted for redelivery.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Subscribe`] when the subscription cannot be
    /// opened. Per-message failures never abort the loop.
    pub async fn consume<H: MessageHandler>(
        &self,
        topics: &[&str],
        handler: &H,
    ) -> Result<(), BusError> {
        let mut subscription = self
            .broker
            .subscribe(&self.config.group_id, topics)
            .await
            .map_err(BusError::Subscribe)?;
        tracing::info!(group = %self.config.group_id, ?topics, "consumer started");

        loop {
            let polled = tokio::select! {
                () = self.token.cancelled() => {
                    subscription.close().await;
                    tracing::info!(group = %self.config.group_id, "consumer stopped");
                    return Ok(());
                }
                polled = subscription.poll(self.config.poll_interval) => polled,
            };

            match polled {
                Ok(Some(message)) => {
                    if self.process(subscription.as_mut(), &message, handler).await
                        == Outcome::Cancelled
                    {
                        // Leave the offset uncommitted; the next subscription
                        // of this group gets the message again.
                        subscription.close().await;
                        tracing::info!(group = %self.config.group_id, "consumer stopped");
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "poll failed; continuing");
                }
            }
        }
    }

    /// Closes the bus: pending publishes return [`BusError::Cancelled`] and
    /// poll loops release their subscriptions and return. Idempotent.
    pub fn close(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("closing message bus");
            self.token.cancel();
        }
    }

    async fn process<H: MessageHandler>(
        &self,
        subscription: &mut dyn Subscription,
        message: &Inbound,
        handler: &H,
    ) -> Outcome {
        let envelope = &message.envelope;
        let span = tracing::info_span!(
            "bus.consume",
            topic = %envelope.topic,
            key = %envelope.key,
            partition = message.partition,
            offset = message.offset,
        );
        trace::link_parent(&span, &envelope.headers);

        async {
            let handled = run_with_backoff(&self.token, &self.retry, || {
                handler.handle(&envelope.topic, &envelope.key, &envelope.value)
            })
            .await;

            match handled {
                Ok(()) => {}
                Err(RetryError::Cancelled) => return Outcome::Cancelled,
                Err(RetryError::Permanent { source, .. }) => {
                    tracing::warn!(error = %source, "handler failed permanently; dead-lettering");
                    self.dead_letter(message).await;
                }
                Err(RetryError::Exhausted { attempts, source }) => {
                    tracing::warn!(
                        attempts,
                        error = %source,
                        "handler retries exhausted; dead-lettering"
                    );
                    self.dead_letter(message).await;
                }
            }

            if let Err(err) = subscription.commit(message).await {
                tracing::error!(error = %err, "offset commit failed");
            }
            Outcome::Committed
        }
        .instrument(span)
        .await
    }

    /// Republishes `message` verbatim (same key and value) to the
    /// dead-letter topic. A failed or timed-out dead-letter publish drops
    /// the message: forward progress is chosen over zero loss, and the
    /// condition is logged for operators.
    async fn dead_letter(&self, message: &Inbound) {
        let topic = dlq_topic(&message.envelope.topic);
        let envelope = Envelope {
            topic: topic.clone(),
            key: message.envelope.key.clone(),
            value: message.envelope.value.clone(),
            headers: message.envelope.headers.clone(),
        };

        match tokio::time::timeout(self.config.dlq_publish_timeout, self.broker.send(envelope))
            .await
        {
            Ok(Ok(delivery)) => {
                tracing::warn!(
                    dlq = %topic,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "message dead-lettered"
                );
            }
            Ok(Err(err)) => {
                tracing::error!(
                    dlq = %topic,
                    key = %message.envelope.key,
                    error = %err,
                    "CRITICAL: dead-letter publish failed; message dropped"
                );
            }
            Err(_) => {
                tracing::error!(
                    dlq = %topic,
                    key = %message.envelope.key,
                    "CRITICAL: dead-letter publish timed out; message dropped"
                );
            }
        }
    }
}

impl Drop for MessageBus {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Committed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;

    fn bus_over(broker: &InMemoryBroker) -> MessageBus {
        MessageBus::new(
            Arc::new(broker.clone()),
            BusConfig::new("test-group"),
            &CancellationToken::new(),
        )
    }

    #[test]
    fn test_dlq_topic_appends_suffix() {
        assert_eq!(dlq_topic("resource.cmd.find"), "resource.cmd.find-DLQ");
    }

    #[tokio::test]
    async fn test_publish_returns_broker_acknowledgment() {
        let broker = InMemoryBroker::new();
        let bus = bus_over(&broker);

        let delivery = bus
            .publish("resource.cmd.find", "d-1", b"{}".to_vec())
            .await
            .unwrap();

        let records = broker.records("resource.cmd.find");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset, delivery.offset);
        assert_eq!(records[0].partition, delivery.partition);
        assert_eq!(records[0].envelope.key, "d-1");
    }

    #[tokio::test]
    async fn test_publish_after_close_is_cancelled() {
        let broker = InMemoryBroker::new();
        let bus = bus_over(&broker);
        bus.close();

        let result = bus.publish("resource.cmd.find", "d-1", b"{}".to_vec()).await;

        assert!(matches!(result.unwrap_err(), BusError::Cancelled));
        assert!(broker.records("resource.cmd.find").is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let broker = InMemoryBroker::new();
        let bus = bus_over(&broker);

        bus.close();
        bus.close();
    }

    #[tokio::test]
    async fn test_parent_token_cancellation_closes_the_bus() {
        let broker = InMemoryBroker::new();
        let shutdown = CancellationToken::new();
        let bus = MessageBus::new(
            Arc::new(broker.clone()),
            BusConfig::new("test-group"),
            &shutdown,
        );

        shutdown.cancel();

        let result = bus.publish("resource.cmd.find", "d-1", b"{}".to_vec()).await;
        assert!(matches!(result.unwrap_err(), BusError::Cancelled));
    }
}
