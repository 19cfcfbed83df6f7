//! In-process broker backend.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::broker::{Broker, BrokerError, Subscription};
use crate::envelope::{Delivery, Envelope, Headers, Inbound};

/// In-process partitioned log providing the semantics the bus depends on:
/// durable-within-process append with acknowledgment, key-hash partition
/// routing, per-partition ordering, consumer-group offsets with manual
/// commit, and redelivery of uncommitted records on re-subscribe.
///
/// The development and test backend behind the [`Broker`] trait. Cloning
/// yields another handle to the same log.
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    state: Arc<Mutex<LogState>>,
    notify: Arc<Notify>,
    partitions: u32,
}

/// One offset commit accepted by the broker, kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    /// Consumer group that committed.
    pub group: String,
    /// Topic of the committed message.
    pub topic: String,
    /// Partition of the committed message.
    pub partition: u32,
    /// Offset of the committed message.
    pub offset: u64,
}

#[derive(Debug, Default)]
struct LogState {
    topics: HashMap<String, Vec<Vec<StoredRecord>>>,
    committed: HashMap<(String, String, u32), u64>,
    commits: Vec<CommitEntry>,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    offset: u64,
    key: String,
    value: Vec<u8>,
    headers: Headers,
}

fn idx(partition: u32) -> usize {
    usize::try_from(partition).unwrap_or_default()
}

fn lock_state(state: &Mutex<LogState>) -> Result<MutexGuard<'_, LogState>, BrokerError> {
    state
        .lock()
        .map_err(|_| BrokerError::Unavailable("broker state lock poisoned".to_owned()))
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Creates a broker with four partitions per topic.
    #[must_use]
    pub fn new() -> Self {
        Self::with_partitions(4)
    }

    /// Creates a broker with `partitions` partitions per topic (at least 1).
    #[must_use]
    pub fn with_partitions(partitions: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(LogState::default())),
            notify: Arc::new(Notify::new()),
            partitions: partitions.max(1),
        }
    }

    /// All records appended to `topic`, ordered by partition then offset.
    #[must_use]
    pub fn records(&self, topic: &str) -> Vec<Inbound> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        let Some(logs) = state.topics.get(topic) else {
            return Vec::new();
        };
        let mut records = Vec::new();
        for (partition, log) in logs.iter().enumerate() {
            for record in log {
                records.push(Inbound {
                    envelope: Envelope {
                        topic: topic.to_owned(),
                        key: record.key.clone(),
                        value: record.value.clone(),
                        headers: record.headers.clone(),
                    },
                    partition: u32::try_from(partition).unwrap_or(u32::MAX),
                    offset: record.offset,
                });
            }
        }
        records
    }

    /// Every offset commit accepted so far, in call order.
    #[must_use]
    pub fn commits(&self) -> Vec<CommitEntry> {
        self.state
            .lock()
            .map(|state| state.commits.clone())
            .unwrap_or_default()
    }

    /// The group's committed position (next offset to fetch) for a topic
    /// partition, if the group ever committed there.
    #[must_use]
    pub fn committed_offset(&self, group: &str, topic: &str, partition: u32) -> Option<u64> {
        self.state.lock().ok().and_then(|state| {
            state
                .committed
                .get(&(group.to_owned(), topic.to_owned(), partition))
                .copied()
        })
    }

    fn partition_for(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        u32::try_from(hasher.finish() % u64::from(self.partitions)).unwrap_or(0)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn send(&self, envelope: Envelope) -> Result<Delivery, BrokerError> {
        let partition = self.partition_for(&envelope.key);
        let partition_count = self.partitions;
        let delivery = {
            let mut state = lock_state(&self.state)?;
            let logs = state
                .topics
                .entry(envelope.topic)
                .or_insert_with(|| vec![Vec::new(); idx(partition_count)]);
            let log = logs
                .get_mut(idx(partition))
                .ok_or_else(|| BrokerError::Rejected("partition out of range".to_owned()))?;
            let offset = log.last().map_or(0, |record| record.offset + 1);
            log.push(StoredRecord {
                offset,
                key: envelope.key,
                value: envelope.value,
                headers: envelope.headers,
            });
            Delivery { partition, offset }
        };
        self.notify.notify_waiters();
        Ok(delivery)
    }

    async fn subscribe(
        &self,
        group: &str,
        topics: &[&str],
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        let mut assignment = Vec::new();
        let mut positions = Vec::new();
        {
            let mut state = lock_state(&self.state)?;
            for topic in topics {
                let partition_count = self.partitions;
                state
                    .topics
                    .entry((*topic).to_owned())
                    .or_insert_with(|| vec![Vec::new(); idx(partition_count)]);
                for partition in 0..partition_count {
                    let position = state
                        .committed
                        .get(&(group.to_owned(), (*topic).to_owned(), partition))
                        .copied()
                        .unwrap_or(0);
                    assignment.push(((*topic).to_owned(), partition));
                    positions.push(position);
                }
            }
        }
        Ok(Box::new(MemorySubscription {
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
            group: group.to_owned(),
            assignment,
            positions,
            cursor: 0,
            closed: false,
        }))
    }
}

struct MemorySubscription {
    state: Arc<Mutex<LogState>>,
    notify: Arc<Notify>,
    group: String,
    assignment: Vec<(String, u32)>,
    positions: Vec<u64>,
    cursor: usize,
    closed: bool,
}

impl MemorySubscription {
    /// Fetches the next record past this subscription's positions,
    /// round-robining across assigned partitions for fairness.
    fn try_fetch(&mut self) -> Result<Option<Inbound>, BrokerError> {
        if self.assignment.is_empty() {
            return Ok(None);
        }
        let state = lock_state(&self.state)?;
        let slots = self.assignment.len();
        for step in 0..slots {
            let slot = (self.cursor + step) % slots;
            let (topic, partition) = &self.assignment[slot];
            let position = self.positions[slot];
            let record = state
                .topics
                .get(topic)
                .and_then(|logs| logs.get(idx(*partition)))
                .and_then(|log| usize::try_from(position).ok().and_then(|i| log.get(i)));
            if let Some(record) = record {
                let message = Inbound {
                    envelope: Envelope {
                        topic: topic.clone(),
                        key: record.key.clone(),
                        value: record.value.clone(),
                        headers: record.headers.clone(),
                    },
                    partition: *partition,
                    offset: record.offset,
                };
                self.positions[slot] = record.offset + 1;
                self.cursor = (slot + 1) % slots;
                return Ok(Some(message));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn poll(&mut self, max_wait: Duration) -> Result<Option<Inbound>, BrokerError> {
        if self.closed {
            return Err(BrokerError::Closed);
        }
        let deadline = tokio::time::Instant::now() + max_wait;
        let notify = Arc::clone(&self.notify);
        let mut notified = pin!(notify.notified());
        loop {
            // Register for wakeups before checking, so an append racing the
            // check cannot be missed.
            notified.as_mut().enable();
            if let Some(message) = self.try_fetch()? {
                return Ok(Some(message));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            if tokio::time::timeout_at(deadline, notified.as_mut())
                .await
                .is_err()
            {
                return Ok(None);
            }
            notified.set(notify.notified());
        }
    }

    async fn commit(&mut self, message: &Inbound) -> Result<(), BrokerError> {
        if self.closed {
            return Err(BrokerError::Closed);
        }
        let mut state = lock_state(&self.state)?;
        let key = (
            self.group.clone(),
            message.envelope.topic.clone(),
            message.partition,
        );
        let next = message.offset + 1;
        let position = state.committed.entry(key).or_insert(0);
        *position = (*position).max(next);
        state.commits.push(CommitEntry {
            group: self.group.clone(),
            topic: message.envelope.topic.clone(),
            partition: message.partition,
            offset: message.offset,
        });
        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}
