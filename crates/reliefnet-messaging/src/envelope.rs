//! Message envelope and header types.

use std::collections::BTreeMap;

use opentelemetry::propagation::{Extractor, Injector};
use serde::{Deserialize, Serialize};

/// String key/value headers attached to every envelope.
///
/// Carries W3C trace context between services. Implements the OpenTelemetry
/// carrier traits so the configured propagator can read and write headers
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets a header, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the header value for `key`, if present.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True when no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of headers set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Injector for Headers {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_owned(), value);
    }
}

impl Extractor for Headers {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Destination topic.
    pub topic: String,
    /// Partition key; the disaster id for every saga event.
    pub key: String,
    /// Opaque payload bytes (JSON for saga events).
    pub value: Vec<u8>,
    /// Trace-context headers.
    pub headers: Headers,
}

impl Envelope {
    /// Creates an envelope with empty headers.
    #[must_use]
    pub fn new(topic: impl Into<String>, key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            value,
            headers: Headers::new(),
        }
    }
}

/// Broker acknowledgment for a durably appended record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Partition the record landed on.
    pub partition: u32,
    /// Offset of the record within its partition.
    pub offset: u64,
}

/// A message fetched by a subscription, with its log position.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// The message as it was published.
    pub envelope: Envelope,
    /// Partition the message was read from.
    pub partition: u32,
    /// Offset within the partition.
    pub offset: u64,
}
