//! ReliefNet Messaging — the event-log client every service talks through.
//!
//! Publishing waits for a broker acknowledgment, consuming retries each
//! message with backoff and redirects poison messages to a dead-letter
//! topic, and W3C trace context rides in message headers on both paths.

pub mod broker;
pub mod bus;
pub mod config;
pub mod envelope;
pub mod memory;
pub mod trace;

pub use broker::{Broker, BrokerError, Subscription};
pub use bus::{BusError, MessageBus, MessageHandler, dlq_topic};
pub use config::BusConfig;
pub use envelope::{Delivery, Envelope, Headers, Inbound};
pub use memory::InMemoryBroker;
