//! Shared test doubles and utilities for the ReliefNet workspace.

mod broker;
mod clock;
mod disaster;
mod mail;
mod resource;
mod tracing_init;
mod user;

pub use broker::{FailingBroker, FlakyBroker};
pub use clock::FixedClock;
pub use disaster::{FailingDisasterRepository, InMemoryDisasterRepository};
pub use mail::RecordingMailer;
pub use resource::{RecordingResourceStore, ScriptedDirectory};
pub use tracing_init::init_test_tracing;
pub use user::{InMemoryUserRepository, admin, contributor};
