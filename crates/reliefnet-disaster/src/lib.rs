//! ReliefNet Disaster — the disaster bounded context.
//!
//! Owns the disaster record and the first hop of the relief saga: reporting
//! a disaster persists it as pending and publishes the find-resources
//! command, compensating with a hard delete when the command cannot be made
//! durable. Also handles human review and the explicit delete command.

pub mod application;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod repository;

pub use application::{
    DisasterReceipt, ReportConfig, handle_report_disaster, handle_review_disaster,
    request_deletion,
};
pub use consumer::DeleteCommandHandler;
pub use domain::{Disaster, DisasterStatus, ReportDisaster, ReviewDisaster, ReviewVerdict};
pub use error::DisasterError;
pub use repository::DisasterRepository;
