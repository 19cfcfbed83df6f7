//! User context errors.

use thiserror::Error;

use reliefnet_core::contract::ContractError;
use reliefnet_core::retry::{ClassifyError, ErrorClass};

use crate::notify::NotifyError;

/// Failures in the user context.
#[derive(Debug, Error)]
pub enum UserError {
    /// The persistence collaborator failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// The fan-out did not reach every admin.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The consumed payload is outside the saga contract.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// A saga event arrived on a topic this context does not handle.
    #[error("unexpected event for user context: {topic}")]
    UnexpectedEvent {
        /// The topic the event arrived on.
        topic: String,
    },
}

impl ClassifyError for UserError {
    fn class(&self) -> ErrorClass {
        match self {
            // Redelivery may reach the admins a failed fan-out missed;
            // duplicates to the rest are the at-least-once cost.
            Self::Repository(_) | Self::Notify(_) => ErrorClass::Transient,
            Self::Contract(_) | Self::UnexpectedEvent { .. } => ErrorClass::Permanent,
        }
    }
}
