//! Disaster context errors.

use thiserror::Error;
use uuid::Uuid;

use reliefnet_core::contract::ContractError;
use reliefnet_core::retry::{ClassifyError, ErrorClass};
use reliefnet_messaging::BusError;

/// Failures in the disaster context.
#[derive(Debug, Error)]
pub enum DisasterError {
    /// No disaster record with this id.
    #[error("disaster not found: {0}")]
    NotFound(Uuid),

    /// The command is invalid as stated.
    #[error("validation error: {0}")]
    Validation(String),

    /// The persistence collaborator failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// The event payload could not be serialized.
    #[error("failed to serialize event payload")]
    Serialize(#[source] serde_json::Error),

    /// The saga event could not be published.
    #[error("failed to publish saga event")]
    Publish(#[source] BusError),

    /// The consumed payload is outside the saga contract.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// A saga event arrived on a topic this context does not handle.
    #[error("unexpected event for disaster context: {topic}")]
    UnexpectedEvent {
        /// The topic the event arrived on.
        topic: String,
    },
}

impl ClassifyError for DisasterError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Repository(_) => ErrorClass::Transient,
            Self::Publish(BusError::Rejected { .. }) => ErrorClass::Permanent,
            Self::Publish(_) => ErrorClass::Transient,
            Self::NotFound(_)
            | Self::Validation(_)
            | Self::Serialize(_)
            | Self::Contract(_)
            | Self::UnexpectedEvent { .. } => ErrorClass::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_failures_are_transient() {
        let err = DisasterError::Repository("connection refused".into());
        assert_eq!(err.class(), ErrorClass::Transient);
    }

    #[test]
    fn test_contract_and_validation_failures_are_permanent() {
        assert_eq!(
            DisasterError::Validation("title is required".into()).class(),
            ErrorClass::Permanent
        );
        assert_eq!(
            DisasterError::UnexpectedEvent {
                topic: "resource.cmd.find".into()
            }
            .class(),
            ErrorClass::Permanent
        );
    }
}
