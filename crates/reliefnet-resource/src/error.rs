//! Resource context errors.

use thiserror::Error;

use reliefnet_core::contract::ContractError;
use reliefnet_core::retry::{ClassifyError, ErrorClass};
use reliefnet_messaging::BusError;

/// Failures in the resource context.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The amenity directory failed or returned an unusable response.
    #[error("resource directory error: {0}")]
    Directory(String),

    /// The geospatial store failed.
    #[error("resource store error: {0}")]
    Store(String),

    /// The admin-review event could not be published.
    #[error("failed to publish admin-review event")]
    Publish(#[source] BusError),

    /// The consumed payload is outside the saga contract.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// A saga event arrived on a topic this context does not handle.
    #[error("unexpected event for resource context: {topic}")]
    UnexpectedEvent {
        /// The topic the event arrived on.
        topic: String,
    },

    /// The handler was cancelled mid-flight during shutdown.
    #[error("cancelled")]
    Cancelled,
}

impl ClassifyError for ResourceError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Directory(_) | Self::Store(_) | Self::Cancelled => ErrorClass::Transient,
            Self::Publish(BusError::Rejected { .. }) => ErrorClass::Permanent,
            Self::Publish(_) => ErrorClass::Transient,
            Self::Contract(_) | Self::UnexpectedEvent { .. } => ErrorClass::Permanent,
        }
    }
}
