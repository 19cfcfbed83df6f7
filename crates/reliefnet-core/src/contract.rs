//! Wire contracts for the relief saga.
//!
//! Three topics connect the services. Every payload is JSON and every
//! message is keyed by the disaster id, so all events for one disaster land
//! on the same partition in order.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::geo::Coordinates;
use crate::retry::{ClassifyError, ErrorClass};

/// Command topic: find relief resources near a newly reported disaster.
pub const RESOURCE_CMD_FIND: &str = "resource.cmd.find";

/// Command topic: hard-delete a disaster record.
pub const DISASTER_CMD_DELETE: &str = "disaster.cmd.delete";

/// Notification topic: ask admins to review a disaster.
pub const USER_NOTIFY_ADMIN_REVIEW: &str = "user.notify.admin_review";

/// Payload of [`RESOURCE_CMD_FIND`], re-published byte-for-byte on
/// [`USER_NOTIFY_ADMIN_REVIEW`] once resources are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceFindPayload {
    /// The disaster awaiting resource discovery and admin review.
    pub disaster_id: Uuid,
    /// Where the disaster was reported.
    pub location: Coordinates,
    /// Radius around `location` to search for amenities, in meters.
    pub search_radius_meters: u32,
    /// The user who reported the disaster.
    pub contributor_id: Uuid,
}

/// Payload of [`DISASTER_CMD_DELETE`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisasterDeletePayload {
    /// The disaster to hard-delete.
    pub disaster_id: Uuid,
}

/// A saga event decoded from a topic/payload pair.
///
/// Consumers dispatch on this sum type with a single `match`; a topic
/// outside the contract or a payload that does not parse is a permanent
/// failure, since redelivery cannot fix either.
#[derive(Debug, Clone, PartialEq)]
pub enum SagaEvent {
    /// Find relief resources near a newly reported disaster.
    FindResources(ResourceFindPayload),
    /// Ask admins to review a disaster whose resources were found.
    NotifyAdminReview(ResourceFindPayload),
    /// Hard-delete a disaster record.
    DeleteDisaster(DisasterDeletePayload),
}

impl SagaEvent {
    /// Decodes the payload received on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::UnknownTopic`] for topics outside the saga
    /// and [`ContractError::Malformed`] when the payload does not parse.
    pub fn decode(topic: &str, value: &[u8]) -> Result<Self, ContractError> {
        match topic {
            RESOURCE_CMD_FIND => Ok(Self::FindResources(parse(topic, value)?)),
            USER_NOTIFY_ADMIN_REVIEW => Ok(Self::NotifyAdminReview(parse(topic, value)?)),
            DISASTER_CMD_DELETE => Ok(Self::DeleteDisaster(parse(topic, value)?)),
            other => Err(ContractError::UnknownTopic {
                topic: other.to_owned(),
            }),
        }
    }

    /// Returns the topic this event travels on.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::FindResources(_) => RESOURCE_CMD_FIND,
            Self::NotifyAdminReview(_) => USER_NOTIFY_ADMIN_REVIEW,
            Self::DeleteDisaster(_) => DISASTER_CMD_DELETE,
        }
    }
}

fn parse<T: DeserializeOwned>(topic: &str, value: &[u8]) -> Result<T, ContractError> {
    serde_json::from_slice(value).map_err(|source| ContractError::Malformed {
        topic: topic.to_owned(),
        source,
    })
}

/// Decode failures for saga events.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The topic is not part of the saga contract.
    #[error("unknown event topic: {topic}")]
    UnknownTopic {
        /// The offending topic name.
        topic: String,
    },

    /// The payload bytes do not parse as the topic's payload type.
    #[error("malformed payload on {topic}")]
    Malformed {
        /// The topic the payload arrived on.
        topic: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },
}

impl ClassifyError for ContractError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Permanent
    }
}
