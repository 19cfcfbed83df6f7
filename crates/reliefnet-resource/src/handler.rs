//! Find-resources event handler (saga step B).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use reliefnet_core::contract::{SagaEvent, USER_NOTIFY_ADMIN_REVIEW};
use reliefnet_core::retry::{RetryError, run_with_backoff};
use reliefnet_messaging::bus::bus_retry_policy;
use reliefnet_messaging::{MessageBus, MessageHandler};

use crate::directory::ResourceDirectory;
use crate::error::ResourceError;
use crate::store::ResourceStore;

/// Consumes `resource.cmd.find`: looks up amenities around the disaster
/// (itself retried against transient upstream failures), upserts them into
/// the store, and republishes the same payload bytes as the admin-review
/// event, still keyed by the disaster id.
///
/// No compensation here: the disaster record is not mutated in this step,
/// so a failure simply surfaces to the bus's retry/DLQ machinery.
pub struct FindResourcesHandler {
    directory: Arc<dyn ResourceDirectory>,
    store: Arc<dyn ResourceStore>,
    bus: Arc<MessageBus>,
    token: CancellationToken,
}

impl FindResourcesHandler {
    /// Creates the handler; the directory lookup's inner retries stop when
    /// `shutdown` is cancelled.
    #[must_use]
    pub fn new(
        directory: Arc<dyn ResourceDirectory>,
        store: Arc<dyn ResourceStore>,
        bus: Arc<MessageBus>,
        shutdown: &CancellationToken,
    ) -> Self {
        Self {
            directory,
            store,
            bus,
            token: shutdown.child_token(),
        }
    }
}

#[async_trait]
impl MessageHandler for FindResourcesHandler {
    type Error = ResourceError;

    async fn handle(&self, event_type: &str, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        let payload = match SagaEvent::decode(event_type, value)? {
            SagaEvent::FindResources(payload) => payload,
            other => {
                return Err(ResourceError::UnexpectedEvent {
                    topic: other.topic().to_owned(),
                });
            }
        };
        tracing::info!(
            disaster_id = %payload.disaster_id,
            radius = payload.search_radius_meters,
            "finding resources near disaster"
        );

        let lookup = run_with_backoff(&self.token, &bus_retry_policy(), || {
            self.directory
                .find_near(payload.location, payload.search_radius_meters)
        })
        .await;
        let resources = match lookup {
            Ok(resources) => resources,
            Err(RetryError::Cancelled) => return Err(ResourceError::Cancelled),
            Err(RetryError::Permanent { source, .. }) => return Err(source),
            Err(RetryError::Exhausted { attempts, source }) => {
                tracing::warn!(attempts, "directory lookup exhausted its retries");
                return Err(source);
            }
        };

        self.store.upsert_all(&resources).await?;
        tracing::info!(
            disaster_id = %payload.disaster_id,
            count = resources.len(),
            "resources stored"
        );

        // Same bytes, same key: the notify hop reads the identical payload
        // and partition ordering per disaster is preserved.
        self.bus
            .publish(USER_NOTIFY_ADMIN_REVIEW, key, value.to_vec())
            .await
            .map_err(ResourceError::Publish)?;
        Ok(())
    }
}
