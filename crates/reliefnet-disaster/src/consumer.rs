//! Consumer for the explicit delete command.

use std::sync::Arc;

use async_trait::async_trait;

use reliefnet_core::contract::SagaEvent;
use reliefnet_messaging::MessageHandler;

use crate::error::DisasterError;
use crate::repository::DisasterRepository;

/// Handles `disaster.cmd.delete`: hard-deletes the named record. Consumers
/// elsewhere publish this command when a permanent decode failure leaves a
/// disaster unservable.
pub struct DeleteCommandHandler {
    repo: Arc<dyn DisasterRepository>,
}

impl DeleteCommandHandler {
    /// Creates the handler over the injected repository.
    #[must_use]
    pub fn new(repo: Arc<dyn DisasterRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl MessageHandler for DeleteCommandHandler {
    type Error = DisasterError;

    async fn handle(&self, event_type: &str, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        match SagaEvent::decode(event_type, value)? {
            SagaEvent::DeleteDisaster(payload) => {
                // The typed payload is the source of truth; a disagreeing
                // key signals a producer bug worth surfacing.
                if key != payload.disaster_id.to_string() {
                    tracing::warn!(
                        key,
                        disaster_id = %payload.disaster_id,
                        "delete command key disagrees with payload"
                    );
                }
                self.repo.delete(payload.disaster_id).await?;
                tracing::info!(disaster_id = %payload.disaster_id, "disaster deleted by command");
                Ok(())
            }
            other => Err(DisasterError::UnexpectedEvent {
                topic: other.topic().to_owned(),
            }),
        }
    }
}
