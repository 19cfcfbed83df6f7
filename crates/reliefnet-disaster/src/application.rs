//! Application handlers for the disaster context.
//!
//! `handle_report_disaster` is saga step A: persist the record, then make
//! the find-resources command durable, compensating with a hard delete when
//! publishing cannot succeed. Once the publish is acknowledged, the record
//! and the in-flight event are decoupled; downstream recovery belongs to
//! the retry/DLQ machinery, not the reporter.

use std::env;

use uuid::Uuid;

use reliefnet_core::clock::Clock;
use reliefnet_core::contract::{
    DISASTER_CMD_DELETE, DisasterDeletePayload, RESOURCE_CMD_FIND, ResourceFindPayload,
};
use reliefnet_messaging::MessageBus;

use crate::domain::{Disaster, DisasterStatus, ReportDisaster, ReviewDisaster};
use crate::error::DisasterError;
use crate::repository::DisasterRepository;

/// Report-time settings.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Radius around the disaster to search for relief resources, in
    /// meters. Stamped into the find command; the record itself carries no
    /// radius.
    pub search_radius_meters: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            search_radius_meters: 5000,
        }
    }
}

impl ReportConfig {
    /// Reads `SEARCH_RADIUS_METERS` from the environment, defaulting to
    /// 5000.
    #[must_use]
    pub fn from_env() -> Self {
        let search_radius_meters = env::var("SEARCH_RADIUS_METERS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(5000);
        Self {
            search_radius_meters,
        }
    }
}

/// What the RPC caller gets back from a successful report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisasterReceipt {
    /// Id of the new record.
    pub id: Uuid,
    /// Always [`DisasterStatus::Pending`]; review happens later.
    pub status: DisasterStatus,
}

/// Handles the `ReportDisaster` RPC: persists the record as pending and
/// publishes the find-resources command keyed by the new id.
///
/// A persistence failure fails the call outright, nothing to undo. A
/// serialization or publish failure after the record exists triggers
/// exactly one compensating delete; if that delete itself fails the orphan
/// is logged as an operator-visible condition and the original error is
/// still returned.
///
/// # Errors
///
/// Returns [`DisasterError::Validation`] for a blank title,
/// [`DisasterError::Repository`] when the record cannot be stored, and
/// [`DisasterError::Serialize`] or [`DisasterError::Publish`] when the find
/// command cannot be made durable (after compensating).
#[tracing::instrument(skip_all, fields(contributor_id = %command.contributor_id))]
pub async fn handle_report_disaster(
    command: &ReportDisaster,
    clock: &dyn Clock,
    repo: &dyn DisasterRepository,
    bus: &MessageBus,
    config: &ReportConfig,
) -> Result<DisasterReceipt, DisasterError> {
    if command.title.trim().is_empty() {
        return Err(DisasterError::Validation("title is required".into()));
    }

    let now = clock.now();
    let disaster = Disaster {
        id: Uuid::new_v4(),
        title: command.title.clone(),
        description: command.description.clone(),
        tags: command.tags.clone(),
        contributor_id: command.contributor_id,
        location: command.location,
        image_urls: command.image_urls.clone(),
        status: DisasterStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    repo.create(&disaster).await?;
    tracing::info!(disaster_id = %disaster.id, "disaster recorded as pending");

    let payload = ResourceFindPayload {
        disaster_id: disaster.id,
        location: disaster.location,
        search_radius_meters: config.search_radius_meters,
        contributor_id: disaster.contributor_id,
    };
    let value = match serde_json::to_vec(&payload) {
        Ok(value) => value,
        Err(err) => {
            compensate_delete(repo, disaster.id).await;
            return Err(DisasterError::Serialize(err));
        }
    };

    if let Err(err) = bus
        .publish(RESOURCE_CMD_FIND, &disaster.id.to_string(), value)
        .await
    {
        compensate_delete(repo, disaster.id).await;
        return Err(DisasterError::Publish(err));
    }

    Ok(DisasterReceipt {
        id: disaster.id,
        status: DisasterStatus::Pending,
    })
}

/// Undoes a create whose follow-up event never became durable. Best-effort:
/// a failure leaves an orphaned pending record behind and is logged for
/// operators, since retrying the cleanup risks compounding the failure.
async fn compensate_delete(repo: &dyn DisasterRepository, disaster_id: Uuid) {
    match repo.delete(disaster_id).await {
        Ok(()) => {
            tracing::warn!(%disaster_id, "compensated: deleted disaster after failed publish");
        }
        Err(err) => {
            tracing::error!(
                %disaster_id,
                error = %err,
                "COMPENSATION FAILED: orphaned pending disaster left behind"
            );
        }
    }
}

/// Handles the human review RPC: moves a pending disaster to the verdict's
/// status. Reviewed records cannot be reviewed again.
///
/// # Errors
///
/// Returns [`DisasterError::NotFound`] for an unknown id,
/// [`DisasterError::Validation`] for an illegal transition, and
/// [`DisasterError::Repository`] when the store fails.
#[tracing::instrument(skip_all, fields(disaster_id = %command.disaster_id))]
pub async fn handle_review_disaster(
    command: &ReviewDisaster,
    clock: &dyn Clock,
    repo: &dyn DisasterRepository,
) -> Result<DisasterStatus, DisasterError> {
    let disaster = repo
        .get(command.disaster_id)
        .await?
        .ok_or(DisasterError::NotFound(command.disaster_id))?;

    let next = command.verdict.status();
    if !disaster.status.can_transition_to(next) {
        return Err(DisasterError::Validation(format!(
            "cannot move disaster from {} to {next}",
            disaster.status
        )));
    }

    repo.update_status(command.disaster_id, next, clock.now())
        .await?;
    tracing::info!(status = %next, "disaster reviewed");
    Ok(next)
}

/// Publishes the explicit delete command for a disaster, keyed by its id
/// like every other saga event.
///
/// # Errors
///
/// Returns [`DisasterError::Serialize`] or [`DisasterError::Publish`] when
/// the command cannot be made durable.
pub async fn request_deletion(bus: &MessageBus, disaster_id: Uuid) -> Result<(), DisasterError> {
    let payload = DisasterDeletePayload { disaster_id };
    let value = serde_json::to_vec(&payload).map_err(DisasterError::Serialize)?;
    bus.publish(DISASTER_CMD_DELETE, &disaster_id.to_string(), value)
        .await
        .map_err(DisasterError::Publish)?;
    Ok(())
}
