//! Disaster domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reliefnet_core::geo::Coordinates;

/// Review state of a disaster record.
///
/// Created as `Pending`; only a human review moves it to `Approved` or
/// `Rejected`, and reviewed records never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisasterStatus {
    /// Awaiting admin review.
    Pending,
    /// Confirmed by an admin.
    Approved,
    /// Dismissed by an admin.
    Rejected,
}

impl DisasterStatus {
    /// True when a record in this status may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
        )
    }
}

impl std::fmt::Display for DisasterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// A reported disaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disaster {
    /// Record id; also the partition key of every saga event for it.
    pub id: Uuid,
    /// Short headline.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Classification tags (flood, earthquake, ...).
    pub tags: Vec<String>,
    /// The user who reported it.
    pub contributor_id: Uuid,
    /// Where it was reported.
    pub location: Coordinates,
    /// Supporting imagery.
    pub image_urls: Vec<String>,
    /// Review state.
    pub status: DisasterStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

/// Command: report a new disaster.
#[derive(Debug, Clone)]
pub struct ReportDisaster {
    /// Short headline; must not be blank.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Classification tags.
    pub tags: Vec<String>,
    /// Where the disaster is.
    pub location: Coordinates,
    /// The reporting user.
    pub contributor_id: Uuid,
    /// Supporting imagery.
    pub image_urls: Vec<String>,
}

/// Command: record a human review verdict for a pending disaster.
#[derive(Debug, Clone, Copy)]
pub struct ReviewDisaster {
    /// The record under review.
    pub disaster_id: Uuid,
    /// The verdict.
    pub verdict: ReviewVerdict,
}

/// Outcome of an admin review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// Confirm the report.
    Approve,
    /// Dismiss the report.
    Reject,
}

impl ReviewVerdict {
    /// The status this verdict moves the record to.
    #[must_use]
    pub fn status(self) -> DisasterStatus {
        match self {
            Self::Approve => DisasterStatus::Approved,
            Self::Reject => DisasterStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_may_move_to_either_verdict() {
        assert!(DisasterStatus::Pending.can_transition_to(DisasterStatus::Approved));
        assert!(DisasterStatus::Pending.can_transition_to(DisasterStatus::Rejected));
    }

    #[test]
    fn test_reviewed_records_never_change_again() {
        for reviewed in [DisasterStatus::Approved, DisasterStatus::Rejected] {
            assert!(!reviewed.can_transition_to(DisasterStatus::Pending));
            assert!(!reviewed.can_transition_to(DisasterStatus::Approved));
            assert!(!reviewed.can_transition_to(DisasterStatus::Rejected));
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(DisasterStatus::Pending).unwrap();
        assert_eq!(json, "pending");
    }
}
