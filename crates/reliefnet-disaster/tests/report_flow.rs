//! Saga step A end to end: report, publish, and compensation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use reliefnet_core::contract::{
    DISASTER_CMD_DELETE, RESOURCE_CMD_FIND, ResourceFindPayload, SagaEvent,
};
use reliefnet_core::geo::Coordinates;
use reliefnet_disaster::{
    DeleteCommandHandler, DisasterError, DisasterStatus, ReportConfig, ReportDisaster,
    ReviewDisaster, ReviewVerdict, handle_report_disaster, handle_review_disaster,
    request_deletion,
};
use reliefnet_messaging::{BusConfig, InMemoryBroker, MessageBus, MessageHandler};
use reliefnet_test_support::{
    FailingBroker, FailingDisasterRepository, FixedClock, InMemoryDisasterRepository,
    init_test_tracing,
};

fn report_command() -> ReportDisaster {
    ReportDisaster {
        title: "River flooding in the old town".to_owned(),
        description: "Water level rising past the embankment".to_owned(),
        tags: vec!["flood".to_owned()],
        location: Coordinates::new(50.08, 14.43),
        contributor_id: Uuid::new_v4(),
        image_urls: vec![],
    }
}

fn bus_over(broker: Arc<dyn reliefnet_messaging::Broker>) -> MessageBus {
    MessageBus::new(broker, BusConfig::new("disaster-service"), &CancellationToken::new())
}

#[tokio::test]
async fn test_report_persists_pending_and_publishes_find_command_keyed_by_id() {
    init_test_tracing();
    let broker = InMemoryBroker::new();
    let bus = bus_over(Arc::new(broker.clone()));
    let repo = InMemoryDisasterRepository::new();
    let clock = FixedClock::default_instant();

    let receipt = handle_report_disaster(
        &report_command(),
        &clock,
        &repo,
        &bus,
        &ReportConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(receipt.status, DisasterStatus::Pending);
    let stored = repo.stored(receipt.id).unwrap();
    assert_eq!(stored.status, DisasterStatus::Pending);
    assert_eq!(stored.created_at, clock.0);

    let records = broker.records(RESOURCE_CMD_FIND);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].envelope.key, receipt.id.to_string());

    let payload: ResourceFindPayload =
        serde_json::from_slice(&records[0].envelope.value).unwrap();
    assert_eq!(payload.disaster_id, receipt.id);
    assert_eq!(payload.search_radius_meters, 5000);
    assert_eq!(payload.contributor_id, stored.contributor_id);
}

// Broker down for every producer retry: the record is compensated away with
// exactly one delete and the caller gets a definitive error.
#[tokio::test(start_paused = true)]
async fn test_publish_failure_compensates_with_exactly_one_delete() {
    init_test_tracing();
    let broker = Arc::new(FailingBroker::new());
    let bus = bus_over(Arc::clone(&broker) as Arc<dyn reliefnet_messaging::Broker>);
    let repo = InMemoryDisasterRepository::new();

    let result = handle_report_disaster(
        &report_command(),
        &FixedClock::default_instant(),
        &repo,
        &bus,
        &ReportConfig::default(),
    )
    .await;

    assert!(matches!(result.unwrap_err(), DisasterError::Publish(_)));
    assert_eq!(broker.send_attempts(), 5);
    assert!(repo.is_empty(), "compensation must remove the record");
    assert_eq!(repo.deleted().len(), 1, "exactly one compensating delete");
}

#[tokio::test]
async fn test_persistence_failure_fails_the_call_without_publishing() {
    init_test_tracing();
    let broker = Arc::new(FailingBroker::new());
    let bus = bus_over(Arc::clone(&broker) as Arc<dyn reliefnet_messaging::Broker>);
    let repo = FailingDisasterRepository;

    let result = handle_report_disaster(
        &report_command(),
        &FixedClock::default_instant(),
        &repo,
        &bus,
        &ReportConfig::default(),
    )
    .await;

    assert!(matches!(result.unwrap_err(), DisasterError::Repository(_)));
    assert_eq!(broker.send_attempts(), 0, "nothing to compensate, nothing published");
}

#[tokio::test]
async fn test_blank_title_is_rejected_before_any_effect() {
    init_test_tracing();
    let broker = InMemoryBroker::new();
    let bus = bus_over(Arc::new(broker.clone()));
    let repo = InMemoryDisasterRepository::new();

    let mut command = report_command();
    command.title = "   ".to_owned();

    let result = handle_report_disaster(
        &command,
        &FixedClock::default_instant(),
        &repo,
        &bus,
        &ReportConfig::default(),
    )
    .await;

    assert!(matches!(result.unwrap_err(), DisasterError::Validation(_)));
    assert!(repo.is_empty());
    assert!(broker.records(RESOURCE_CMD_FIND).is_empty());
}

#[tokio::test]
async fn test_review_moves_pending_to_verdict_exactly_once() {
    init_test_tracing();
    let broker = InMemoryBroker::new();
    let bus = bus_over(Arc::new(broker.clone()));
    let repo = InMemoryDisasterRepository::new();
    let clock = FixedClock::default_instant();

    let receipt = handle_report_disaster(
        &report_command(),
        &clock,
        &repo,
        &bus,
        &ReportConfig::default(),
    )
    .await
    .unwrap();

    let review = ReviewDisaster {
        disaster_id: receipt.id,
        verdict: ReviewVerdict::Approve,
    };
    let status = handle_review_disaster(&review, &clock, &repo).await.unwrap();
    assert_eq!(status, DisasterStatus::Approved);
    assert_eq!(repo.stored(receipt.id).unwrap().status, DisasterStatus::Approved);

    // A second verdict on a reviewed record is illegal.
    let again = ReviewDisaster {
        disaster_id: receipt.id,
        verdict: ReviewVerdict::Reject,
    };
    let result = handle_review_disaster(&again, &clock, &repo).await;
    assert!(matches!(result.unwrap_err(), DisasterError::Validation(_)));
}

#[tokio::test]
async fn test_review_of_unknown_disaster_is_not_found() {
    init_test_tracing();
    let repo = InMemoryDisasterRepository::new();
    let review = ReviewDisaster {
        disaster_id: Uuid::new_v4(),
        verdict: ReviewVerdict::Approve,
    };

    let result = handle_review_disaster(&review, &FixedClock::default_instant(), &repo).await;

    assert!(matches!(result.unwrap_err(), DisasterError::NotFound(_)));
}

#[tokio::test]
async fn test_request_deletion_publishes_the_command_keyed_by_id() {
    init_test_tracing();
    let broker = InMemoryBroker::new();
    let bus = bus_over(Arc::new(broker.clone()));
    let disaster_id = Uuid::new_v4();

    request_deletion(&bus, disaster_id).await.unwrap();

    let records = broker.records(DISASTER_CMD_DELETE);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].envelope.key, disaster_id.to_string());
    let event = SagaEvent::decode(DISASTER_CMD_DELETE, &records[0].envelope.value).unwrap();
    assert!(matches!(
        event,
        SagaEvent::DeleteDisaster(payload) if payload.disaster_id == disaster_id
    ));
}

#[tokio::test]
async fn test_delete_command_handler_removes_the_record() {
    init_test_tracing();
    let repo = Arc::new(InMemoryDisasterRepository::new());
    let handler = DeleteCommandHandler::new(Arc::clone(&repo) as Arc<dyn reliefnet_disaster::DisasterRepository>);
    let disaster_id = Uuid::new_v4();
    let value = serde_json::to_vec(&reliefnet_core::contract::DisasterDeletePayload { disaster_id })
        .unwrap();

    handler
        .handle(DISASTER_CMD_DELETE, &disaster_id.to_string(), &value)
        .await
        .unwrap();

    assert_eq!(repo.deleted(), vec![disaster_id]);
}

#[tokio::test]
async fn test_delete_command_handler_rejects_other_saga_topics() {
    init_test_tracing();
    let repo = Arc::new(InMemoryDisasterRepository::new());
    let handler = DeleteCommandHandler::new(Arc::clone(&repo) as Arc<dyn reliefnet_disaster::DisasterRepository>);
    let payload = ResourceFindPayload {
        disaster_id: Uuid::new_v4(),
        location: Coordinates::new(0.0, 0.0),
        search_radius_meters: 5000,
        contributor_id: Uuid::new_v4(),
    };
    let value = serde_json::to_vec(&payload).unwrap();

    let result = handler
        .handle(RESOURCE_CMD_FIND, &payload.disaster_id.to_string(), &value)
        .await;

    assert!(matches!(
        result.unwrap_err(),
        DisasterError::UnexpectedEvent { .. }
    ));
    assert!(repo.deleted().is_empty());
}
