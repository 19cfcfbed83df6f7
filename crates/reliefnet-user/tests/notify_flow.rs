//! Saga step C: the admin-notify handler and fan-out accounting.

use std::sync::Arc;

use uuid::Uuid;

use reliefnet_core::contract::{RESOURCE_CMD_FIND, ResourceFindPayload, USER_NOTIFY_ADMIN_REVIEW};
use reliefnet_core::geo::Coordinates;
use reliefnet_messaging::MessageHandler;
use reliefnet_user::{
    AdminNotifyHandler, NotifierConfig, NotifyError, UserError, notify_many,
};
use reliefnet_test_support::{InMemoryUserRepository, RecordingMailer, admin, contributor, init_test_tracing};

fn notify_payload() -> (ResourceFindPayload, Vec<u8>) {
    let payload = ResourceFindPayload {
        disaster_id: Uuid::new_v4(),
        location: Coordinates::new(50.08, 14.43),
        search_radius_meters: 5000,
        contributor_id: Uuid::new_v4(),
    };
    let value = serde_json::to_vec(&payload).unwrap();
    (payload, value)
}

fn handler_over(
    users: Vec<reliefnet_user::User>,
    mailer: &Arc<RecordingMailer>,
) -> AdminNotifyHandler {
    AdminNotifyHandler::new(
        Arc::new(InMemoryUserRepository::new(users)),
        Arc::clone(mailer) as Arc<dyn reliefnet_user::Mailer>,
        NotifierConfig::default(),
    )
}

#[tokio::test]
async fn test_notifies_every_admin_with_the_review_link() {
    init_test_tracing();
    let mailer = Arc::new(RecordingMailer::new());
    let handler = handler_over(
        vec![admin("ada"), admin("grace"), contributor("linus")],
        &mailer,
    );
    let (payload, value) = notify_payload();

    handler
        .handle(USER_NOTIFY_ADMIN_REVIEW, &payload.disaster_id.to_string(), &value)
        .await
        .unwrap();

    let sends = mailer.sends();
    assert_eq!(sends.len(), 2, "contributors are not notified");
    for (_, data) in &sends {
        assert_eq!(data.disaster_id, payload.disaster_id);
        assert_eq!(data.contributor_id, payload.contributor_id);
        assert_eq!(
            data.review_url,
            format!("http://localhost:3000/admin/review/{}", payload.disaster_id)
        );
    }
}

#[tokio::test]
async fn test_no_admins_succeeds_without_sending() {
    init_test_tracing();
    let mailer = Arc::new(RecordingMailer::new());
    let handler = handler_over(vec![contributor("linus")], &mailer);
    let (payload, value) = notify_payload();

    handler
        .handle(USER_NOTIFY_ADMIN_REVIEW, &payload.disaster_id.to_string(), &value)
        .await
        .unwrap();

    assert!(mailer.sends().is_empty());
}

// One admin's mail fails all three of its own retries; the other two go
// through and the aggregate error accounts for exactly that split.
#[tokio::test(start_paused = true)]
async fn test_partial_failure_is_aggregated_per_recipient() {
    init_test_tracing();
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_for("grace@relief.test");
    let handler = handler_over(vec![admin("ada"), admin("grace"), admin("enzo")], &mailer);
    let (payload, value) = notify_payload();

    let result = handler
        .handle(USER_NOTIFY_ADMIN_REVIEW, &payload.disaster_id.to_string(), &value)
        .await;

    let err = result.unwrap_err();
    let UserError::Notify(NotifyError::Partial {
        total,
        succeeded,
        failed,
        ref failed_recipients,
    }) = err
    else {
        panic!("expected partial notify failure, got {err:?}");
    };
    assert_eq!(total, 3);
    assert_eq!(succeeded, 2);
    assert_eq!(failed, 1);
    assert_eq!(failed_recipients, &vec!["grace@relief.test".to_owned()]);

    let text = err.to_string();
    assert!(text.contains("1 of 3 notifications failed"), "got: {text}");
    assert!(text.contains("2 succeeded"), "got: {text}");
    assert!(text.contains("grace@relief.test"), "got: {text}");

    assert_eq!(mailer.attempts_for("grace@relief.test"), 3, "own retry budget");
    assert_eq!(mailer.attempts_for("ada@relief.test"), 1);
    assert_eq!(mailer.attempts_for("enzo@relief.test"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_send_failing_counts_them_all() {
    init_test_tracing();
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_for("ada@relief.test");
    mailer.fail_for("grace@relief.test");
    let (payload, _) = notify_payload();
    let email = reliefnet_user::AdminReviewEmail {
        disaster_id: payload.disaster_id,
        contributor_id: payload.contributor_id,
        review_url: NotifierConfig::default().review_url(payload.disaster_id),
    };

    let result = notify_many(
        Arc::clone(&mailer) as Arc<dyn reliefnet_user::Mailer>,
        vec![admin("ada"), admin("grace")],
        email,
        true,
    )
    .await;

    let NotifyError::Partial {
        total,
        succeeded,
        failed,
        ..
    } = result.unwrap_err();
    assert_eq!((total, succeeded, failed), (2, 0, 2));
}

#[tokio::test]
async fn test_unexpected_topic_is_permanent() {
    init_test_tracing();
    let mailer = Arc::new(RecordingMailer::new());
    let handler = handler_over(vec![admin("ada")], &mailer);
    let (payload, value) = notify_payload();

    let result = handler
        .handle(RESOURCE_CMD_FIND, &payload.disaster_id.to_string(), &value)
        .await;

    assert!(matches!(
        result.unwrap_err(),
        UserError::UnexpectedEvent { .. }
    ));
    assert!(mailer.sends().is_empty());
}

// Moved from `src/notify.rs` unit tests: the dev-dependency cycle with
// reliefnet-test-support gives the `cfg(test)` lib build its own copy of
// this crate's types, so these must link the lib the way test-support does.

fn review_email() -> reliefnet_user::AdminReviewEmail {
    let disaster_id = Uuid::new_v4();
    reliefnet_user::AdminReviewEmail {
        disaster_id,
        contributor_id: Uuid::new_v4(),
        review_url: format!("http://localhost:3000/admin/review/{disaster_id}"),
    }
}

#[tokio::test]
async fn test_empty_recipient_list_succeeds_trivially() {
    let mailer = Arc::new(RecordingMailer::new());

    let result = notify_many(mailer.clone(), Vec::new(), review_email(), true).await;

    assert!(result.is_ok());
    assert!(mailer.sends().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_never_exceeds_the_send_cap() {
    let mailer = Arc::new(RecordingMailer::new());
    let recipients: Vec<reliefnet_user::User> =
        (0..20).map(|n| admin(&format!("admin-{n}"))).collect();

    notify_many(mailer.clone(), recipients, review_email(), true)
        .await
        .unwrap();

    assert_eq!(mailer.sends().len(), 20);
    assert!(mailer.max_in_flight() <= reliefnet_user::notify::MAX_CONCURRENT_SENDS);
}
