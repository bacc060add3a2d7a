//! One-shot overrides across subsystems.

use serde_json::json;

use super::helpers::{Harness, settled};
use crate::auth::UserProperties;
use crate::error::{InjectedFailure, MockError};
use crate::facade::MockService;
use crate::messaging::{BatchResponse, Message, SendResponse};

#[test]
fn test_fail_next_applies_exactly_once() {
    let harness = Harness::new();
    harness
        .messaging
        .fail_next("send", InjectedFailure::new("messaging/unavailable", "down"));

    let first = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    let second = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    harness.messaging.flush();

    let error = settled(first).expect_err("injected failure");
    assert_eq!(error.code(), "messaging/unavailable");
    assert!(settled(second).is_ok());
}

#[test]
fn test_latest_override_wins() {
    let harness = Harness::new();
    harness
        .messaging
        .fail_next("send", MockError::injected("messaging/internal-error", "x"));
    harness
        .messaging
        .next_result("send", "projects/p/messages/1")
        .expect("serializes");

    let future = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    harness.messaging.flush();
    assert_eq!(settled(future), Ok("projects/p/messages/1".to_string()));
}

#[test]
fn test_overrides_are_per_operation_and_per_subsystem() {
    let harness = Harness::new();
    let canned = BatchResponse::from_responses(vec![
        SendResponse::delivered("m1".to_string()),
        SendResponse::failed("messaging/invalid-argument".to_string()),
    ]);
    harness
        .messaging
        .respond_next("sendAll", &canned)
        .expect("serializes");
    harness
        .users
        .fail_next("send", MockError::injected("unrelated", "not messaging"));

    let single = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    let batch = harness
        .messaging
        .send_all(&[Message::for_topic("a"), Message::for_topic("b")], false)
        .expect("valid");
    harness.messaging.flush();

    assert!(settled(single).is_ok());
    let batch = settled(batch).expect("canned batch");
    assert_eq!(batch, canned);
    assert_eq!(batch.failure_count, 1);
}

#[test]
fn test_override_is_consumed_at_call_time() {
    let harness = Harness::new();
    let before = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    harness
        .messaging
        .fail_next("send", MockError::injected("late", "registered after the call"));
    let after = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    harness.messaging.flush();

    assert!(settled(before).is_ok());
    assert_eq!(settled(after).expect_err("injected").code(), "late");
}

#[test]
fn test_injected_user_result() {
    let harness = Harness::new();
    let template = crate::auth::MockUser::new(
        &harness.auth,
        UserProperties::default().uid("canned").email("canned@example.com"),
    )
    .expect("valid user");
    harness
        .auth
        .next_result("getUser", template.to_record())
        .expect("serializes");

    let found = harness.auth.get_user("whoever").expect("valid uid");
    let missing = harness.auth.get_user("whoever").expect("valid uid");
    harness.auth.flush();

    assert_eq!(settled(found).expect("injected user").uid(), "canned");
    assert_eq!(
        settled(missing).expect_err("nobody stored").code(),
        crate::auth::USER_NOT_FOUND
    );
}

#[test]
fn test_injected_value_of_wrong_shape() {
    let harness = Harness::new();
    harness
        .auth
        .next_result("getUser", json!({"not": "a user"}))
        .expect("serializes");
    let future = harness.auth.get_user("a").expect("valid uid");
    harness.auth.flush();
    assert_eq!(
        settled(future).expect_err("wrong shape").code(),
        MockError::RESULT_MISMATCH
    );
}
