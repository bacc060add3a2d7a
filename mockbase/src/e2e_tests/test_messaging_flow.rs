//! Messaging calls from validation through settlement.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use super::helpers::{Harness, settled, still_pending};
use crate::error::MockError;
use crate::facade::MockService;
use crate::messaging::{Message, MulticastMessage};

#[test]
fn test_send_all_two_messages() {
    let harness = Harness::new();
    let messages = [
        Message::for_token("device-1").notification("Hi", "One"),
        Message::for_topic("news").data("story", "42"),
    ];

    let batch = still_pending(harness.messaging.send_all(&messages, false).expect("valid"));
    harness.messaging.flush();
    let batch = settled(batch).expect("default batch");

    assert_eq!(batch.success_count, 2);
    assert_eq!(batch.failure_count, 0);
    assert_eq!(batch.responses.len(), 2);
    assert!(batch.responses.iter().all(|response| response.success));
    assert!(
        batch
            .responses
            .iter()
            .all(|response| response.message_id.as_deref().is_some_and(|id| !id.is_empty()))
    );
}

#[test]
fn test_operations_settle_in_call_order() {
    let harness = Harness::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for name in ["send", "sendAll", "sendMulticast"] {
        let sink = Rc::clone(&order);
        harness
            .messaging
            .on(name, move |_| sink.borrow_mut().push(name));
    }

    let single = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    let multicast = harness
        .messaging
        .send_multicast(&MulticastMessage::new(["t1", "t2", "t3"]), false)
        .expect("valid");
    let batch = harness
        .messaging
        .send_all(&[Message::for_topic("b")], true)
        .expect("valid");
    let again = harness.messaging.send(&Message::for_topic("c"), false).expect("valid");
    assert!(order.borrow().is_empty());

    harness.messaging.flush();
    assert_eq!(
        *order.borrow(),
        vec!["send", "sendMulticast", "sendAll", "send"]
    );
    assert!(settled(single).is_ok());
    assert_eq!(settled(multicast).expect("resolved").success_count, 3);
    assert_eq!(settled(batch).expect("resolved").responses.len(), 1);
    assert!(settled(again).is_ok());
}

#[test]
fn test_invalid_calls_never_reach_the_queue() {
    let harness = Harness::new();
    let listener_calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&listener_calls);
    harness.messaging.on("send", move |_| *sink.borrow_mut() += 1);

    let both = Message {
        topic: Some("news".to_string()),
        token: Some("device".to_string()),
        ..Message::default()
    };
    let error = harness.messaging.send(&both, false).expect_err("two targets");
    assert_eq!(error.code(), MockError::INVALID_ARGUMENT);
    assert!(
        harness
            .messaging
            .send_multicast(&MulticastMessage::default(), false)
            .is_err()
    );

    harness.messaging.flush();
    assert_eq!(*listener_calls.borrow(), 0);
}

#[test]
fn test_listener_sees_payload_and_dry_run() {
    let harness = Harness::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    harness
        .messaging
        .on("sendMulticast", move |args| sink.borrow_mut().push(args.to_vec()));

    let _batch = harness
        .messaging
        .send_multicast(&MulticastMessage::new(["t1"]), true)
        .expect("valid");
    harness.messaging.flush();

    assert_eq!(
        *seen.borrow(),
        vec![vec![json!({"tokens": ["t1"]}), json!(true)]]
    );
}
