//! A panicking action or listener does not stop the flush.

use std::cell::RefCell;
use std::rc::Rc;

use super::helpers::{Harness, settled};
use crate::error::MockError;
use crate::facade::MockService;
use crate::future::pending;
use crate::messaging::Message;
use crate::scheduler::Operation;

#[test]
fn test_panicking_action_abandons_only_its_future() {
    let harness = Harness::new();
    let scheduler = harness.messaging.facade().scheduler().clone();

    let (settle, doomed) = pending::<()>("explode");
    scheduler.enqueue(Operation::new("explode", Vec::new(), move || {
        let _settle = settle;
        panic!("action failed");
    }));
    let survivor = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");

    harness.messaging.flush();
    assert_eq!(
        settled(doomed).expect_err("never settled").code(),
        MockError::ABANDONED
    );
    assert!(settled(survivor).is_ok());
}

#[test]
fn test_panicking_listener_does_not_block_others() {
    let harness = Harness::new();
    let calls = Rc::new(RefCell::new(0));
    harness.messaging.on("send", |_| panic!("listener failed"));
    let sink = Rc::clone(&calls);
    harness.messaging.on("send", move |_| *sink.borrow_mut() += 1);

    let first = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    let second = harness.messaging.send(&Message::for_topic("b"), false).expect("valid");
    harness.messaging.flush();

    assert!(settled(first).is_ok());
    assert!(settled(second).is_ok());
    assert_eq!(*calls.borrow(), 2);
}
