//! Immediate, delayed and automatic flushing.

use std::cell::RefCell;
use std::rc::Rc;

use super::helpers::{Harness, settled, still_pending};
use crate::config::MockConfig;
use crate::facade::MockService;
use crate::messaging::Message;
use crate::scheduler::{AutoFlush, Operation};

#[test]
fn test_flush_on_empty_queue_is_a_no_op() {
    let harness = Harness::new();
    harness.messaging.flush().flush();
    assert_eq!(harness.messaging.facade().scheduler().flush(None), 0);
    assert_eq!(harness.timer.pending(), 0);
}

#[test]
fn test_delayed_flush_runs_on_the_timer() {
    let harness = Harness::new();
    let future = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    harness.messaging.flush_after(250);
    assert_eq!(harness.messaging.facade().scheduler().pending_drains(), 1);

    harness.timer.advance(249);
    let future = still_pending(future);
    harness.timer.advance(1);
    assert!(settled(future).is_ok());
    assert_eq!(harness.messaging.facade().scheduler().pending_drains(), 0);
}

#[test]
fn test_delayed_drain_picks_up_later_calls() {
    let harness = Harness::new();
    harness.messaging.flush_after(100);
    let queued_later = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    harness.timer.advance(100);
    assert!(settled(queued_later).is_ok());
}

#[test]
fn test_auto_flush_settles_every_call() {
    let harness = Harness::new();
    harness.messaging.auto_flush(true);
    let first = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    let second = harness.messaging.send(&Message::for_topic("b"), false).expect("valid");
    assert!(settled(first).is_ok());
    assert!(settled(second).is_ok());

    harness.messaging.auto_flush(false);
    let manual = harness.messaging.send(&Message::for_topic("c"), false).expect("valid");
    let manual = still_pending(manual);
    harness.messaging.flush();
    assert!(settled(manual).is_ok());
}

#[test]
fn test_delayed_auto_flush_from_config() {
    let config = MockConfig {
        auto_flush: AutoFlush::Delayed(30),
        ..MockConfig::default()
    };
    let harness = Harness::with_config(&config);
    let future = harness.messaging.send(&Message::for_topic("a"), false).expect("valid");
    let future = still_pending(future);
    harness.timer.advance(30);
    assert!(settled(future).is_ok());
}

#[test]
fn test_flush_from_inside_an_action_runs_after_the_pass() {
    let harness = Harness::new();
    let scheduler = harness.messaging.facade().scheduler().clone();
    let log = Rc::new(RefCell::new(Vec::new()));

    let inner_scheduler = scheduler.clone();
    let inner_log = Rc::clone(&log);
    scheduler.enqueue(Operation::new("outer", Vec::new(), move || {
        inner_log.borrow_mut().push("outer start");
        let nested_log = Rc::clone(&inner_log);
        inner_scheduler.enqueue(Operation::new("nested", Vec::new(), move || {
            nested_log.borrow_mut().push("nested");
        }));
        assert_eq!(inner_scheduler.flush(None), 0);
        inner_log.borrow_mut().push("outer end");
    }));
    let tail_log = Rc::clone(&log);
    scheduler.enqueue(Operation::new("tail", Vec::new(), move || {
        tail_log.borrow_mut().push("tail");
    }));

    assert_eq!(scheduler.flush(None), 3);
    assert_eq!(
        *log.borrow(),
        vec!["outer start", "outer end", "tail", "nested"]
    );
    assert!(scheduler.is_empty());
}
