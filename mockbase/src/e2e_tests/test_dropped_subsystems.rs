//! Dropping a subsystem abandons everything still queued on it.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use super::helpers::{Harness, settled};
use crate::auth::UserProperties;
use crate::error::MockError;
use crate::facade::MockService;
use crate::messaging::{Message, MulticastMessage};

#[test]
fn test_dropping_every_subsystem_abandons_queued_calls() {
    let Harness {
        timer: _timer,
        auth,
        messaging,
        users,
    } = Harness::new();

    let created = auth.create_user(UserProperties::default().uid("ann")).expect("valid");
    let sent = messaging.send(&Message::for_topic("news"), false).expect("valid");
    let batch = messaging
        .send_multicast(&MulticastMessage::new(["t1", "t2"]), false)
        .expect("valid");
    let written = users.set("ann", json!({"age": 30})).expect("valid");
    let listed = users.get();

    drop(auth);
    drop(messaging);
    drop(users);

    let errors = [
        settled(created).map(|_| ()).expect_err("abandoned"),
        settled(sent).map(|_| ()).expect_err("abandoned"),
        settled(batch).map(|_| ()).expect_err("abandoned"),
        settled(written).expect_err("abandoned"),
        settled(listed).map(|_| ()).expect_err("abandoned"),
    ];
    let codes = errors.each_ref().map(MockError::code);
    assert!(codes.iter().all(|code| *code == MockError::ABANDONED), "{codes:?}");
}

#[test]
fn test_signed_in_user_does_not_keep_auth_alive() {
    let Harness { auth, .. } = Harness::new();
    auth.auto_flush(true);
    let user = settled(auth.create_user(UserProperties::default().uid("ann")).expect("valid"))
        .expect("created");
    settled(auth.change_auth_state(&user)).expect("signed in");
    assert_eq!(auth.current_user().map(|u| u.uid()), Some("ann".to_string()));

    auth.auto_flush(false);
    let queued = user.reload();
    drop(auth);
    assert_eq!(
        settled(queued).expect_err("abandoned").code(),
        MockError::ABANDONED
    );
}

#[test]
fn test_snapshot_observer_never_fires_after_drop() {
    let harness = Harness::new();
    let seen = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&seen);
    harness.users.on_snapshot(move |_| *sink.borrow_mut() += 1);
    let written = harness.users.set("ann", json!({})).expect("valid");

    drop(harness);
    assert_eq!(
        settled(written).expect_err("abandoned").code(),
        MockError::ABANDONED
    );
    assert_eq!(*seen.borrow(), 0);
}
