//! Signing users in and keeping them in step with the store.

use super::helpers::{Harness, settled, still_pending};
use crate::auth::{ProfileUpdate, USER_NOT_FOUND, UserProperties, UserUpdate};
use crate::facade::MockService;

#[test]
fn test_change_auth_state_sets_current_user() {
    let harness = Harness::new();
    let created = harness
        .auth
        .create_user(UserProperties::default().uid("bob").email("bob@example.com"))
        .expect("valid");
    harness.auth.flush();
    let bob = settled(created).expect("created");
    assert!(harness.auth.current_user().is_none());

    let signed_in = still_pending(harness.auth.change_auth_state(&bob));
    assert!(harness.auth.current_user().is_none());
    harness.auth.flush();
    assert!(settled(signed_in).is_ok());
    assert_eq!(harness.auth.current_user(), Some(bob));
}

#[test]
fn test_user_updates_reach_the_store() {
    let harness = Harness::new();
    harness.auth.auto_flush(true);
    let alice = settled(
        harness
            .auth
            .create_user(UserProperties::default().uid("alice").email("a@example.com"))
            .expect("valid"),
    )
    .expect("created");

    assert!(settled(alice.update_email("alice@example.com").expect("valid")).is_ok());
    assert!(
        settled(alice.update_profile(ProfileUpdate {
            display_name: Some("Alice".to_string()),
            photo_url: None,
        }))
        .is_ok()
    );
    assert_eq!(alice.email().as_deref(), Some("alice@example.com"));

    let stored = settled(harness.auth.get_user("alice").expect("valid")).expect("stored");
    assert_eq!(stored.email().as_deref(), Some("alice@example.com"));
    assert_eq!(stored.display_name().as_deref(), Some("Alice"));
}

#[test]
fn test_reload_picks_up_admin_changes() {
    let harness = Harness::new();
    harness.auth.auto_flush(true);
    let alice = settled(
        harness
            .auth
            .create_user(UserProperties::default().uid("alice").email("a@example.com"))
            .expect("valid"),
    )
    .expect("created");

    let update = UserUpdate {
        display_name: Some("Renamed".to_string()),
        ..UserUpdate::default()
    };
    assert!(settled(harness.auth.update_user("alice", update).expect("valid")).is_ok());
    assert_eq!(alice.display_name(), None);

    assert!(settled(alice.reload()).is_ok());
    assert_eq!(alice.display_name().as_deref(), Some("Renamed"));
}

#[test]
fn test_deleted_user_operations_reject() {
    let harness = Harness::new();
    harness.auth.auto_flush(true);
    let alice = settled(
        harness
            .auth
            .create_user(UserProperties::default().uid("alice").email("a@example.com"))
            .expect("valid"),
    )
    .expect("created");

    assert!(settled(alice.delete()).is_ok());
    assert!(harness.auth.users().is_empty());
    assert_eq!(settled(alice.delete()).expect_err("gone").code(), USER_NOT_FOUND);
    assert_eq!(settled(alice.reload()).expect_err("gone").code(), USER_NOT_FOUND);
    assert_eq!(
        settled(alice.update_password("secret").expect("valid")).expect_err("gone").code(),
        USER_NOT_FOUND
    );

    // Refresh still works locally without an upstream record.
    let token = alice.get_id_token(true).expect("refresh succeeds");
    assert!(settled(token).is_ok());
}

#[test]
fn test_duplicate_uid_is_rejected() {
    let harness = Harness::new();
    let first = harness
        .auth
        .create_user(UserProperties::default().uid("dup"))
        .expect("valid");
    let second = harness
        .auth
        .create_user(UserProperties::default().uid("dup"))
        .expect("valid");
    harness.auth.flush();

    assert!(settled(first).is_ok());
    assert_eq!(
        settled(second).expect_err("uid taken").code(),
        crate::auth::UID_ALREADY_EXISTS
    );
    assert_eq!(harness.auth.users().len(), 1);
}
