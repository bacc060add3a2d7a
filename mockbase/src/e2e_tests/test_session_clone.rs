//! Cloned users are deep, detached copies.

use serde_json::json;

use super::helpers::{Harness, settled};
use crate::auth::{MockUser, UserProperties};
use crate::facade::MockService;

#[test]
fn test_clone_is_equal_then_independent() {
    let harness = Harness::new();
    let original = MockUser::new(
        &harness.auth,
        UserProperties::default()
            .uid("alice")
            .claim("roles", json!({"admin": true, "scopes": ["read"]})),
    )
    .expect("valid");
    let copy = original.clone();
    assert_eq!(copy, original);

    copy.update_custom_claims(|claims| {
        claims["roles"]["scopes"]
            .as_array_mut()
            .expect("scopes is a list")
            .push(json!("write"));
    });
    assert_ne!(copy, original);
    assert_eq!(
        original.custom_claims()["roles"]["scopes"],
        json!(["read"])
    );
    assert_eq!(
        copy.custom_claims()["roles"]["scopes"],
        json!(["read", "write"])
    );
}

#[test]
fn test_refreshing_a_clone_leaves_the_original() {
    let harness = Harness::new();
    let original = MockUser::new(&harness.auth, UserProperties::default()).expect("valid");
    let copy = original.clone();

    harness.timer.advance(1_000);
    copy.refresh().expect("refresh succeeds");
    assert_ne!(copy.id_token(), original.id_token());
    assert_ne!(copy.token_validity(), original.token_validity());
}

#[test]
fn test_clone_shares_the_store_link() {
    let harness = Harness::new();
    harness.auth.auto_flush(true);
    let created = settled(
        harness
            .auth
            .create_user(UserProperties::default().uid("alice").email("a@example.com"))
            .expect("valid"),
    )
    .expect("created");

    let copy = created.clone();
    assert!(settled(copy.delete()).is_ok());
    assert!(harness.auth.users().is_empty());
    assert!(settled(created.delete()).is_err());
}
