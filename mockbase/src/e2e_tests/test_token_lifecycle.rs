//! ID token validity windows, refresh and persistence.

use super::helpers::{HOUR_MS, Harness, START_MS, settled};
use crate::auth::{
    MockUser, TokenValidityError, TokenValidityOverrides, UserProperties, decode_id_token,
    parse_timestamp,
};
use crate::config::MockConfig;
use crate::error::MockError;
use crate::facade::MockService;

fn validity_error(result: Result<MockUser, MockError>) -> TokenValidityError {
    match result {
        Err(MockError::TokenValidity(kind)) => kind,
        other => panic!("expected a token validity error, got {other:?}"),
    }
}

#[test]
fn test_issued_before_auth_is_rejected() {
    let harness = Harness::new();
    let overrides = TokenValidityOverrides::default()
        .auth_time(START_MS)
        .issued_at(START_MS - 1);
    let result = MockUser::new(
        &harness.auth,
        UserProperties::default().token_validity(overrides),
    );
    assert_eq!(validity_error(result), TokenValidityError::IssuedBeforeAuth);
}

#[test]
fn test_expires_before_issuance_is_rejected() {
    let harness = Harness::new();
    let overrides = TokenValidityOverrides::default()
        .auth_time(START_MS)
        .issued_at(START_MS)
        .expiration(START_MS - 1);
    let result = MockUser::new(
        &harness.auth,
        UserProperties::default().token_validity(overrides),
    );
    assert_eq!(validity_error(result), TokenValidityError::ExpiresBeforeIssuance);
}

#[test]
fn test_future_timestamps_are_rejected() {
    let harness = Harness::new();
    let auth_later = TokenValidityOverrides::default().auth_time(START_MS + 1);
    assert_eq!(
        validity_error(MockUser::new(
            &harness.auth,
            UserProperties::default().token_validity(auth_later),
        )),
        TokenValidityError::AuthenticatedInTheFuture
    );

    let issued_later = TokenValidityOverrides::default()
        .auth_time(START_MS)
        .issued_at(START_MS + 1);
    assert_eq!(
        validity_error(MockUser::new(
            &harness.auth,
            UserProperties::default().token_validity(issued_later),
        )),
        TokenValidityError::IssuedInTheFuture
    );
}

#[test]
fn test_iso_overrides_render_back_unchanged() {
    let harness = Harness::new();
    let auth_time = parse_timestamp("2019-11-22T07:46:15.000Z").expect("rfc 3339");
    let issued_at = parse_timestamp("2019-11-22T08:16:15.000Z").expect("rfc 3339");
    let user = MockUser::new(
        &harness.auth,
        UserProperties::default().uid("alice").token_validity(
            TokenValidityOverrides::default()
                .auth_time(auth_time)
                .issued_at(issued_at),
        ),
    )
    .expect("ordered window");

    let result = settled({
        let future = user.get_id_token_result(false).expect("no refresh");
        harness.auth.flush();
        future
    })
    .expect("resolved");
    assert_eq!(result.auth_time, "2019-11-22T07:46:15.000Z");
    assert_eq!(result.issued_at_time, "2019-11-22T08:16:15.000Z");
    assert_eq!(result.expiration_time, "2019-11-22T09:16:15.000Z");
}

#[test]
fn test_forced_refresh_issues_a_new_token_now() {
    let harness = Harness::new();
    let created = harness
        .auth
        .create_user(UserProperties::default().uid("alice").email("alice@example.com"))
        .expect("valid");
    harness.auth.flush();
    let user = settled(created).expect("created");
    let before = user.id_token();

    harness.timer.advance(10 * 60 * 1000);
    let refreshed = user.get_id_token_result(true).expect("refresh succeeds");
    harness.auth.flush();
    let result = settled(refreshed).expect("resolved");

    let now = START_MS + 10 * 60 * 1000;
    assert_ne!(result.token, before);
    assert_eq!(
        parse_timestamp(&result.issued_at_time).expect("valid"),
        now
    );
    assert_eq!(
        parse_timestamp(&result.expiration_time).expect("valid"),
        now + HOUR_MS
    );
    assert_eq!(
        parse_timestamp(&result.auth_time).expect("valid"),
        START_MS
    );

    let reread = harness.auth.get_user("alice").expect("valid uid");
    harness.auth.flush();
    assert_eq!(settled(reread).expect("stored").id_token(), result.token);
}

#[test]
fn test_every_forced_refresh_differs() {
    let harness = Harness::new();
    let user = MockUser::new(&harness.auth, UserProperties::default()).expect("valid");
    let mut seen = vec![user.id_token()];
    for _ in 0..3 {
        let token = user.get_id_token(true).expect("refresh succeeds");
        harness.auth.flush();
        let token = settled(token).expect("resolved");
        assert!(!seen.contains(&token));
        seen.push(token);
    }
}

#[test]
fn test_refresh_fails_when_clock_moves_before_auth() {
    let harness = Harness::new();
    let user = MockUser::new(&harness.auth, UserProperties::default()).expect("valid");
    harness.timer.set(START_MS - 1);
    let error = user.get_id_token(true).expect_err("clock behind auth time");
    assert_eq!(
        error,
        MockError::TokenValidity(TokenValidityError::IssuedBeforeAuth)
    );
    assert!(harness.auth.facade().scheduler().is_empty());
}

#[test]
fn test_token_claims_are_signed_and_readable() {
    let harness = Harness::new();
    let user = MockUser::new(
        &harness.auth,
        UserProperties::default()
            .uid("alice")
            .provider_id("password")
            .claim("admin", serde_json::json!(true)),
    )
    .expect("valid");

    let secret = MockConfig::default().token_secret;
    let claims = decode_id_token(&user.id_token(), &secret).expect("signed with the default secret");
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.iat, START_MS / 1000);
    assert_eq!(claims.exp, (START_MS + HOUR_MS) / 1000);
    assert_eq!(claims.custom.get("admin"), Some(&serde_json::json!(true)));
    assert!(decode_id_token(&user.id_token(), b"another secret").is_err());
}
