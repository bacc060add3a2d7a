//! User sessions.
//!
//! A [`MockUser`] is a detached working copy of a user record. The owning
//! [`MockAuthentication`](super::MockAuthentication) keeps the canonical
//! record; the user reaches it only through a weak [`UserRecords`] link.
//! A user never keeps its store alive. Once the store is dropped, queued and
//! new calls settle as abandoned; a local refresh still works.
//!
//! # Lifecycle
//!
//! constructed -> valid -> refreshed -> valid ... -> deleted
//!
//! # Invariants
//!
//! - The token validity window is checked at construction and on every
//!   refresh; see [`TokenValidity::validate`].
//! - A refresh always mints a new token and keeps the original auth time.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::auth::issuer::TokenIssuer;
use crate::auth::store::UserRecords;
use crate::auth::validity::{
    IdTokenResult, TokenValidity, TokenValidityOverrides, format_timestamp,
};
use crate::error::MockError;
use crate::facade::OperationFacade;
use crate::future::{PendingFuture, pending};
use crate::time::Timer;

/// Code carried by `NotFound` errors for missing users.
pub const USER_NOT_FOUND: &str = "auth/user-not-found";

pub(crate) fn user_not_found(uid: &str) -> MockError {
    MockError::not_found(
        USER_NOT_FOUND,
        format!("There is no user record corresponding to the identifier {uid}"),
    )
}

/// The stored state of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    pub email_verified: bool,
    pub is_anonymous: bool,
    pub provider_id: Option<String>,
    pub custom_claims: Map<String, Value>,
    pub id_token: String,
    pub token_validity: TokenValidity,
}

impl UserRecord {
    /// Build a record from `properties`, filling in the uid, the validity
    /// window and the token.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty uid or email
    /// - `TokenValidity` if the supplied timestamps are out of order
    /// - `Token` if the token cannot be signed
    pub(crate) fn build(
        properties: UserProperties,
        issuer: &TokenIssuer,
        now_ms: u64,
        operation: &str,
    ) -> Result<Self, MockError> {
        if properties.uid.as_deref() == Some("") {
            return Err(MockError::invalid_argument(operation, "uid must not be empty"));
        }
        if properties.email.as_deref() == Some("") {
            return Err(MockError::invalid_argument(operation, "email must not be empty"));
        }

        let validity = TokenValidity::resolve(properties.token_validity, now_ms, issuer.ttl_ms())?;
        let mut record = Self {
            uid: properties.uid.unwrap_or_else(|| issuer.next_id(now_ms)),
            email: properties.email,
            password: properties.password,
            display_name: properties.display_name,
            photo_url: properties.photo_url,
            phone_number: properties.phone_number,
            email_verified: properties.email_verified,
            is_anonymous: properties.is_anonymous,
            provider_id: properties.provider_id,
            custom_claims: properties.custom_claims,
            id_token: String::new(),
            token_validity: validity,
        };
        record.id_token = match properties.id_token {
            Some(token) => token,
            None => issuer.issue(&record, validity, now_ms)?,
        };
        Ok(record)
    }

    /// Structured view of the current token.
    #[must_use]
    pub fn id_token_result(&self) -> IdTokenResult {
        IdTokenResult {
            token: self.id_token.clone(),
            auth_time: format_timestamp(self.token_validity.auth_time_ms),
            issued_at_time: format_timestamp(self.token_validity.issued_at_ms),
            expiration_time: format_timestamp(self.token_validity.expiration_ms),
            sign_in_provider: self.provider_id.clone(),
            claims: self.custom_claims.clone(),
        }
    }
}

/// Properties for a new user. Unset fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProperties {
    pub uid: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    pub email_verified: bool,
    pub is_anonymous: bool,
    pub provider_id: Option<String>,
    pub custom_claims: Map<String, Value>,
    /// Use this token instead of minting one.
    pub id_token: Option<String>,
    pub token_validity: TokenValidityOverrides,
}

impl UserProperties {
    #[must_use]
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn provider_id(mut self, provider: impl Into<String>) -> Self {
        self.provider_id = Some(provider.into());
        self
    }

    /// Add one custom claim.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.custom_claims.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn token_validity(mut self, overrides: TokenValidityOverrides) -> Self {
        self.token_validity = overrides;
        self
    }
}

/// Fields changed by [`MockUser::update_profile`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// What a user needs from its owning store.
///
/// The facade is held weakly: its queue can hold users, and a user must not
/// keep that queue alive.
#[derive(Clone)]
pub(crate) struct StoreLink {
    pub(crate) facade: Weak<OperationFacade>,
    pub(crate) timer: Rc<dyn Timer>,
    pub(crate) records: Weak<dyn UserRecords>,
    pub(crate) issuer: Rc<TokenIssuer>,
}

impl StoreLink {
    pub(crate) fn now_ms(&self) -> u64 {
        self.timer.now_ms()
    }

    /// Queue `operation` on the owning store's scheduler.
    ///
    /// With the store gone nothing can ever run it, so the returned future
    /// is already abandoned.
    pub(crate) fn defer<T, F>(
        &self,
        operation: &'static str,
        args: Vec<Value>,
        default: F,
    ) -> PendingFuture<T>
    where
        T: DeserializeOwned + 'static,
        F: FnOnce() -> Result<T, MockError> + 'static,
    {
        if let Some(facade) = self.facade.upgrade() {
            return facade.defer(operation, args, default);
        }
        tracing::warn!(operation, "owning store is gone, abandoning operation");
        let (_settle, future) = pending(operation);
        future
    }
}

/// A signed-in user.
///
/// Cloning produces a detached deep copy that shares the store link.
pub struct MockUser {
    record: Rc<RefCell<UserRecord>>,
    link: StoreLink,
}

impl MockUser {
    /// Build a user bound to `auth` without registering it there.
    ///
    /// # Errors
    ///
    /// Fails with `TokenValidity` when the validity overrides are out of
    /// order, or `InvalidArgument` for an empty uid or email.
    pub fn new(
        auth: &super::MockAuthentication,
        properties: UserProperties,
    ) -> Result<Self, MockError> {
        let link = auth.link();
        let record = UserRecord::build(properties, &link.issuer, link.now_ms(), "User")?;
        Ok(Self::from_record(record, link))
    }

    pub(crate) fn from_record(record: UserRecord, link: StoreLink) -> Self {
        Self {
            record: Rc::new(RefCell::new(record)),
            link,
        }
    }

    #[must_use]
    pub fn uid(&self) -> String {
        self.record.borrow().uid.clone()
    }

    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.record.borrow().email.clone()
    }

    #[must_use]
    pub fn password(&self) -> Option<String> {
        self.record.borrow().password.clone()
    }

    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        self.record.borrow().display_name.clone()
    }

    #[must_use]
    pub fn photo_url(&self) -> Option<String> {
        self.record.borrow().photo_url.clone()
    }

    #[must_use]
    pub fn provider_id(&self) -> Option<String> {
        self.record.borrow().provider_id.clone()
    }

    #[must_use]
    pub fn custom_claims(&self) -> Map<String, Value> {
        self.record.borrow().custom_claims.clone()
    }

    /// The current token, without going through the scheduler.
    #[must_use]
    pub fn id_token(&self) -> String {
        self.record.borrow().id_token.clone()
    }

    #[must_use]
    pub fn token_validity(&self) -> TokenValidity {
        self.record.borrow().token_validity
    }

    /// Snapshot of the whole record.
    #[must_use]
    pub fn to_record(&self) -> UserRecord {
        self.record.borrow().clone()
    }

    /// Edit this copy's custom claims in place. The store is not touched.
    pub fn update_custom_claims(&self, edit: impl FnOnce(&mut Map<String, Value>)) {
        edit(&mut self.record.borrow_mut().custom_claims);
    }

    /// The current token, refreshed first when `force_refresh` is set.
    ///
    /// # Errors
    ///
    /// A forced refresh fails synchronously like [`refresh`](Self::refresh).
    pub fn get_id_token(&self, force_refresh: bool) -> Result<PendingFuture<String>, MockError> {
        if force_refresh {
            self.refresh()?;
        }
        let record = Rc::clone(&self.record);
        Ok(self
            .link
            .defer("getIdToken", vec![json!(force_refresh)], move || {
                Ok(record.borrow().id_token.clone())
            }))
    }

    /// The current token result, refreshed first when `force_refresh` is set.
    ///
    /// # Errors
    ///
    /// A forced refresh fails synchronously like [`refresh`](Self::refresh).
    pub fn get_id_token_result(
        &self,
        force_refresh: bool,
    ) -> Result<PendingFuture<IdTokenResult>, MockError> {
        let args = vec![json!(force_refresh)];
        if force_refresh {
            let result = self.refresh()?;
            return Ok(self.link.defer("getIdTokenResult", args, move || Ok(result)));
        }
        let record = Rc::clone(&self.record);
        Ok(self.link.defer("getIdTokenResult", args, move || {
            Ok(record.borrow().id_token_result())
        }))
    }

    /// Mint a new token issued now, keep the auth time, and write the token
    /// back to the owning store.
    ///
    /// A missing upstream record is tolerated: the new token is kept locally.
    ///
    /// # Errors
    ///
    /// - `TokenValidity` if the clock is behind the auth time
    /// - `Token` if signing fails
    pub fn refresh(&self) -> Result<IdTokenResult, MockError> {
        let now_ms = self.link.now_ms();
        let issuer = &self.link.issuer;

        let validity = self
            .record
            .borrow()
            .token_validity
            .refreshed(now_ms, issuer.ttl_ms())?;
        let token = issuer.issue(&self.record.borrow(), validity, now_ms)?;

        let result = {
            let mut record = self.record.borrow_mut();
            record.token_validity = validity;
            record.id_token = token;
            record.id_token_result()
        };
        self.persist_token();
        Ok(result)
    }

    fn persist_token(&self) {
        let record = self.record.borrow();
        let Some(store) = self.link.records.upgrade() else {
            tracing::debug!(uid = %record.uid, "owning store is gone, keeping refreshed token locally");
            return;
        };
        if let Some(mut upstream) = store.read_record(&record.uid) {
            upstream.id_token.clone_from(&record.id_token);
            upstream.token_validity = record.token_validity;
            store.write_record(upstream);
            tracing::debug!(uid = %record.uid, "persisted refreshed token");
        } else {
            tracing::warn!(uid = %record.uid, "no upstream record, keeping refreshed token locally");
        }
    }

    /// Remove this user from the owning store.
    ///
    /// Rejects with `auth/user-not-found` if it is already gone.
    pub fn delete(&self) -> PendingFuture<()> {
        let uid = self.uid();
        let records = self.link.records.clone();
        self.link.defer("delete", vec![json!(uid)], move || {
            records
                .upgrade()
                .and_then(|store| store.remove_record(&uid))
                .map(|_| ())
                .ok_or_else(|| user_not_found(&uid))
        })
    }

    /// Replace this copy with the store's current record.
    ///
    /// Rejects with `auth/user-not-found` if the record is gone.
    pub fn reload(&self) -> PendingFuture<()> {
        let uid = self.uid();
        let record = Rc::clone(&self.record);
        let records = self.link.records.clone();
        self.link.defer("reload", vec![json!(uid)], move || {
            let upstream = records
                .upgrade()
                .and_then(|store| store.read_record(&uid))
                .ok_or_else(|| user_not_found(&uid))?;
            *record.borrow_mut() = upstream;
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty email.
    pub fn update_email(&self, email: &str) -> Result<PendingFuture<()>, MockError> {
        if email.is_empty() {
            return Err(MockError::invalid_argument("updateEmail", "email must not be empty"));
        }
        let email = email.to_string();
        Ok(self.apply_update("updateEmail", vec![json!(email)], move |record| {
            record.email = Some(email.clone());
        }))
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty password.
    pub fn update_password(&self, password: &str) -> Result<PendingFuture<()>, MockError> {
        if password.is_empty() {
            return Err(MockError::invalid_argument(
                "updatePassword",
                "password must not be empty",
            ));
        }
        let password = password.to_string();
        Ok(self.apply_update("updatePassword", vec![json!(password)], move |record| {
            record.password = Some(password.clone());
        }))
    }

    /// Set the display name and/or photo URL. Unset fields are left alone.
    pub fn update_profile(&self, profile: ProfileUpdate) -> PendingFuture<()> {
        let args = vec![serde_json::to_value(&profile).unwrap_or_default()];
        self.apply_update("updateProfile", args, move |record| {
            if let Some(name) = &profile.display_name {
                record.display_name = Some(name.clone());
            }
            if let Some(url) = &profile.photo_url {
                record.photo_url = Some(url.clone());
            }
        })
    }

    /// Apply `change` to the upstream record and then to this copy, at
    /// settle time.
    fn apply_update(
        &self,
        operation: &'static str,
        args: Vec<Value>,
        change: impl Fn(&mut UserRecord) + 'static,
    ) -> PendingFuture<()> {
        let uid = self.uid();
        let record = Rc::clone(&self.record);
        let records = self.link.records.clone();
        self.link.defer(operation, args, move || {
            let store = records.upgrade().ok_or_else(|| user_not_found(&uid))?;
            let mut upstream = store.read_record(&uid).ok_or_else(|| user_not_found(&uid))?;
            change(&mut upstream);
            store.write_record(upstream);
            change(&mut record.borrow_mut());
            Ok(())
        })
    }
}

impl Clone for MockUser {
    fn clone(&self) -> Self {
        #[allow(clippy::disallowed_methods)] // Detached copy of the record
        let record = self.record.borrow().clone();
        Self::from_record(record, self.link.clone())
    }
}

impl PartialEq for MockUser {
    fn eq(&self, other: &Self) -> bool {
        *self.record.borrow() == *other.record.borrow()
    }
}

impl std::fmt::Debug for MockUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockUser")
            .field("record", &*self.record.borrow())
            .finish_non_exhaustive()
    }
}
