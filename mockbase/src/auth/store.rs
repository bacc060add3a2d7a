//! Authentication mock and its user table.
//!
//! # Pre-conditions
//! - uids passed to lookups are non-empty.
//!
//! # Post-conditions
//! - Every operation settles through the mock's scheduler.
//! - Users handed out are detached copies; the table keeps the canonical
//!   records.
//!
//! # Invariants
//! - At most one record per uid.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use crate::auth::issuer::TokenIssuer;
use crate::auth::user::{MockUser, StoreLink, UserProperties, UserRecord, user_not_found};
use crate::config::MockConfig;
use crate::error::MockError;
use crate::facade::{MockService, OperationFacade};
use crate::future::PendingFuture;
use crate::time::{Timer, TokioTimer};

/// Code carried by `AlreadyExists` errors from `create_user`.
pub const UID_ALREADY_EXISTS: &str = "auth/uid-already-exists";

/// Keyed access to canonical user records.
///
/// This is the whole of what a [`MockUser`] may do to its store.
pub trait UserRecords {
    fn read_record(&self, uid: &str) -> Option<UserRecord>;
    /// Insert or replace the record stored under `record.uid`.
    fn write_record(&self, record: UserRecord);
    fn remove_record(&self, uid: &str) -> Option<UserRecord>;
}

/// In-memory user records in creation order.
#[derive(Debug, Default)]
pub struct UserTable {
    records: RefCell<IndexMap<String, UserRecord>>,
}

impl UserTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// All uids, oldest first.
    #[must_use]
    pub fn uids(&self) -> Vec<String> {
        self.records.borrow().keys().cloned().collect()
    }
}

impl UserRecords for UserTable {
    fn read_record(&self, uid: &str) -> Option<UserRecord> {
        self.records.borrow().get(uid).cloned()
    }

    fn write_record(&self, record: UserRecord) {
        self.records.borrow_mut().insert(record.uid.clone(), record);
    }

    fn remove_record(&self, uid: &str) -> Option<UserRecord> {
        self.records.borrow_mut().shift_remove(uid)
    }
}

/// Fields changed by [`MockAuthentication::update_user`]. `None` leaves a
/// field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    pub email_verified: Option<bool>,
    pub custom_claims: Option<Map<String, Value>>,
}

impl UserUpdate {
    fn apply(self, record: &mut UserRecord) {
        if let Some(email) = self.email {
            record.email = Some(email);
        }
        if let Some(password) = self.password {
            record.password = Some(password);
        }
        if let Some(name) = self.display_name {
            record.display_name = Some(name);
        }
        if let Some(url) = self.photo_url {
            record.photo_url = Some(url);
        }
        if let Some(phone) = self.phone_number {
            record.phone_number = Some(phone);
        }
        if let Some(verified) = self.email_verified {
            record.email_verified = verified;
        }
        if let Some(claims) = self.custom_claims {
            record.custom_claims = claims;
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "email": self.email,
            "displayName": self.display_name,
            "photoURL": self.photo_url,
            "phoneNumber": self.phone_number,
            "emailVerified": self.email_verified,
            "customClaims": self.custom_claims,
        })
    }
}

/// Mock of the authentication service.
#[derive(Debug)]
pub struct MockAuthentication {
    facade: Rc<OperationFacade>,
    users: Rc<UserTable>,
    issuer: Rc<TokenIssuer>,
    current_user: Rc<RefCell<Option<MockUser>>>,
}

impl MockAuthentication {
    /// Mock driven by the wall clock. Delayed flushes need a tokio `LocalSet`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timer(Rc::new(TokioTimer))
    }

    #[must_use]
    pub fn with_timer(timer: Rc<dyn Timer>) -> Self {
        Self::with_config(&MockConfig::default(), timer)
    }

    #[must_use]
    pub fn with_config(config: &MockConfig, timer: Rc<dyn Timer>) -> Self {
        let facade = OperationFacade::new(timer);
        facade.scheduler().auto_flush(config.auto_flush);
        Self {
            facade: Rc::new(facade),
            users: Rc::new(UserTable::default()),
            issuer: Rc::new(TokenIssuer::new(config)),
            current_user: Rc::new(RefCell::new(None)),
        }
    }

    pub(crate) fn link(&self) -> StoreLink {
        let users: Weak<UserTable> = Rc::downgrade(&self.users);
        let records: Weak<dyn UserRecords> = users;
        StoreLink {
            facade: Rc::downgrade(&self.facade),
            timer: Rc::clone(self.facade.scheduler().timer()),
            records,
            issuer: Rc::clone(&self.issuer),
        }
    }

    /// The canonical user records.
    #[must_use]
    pub fn users(&self) -> &UserTable {
        &self.users
    }

    /// Register a new user.
    ///
    /// Rejects with `auth/uid-already-exists` if the uid is taken when the
    /// operation settles.
    ///
    /// # Errors
    ///
    /// Same as [`MockUser::new`].
    pub fn create_user(
        &self,
        properties: UserProperties,
    ) -> Result<PendingFuture<MockUser>, MockError> {
        let link = self.link();
        let record = UserRecord::build(properties, &self.issuer, link.now_ms(), "createUser")?;
        let args = vec![serde_json::to_value(&record).unwrap_or_default()];
        let users = Rc::clone(&self.users);
        let convert_link = link.clone();

        Ok(self.facade.defer_with(
            "createUser",
            args,
            move |value| user_from_value("createUser", value, convert_link),
            move || {
                if users.read_record(&record.uid).is_some() {
                    return Err(MockError::already_exists(
                        UID_ALREADY_EXISTS,
                        format!("The user with the provided uid ({}) already exists", record.uid),
                    ));
                }
                users.write_record(record.clone());
                tracing::debug!(uid = %record.uid, "created user");
                Ok(MockUser::from_record(record, link))
            },
        ))
    }

    /// Look up a user by uid.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty uid.
    pub fn get_user(&self, uid: &str) -> Result<PendingFuture<MockUser>, MockError> {
        let uid = require_uid("getUser", uid)?;
        let link = self.link();
        let users = Rc::clone(&self.users);
        let convert_link = link.clone();

        Ok(self.facade.defer_with(
            "getUser",
            vec![json!(uid)],
            move |value| user_from_value("getUser", value, convert_link),
            move || {
                users
                    .read_record(&uid)
                    .map(|record| MockUser::from_record(record, link))
                    .ok_or_else(|| user_not_found(&uid))
            },
        ))
    }

    /// Change stored fields of a user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty uid or an empty new email.
    pub fn update_user(
        &self,
        uid: &str,
        update: UserUpdate,
    ) -> Result<PendingFuture<MockUser>, MockError> {
        let uid = require_uid("updateUser", uid)?;
        if update.email.as_deref() == Some("") {
            return Err(MockError::invalid_argument("updateUser", "email must not be empty"));
        }
        let link = self.link();
        let users = Rc::clone(&self.users);
        let convert_link = link.clone();
        let args = vec![json!(uid), update.to_json()];

        Ok(self.facade.defer_with(
            "updateUser",
            args,
            move |value| user_from_value("updateUser", value, convert_link),
            move || {
                let mut record = users.read_record(&uid).ok_or_else(|| user_not_found(&uid))?;
                update.apply(&mut record);
                users.write_record(record.clone());
                Ok(MockUser::from_record(record, link))
            },
        ))
    }

    /// Remove a user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty uid.
    pub fn delete_user(&self, uid: &str) -> Result<PendingFuture<()>, MockError> {
        let uid = require_uid("deleteUser", uid)?;
        let users = Rc::clone(&self.users);
        Ok(self
            .facade
            .defer("deleteUser", vec![json!(uid)], move || {
                if users.remove_record(&uid).is_none() {
                    return Err(user_not_found(&uid));
                }
                tracing::debug!(uid = %uid, "deleted user");
                Ok(())
            }))
    }

    /// Make `user` the signed-in user once the operation settles.
    pub fn change_auth_state(&self, user: &MockUser) -> PendingFuture<()> {
        let user = user.clone();
        let current = Rc::clone(&self.current_user);
        self.facade
            .defer("changeAuthState", vec![json!(user.uid())], move || {
                *current.borrow_mut() = Some(user);
                Ok(())
            })
    }

    /// Copy of the signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<MockUser> {
        self.current_user.borrow().clone()
    }
}

impl Default for MockAuthentication {
    fn default() -> Self {
        Self::new()
    }
}

impl MockService for MockAuthentication {
    fn facade(&self) -> &OperationFacade {
        &self.facade
    }
}

fn require_uid(operation: &str, uid: &str) -> Result<String, MockError> {
    if uid.is_empty() {
        return Err(MockError::invalid_argument(operation, "uid must not be empty"));
    }
    Ok(uid.to_string())
}

fn user_from_value(
    operation: &str,
    value: Value,
    link: StoreLink,
) -> Result<MockUser, MockError> {
    serde_json::from_value::<UserRecord>(value)
        .map(|record| MockUser::from_record(record, link))
        .map_err(|e| MockError::ResultMismatch {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
}
