//! Authentication mock.
//!
//! Users carry a signed ID token and its validity window. Token retrieval,
//! refresh delivery and every store-backed user operation settle through the
//! scheduler of the owning [`MockAuthentication`].
//!
//! # Pre-conditions
//! - The configured token secret is non-empty.
//!
//! # Post-conditions
//! - A user that constructed successfully holds a valid token window.
//!
//! # Invariants
//! - A user holds only a weak capability link to its store, never the store.

mod issuer;
pub mod jwt;
mod store;
mod user;
mod validity;

pub use jwt::{IdTokenClaims, JwtError, SignInClaims, decode_id_token};
pub use store::{MockAuthentication, UID_ALREADY_EXISTS, UserRecords, UserTable, UserUpdate};
pub use user::{MockUser, ProfileUpdate, USER_NOT_FOUND, UserProperties, UserRecord};
pub use validity::{
    IdTokenResult, TokenValidity, TokenValidityError, TokenValidityOverrides, format_timestamp,
    parse_timestamp,
};
