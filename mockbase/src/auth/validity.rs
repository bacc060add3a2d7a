//! ID token validity window.
//!
//! # Invariants
//!
//! Checked at construction and on every refresh, in this order:
//! - `issued_at_ms <= expiration_ms`
//! - `auth_time_ms <= issued_at_ms`
//! - `auth_time_ms <= now`
//! - `issued_at_ms <= now`

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MockError;

/// A violated ordering between token timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidityError {
    /// `expiration_time < issued_at_time`.
    ExpiresBeforeIssuance,
    /// `issued_at_time < auth_time`.
    IssuedBeforeAuth,
    /// `issued_at_time > now`.
    IssuedInTheFuture,
    /// `auth_time > now`.
    AuthenticatedInTheFuture,
}

impl TokenValidityError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ExpiresBeforeIssuance => "auth/token-expires-before-issuance",
            Self::IssuedBeforeAuth => "auth/token-issued-before-auth",
            Self::IssuedInTheFuture => "auth/token-issued-in-the-future",
            Self::AuthenticatedInTheFuture => "auth/token-authenticated-in-the-future",
        }
    }

    /// Diagnostic message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ExpiresBeforeIssuance => "ID token expires before it is issued",
            Self::IssuedBeforeAuth => "ID token is issued before the user authenticated",
            Self::IssuedInTheFuture => "ID token is issued in the future",
            Self::AuthenticatedInTheFuture => "ID token shows the user authenticating in the future",
        }
    }
}

impl std::fmt::Display for TokenValidityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for TokenValidityError {}

/// Optional timestamps supplied when building a user.
///
/// Missing values default as follows: auth time to now, issued-at time to
/// the auth time, expiration to issued-at plus the token lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenValidityOverrides {
    pub auth_time_ms: Option<u64>,
    pub issued_at_ms: Option<u64>,
    pub expiration_ms: Option<u64>,
}

impl TokenValidityOverrides {
    #[must_use]
    pub const fn auth_time(mut self, ms: u64) -> Self {
        self.auth_time_ms = Some(ms);
        self
    }

    #[must_use]
    pub const fn issued_at(mut self, ms: u64) -> Self {
        self.issued_at_ms = Some(ms);
        self
    }

    #[must_use]
    pub const fn expiration(mut self, ms: u64) -> Self {
        self.expiration_ms = Some(ms);
        self
    }
}

/// The authentication, issuance and expiration times of an ID token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidity {
    pub auth_time_ms: u64,
    pub issued_at_ms: u64,
    pub expiration_ms: u64,
}

impl TokenValidity {
    /// Fill in defaults and validate.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn resolve(
        overrides: TokenValidityOverrides,
        now_ms: u64,
        ttl_ms: u64,
    ) -> Result<Self, TokenValidityError> {
        let auth_time_ms = overrides.auth_time_ms.unwrap_or(now_ms);
        let issued_at_ms = overrides.issued_at_ms.unwrap_or(auth_time_ms);
        let expiration_ms = overrides
            .expiration_ms
            .unwrap_or_else(|| issued_at_ms.saturating_add(ttl_ms));

        let validity = Self {
            auth_time_ms,
            issued_at_ms,
            expiration_ms,
        };
        validity.validate(now_ms)?;
        Ok(validity)
    }

    /// The window of a token re-issued at `now_ms`; auth time is kept.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant, e.g. when the clock has been
    /// moved back past the original authentication.
    pub fn refreshed(self, now_ms: u64, ttl_ms: u64) -> Result<Self, TokenValidityError> {
        let validity = Self {
            auth_time_ms: self.auth_time_ms,
            issued_at_ms: now_ms,
            expiration_ms: now_ms.saturating_add(ttl_ms),
        };
        validity.validate(now_ms)?;
        Ok(validity)
    }

    /// Check the ordering invariants against `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub const fn validate(&self, now_ms: u64) -> Result<(), TokenValidityError> {
        if self.expiration_ms < self.issued_at_ms {
            return Err(TokenValidityError::ExpiresBeforeIssuance);
        }
        if self.issued_at_ms < self.auth_time_ms {
            return Err(TokenValidityError::IssuedBeforeAuth);
        }
        if self.auth_time_ms > now_ms {
            return Err(TokenValidityError::AuthenticatedInTheFuture);
        }
        if self.issued_at_ms > now_ms {
            return Err(TokenValidityError::IssuedInTheFuture);
        }
        Ok(())
    }
}

/// Decoded view of a user's current ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdTokenResult {
    pub token: String,
    pub auth_time: String,
    pub issued_at_time: String,
    pub expiration_time: String,
    pub sign_in_provider: Option<String>,
    pub claims: Map<String, Value>,
}

/// Render milliseconds since the epoch as ISO-8601 UTC with milliseconds,
/// e.g. `2019-11-22T08:46:15.000Z`.
#[must_use]
pub fn format_timestamp(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || ms.to_string(),
            |time| time.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
}

/// Parse an RFC 3339 timestamp into milliseconds since the epoch.
///
/// # Errors
///
/// Returns `InvalidArgument` for malformed input or pre-epoch times.
pub fn parse_timestamp(text: &str) -> Result<u64, MockError> {
    let parsed = DateTime::parse_from_rfc3339(text)
        .map_err(|e| MockError::invalid_argument("parseTimestamp", format!("'{text}': {e}")))?;
    u64::try_from(parsed.timestamp_millis()).map_err(|_| {
        MockError::invalid_argument("parseTimestamp", format!("'{text}' is before 1970"))
    })
}
