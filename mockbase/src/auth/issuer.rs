//! Token and uid issuance shared by an authentication mock and its users.

use crate::auth::jwt::{IdTokenClaims, mint_id_token};
use crate::auth::user::UserRecord;
use crate::auth::validity::TokenValidity;
use crate::config::MockConfig;
use crate::error::MockError;
use crate::ids::IdGenerator;

#[derive(Debug)]
pub struct TokenIssuer {
    secret: Vec<u8>,
    ttl_ms: u64,
    ids: IdGenerator,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &MockConfig) -> Self {
        Self {
            secret: config.token_secret.clone(),
            ttl_ms: config.token_ttl_ms,
            ids: config.id_generator(),
        }
    }

    /// Lifetime of a freshly issued token.
    #[must_use]
    pub const fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// A fresh opaque identifier.
    pub fn next_id(&self, now_ms: u64) -> String {
        self.ids.next_id(now_ms)
    }

    /// Mint a token for `record` covering `validity`.
    ///
    /// Every call carries a fresh `jti`, so two tokens minted for the same
    /// record and window still differ.
    ///
    /// # Errors
    ///
    /// Returns `MockError::Token` if signing fails.
    pub fn issue(
        &self,
        record: &UserRecord,
        validity: TokenValidity,
        now_ms: u64,
    ) -> Result<String, MockError> {
        let claims = IdTokenClaims::new(
            &record.uid,
            self.next_id(now_ms),
            validity,
            record.provider_id.clone(),
            &record.custom_claims,
        );
        Ok(mint_id_token(&claims, &self.secret)?)
    }
}
