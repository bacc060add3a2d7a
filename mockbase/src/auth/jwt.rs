//! ID token minting and decoding.
//!
//! Tokens are HS256 JWTs signed with the configured secret. They carry the
//! standard `sub` / `iat` / `exp` claims in seconds, the authentication time,
//! a unique `jti`, the sign-in provider and any custom claims.
//!
//! # Pre-conditions
//! - The secret must be non-empty.
//!
//! # Invariants
//! - Custom claims never shadow the reserved claims.
//! - Decoding does not check expiry: simulated clocks routinely sit outside
//!   the wall-clock validity window.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names that custom claims are not allowed to override.
pub const RESERVED_CLAIMS: &[&str] = &[
    "sub",
    "iat",
    "exp",
    "auth_time",
    "jti",
    "firebase",
    "iss",
    "aud",
    "nbf",
];

/// Provider information nested under the `firebase` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignInClaims {
    pub sign_in_provider: Option<String>,
}

/// The payload of an ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// The user's uid.
    pub sub: String,
    /// Issued-at, seconds since the epoch.
    pub iat: u64,
    /// Expiration, seconds since the epoch.
    pub exp: u64,
    /// Authentication time, seconds since the epoch.
    pub auth_time: u64,
    /// Unique token identifier.
    pub jti: String,
    #[serde(rename = "firebase", default)]
    pub sign_in: SignInClaims,
    /// Developer-supplied claims.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

/// Error returned when minting or decoding a token fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT is malformed or cannot be parsed.
    MalformedToken,
    /// The signing or decoding key is unusable.
    InvalidKey(String),
    /// The claims could not be signed.
    Signing(String),
}

impl JwtError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSignature | Self::MalformedToken => "auth/invalid-id-token",
            Self::InvalidKey(_) | Self::Signing(_) => "auth/internal-error",
        }
    }
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
            Self::Signing(reason) => write!(f, "could not sign JWT: {reason}"),
        }
    }
}

impl std::error::Error for JwtError {}

impl IdTokenClaims {
    /// Build claims from millisecond timestamps, dropping reserved names
    /// from `custom`.
    #[must_use]
    pub fn new(
        sub: &str,
        jti: String,
        validity: super::TokenValidity,
        sign_in_provider: Option<String>,
        custom: &Map<String, Value>,
    ) -> Self {
        let custom = custom
            .iter()
            .filter(|(name, _)| !RESERVED_CLAIMS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            sub: sub.to_string(),
            iat: validity.issued_at_ms / 1000,
            exp: validity.expiration_ms / 1000,
            auth_time: validity.auth_time_ms / 1000,
            jti,
            sign_in: SignInClaims { sign_in_provider },
            custom,
        }
    }
}

/// Sign `claims` with HS256.
///
/// # Errors
///
/// Returns `InvalidKey` for an empty secret, `Signing` if encoding fails.
pub fn mint_id_token(claims: &IdTokenClaims, secret: &[u8]) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidKey("secret must be non-empty".to_string()));
    }
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Signing(e.to_string()))
}

/// Verify an ID token's signature and return its claims.
///
/// # Errors
///
/// Returns `JwtError` if the key is empty, the signature does not match or
/// the token cannot be parsed.
pub fn decode_id_token(token: &str, secret: &[u8]) -> Result<IdTokenClaims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidKey("secret must be non-empty".to_string()));
    }

    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<IdTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(map_jwt_error)
}

fn map_jwt_error(error: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::InvalidKeyFormat => JwtError::InvalidKey(error.to_string()),
        _ => JwtError::MalformedToken,
    }
}
