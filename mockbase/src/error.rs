//! Error taxonomy shared by every mock subsystem.
//!
//! # Propagation
//!
//! - `InvalidArgument` is returned synchronously from facade methods and never
//!   enters the scheduler.
//! - `TokenValidity` and `Token` are returned synchronously from session
//!   construction and refresh.
//! - Everything else is delivered by rejecting a [`PendingFuture`](crate::future::PendingFuture).
//!
//! Every variant carries a stable machine-readable [`code`](MockError::code)
//! so tests can assert on the failure kind without parsing messages.

use crate::auth::{JwtError, TokenValidityError};

/// A failure supplied by the test through `fail_next`.
///
/// Rejected futures carry it back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedFailure {
    /// Machine-readable code chosen by the test, e.g. `messaging/internal-error`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl InjectedFailure {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for InjectedFailure {}

/// Errors produced by the mock subsystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    /// Missing or malformed operation arguments.
    InvalidArgument {
        /// The operation that rejected its arguments.
        operation: String,
        /// What was wrong with them.
        message: String,
    },
    /// A failure registered through `fail_next`.
    Injected(InjectedFailure),
    /// A session token violated its temporal ordering.
    TokenValidity(TokenValidityError),
    /// An ID token could not be minted or decoded.
    Token(JwtError),
    /// The upstream record an operation needs does not exist.
    NotFound {
        /// Stable code, e.g. `auth/user-not-found`.
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// An operation would overwrite a record that already exists.
    AlreadyExists {
        /// Stable code, e.g. `auth/uid-already-exists`.
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// An injected success value does not fit the operation's result type.
    ResultMismatch {
        /// The operation that settled.
        operation: String,
        /// Why the conversion failed.
        reason: String,
    },
    /// The scheduler was dropped before the operation settled.
    Abandoned {
        /// The operation that never ran.
        operation: String,
    },
}

impl MockError {
    /// Code used for [`MockError::InvalidArgument`].
    pub const INVALID_ARGUMENT: &'static str = "invalid-argument";
    /// Code used for [`MockError::ResultMismatch`].
    pub const RESULT_MISMATCH: &'static str = "mock/result-mismatch";
    /// Code used for [`MockError::Abandoned`].
    pub const ABANDONED: &'static str = "mock/abandoned";

    /// Build an `InvalidArgument` error for `operation`.
    #[must_use]
    pub fn invalid_argument(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Build a `NotFound` error.
    #[must_use]
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build an `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an injected failure, for use with `fail_next`.
    #[must_use]
    pub fn injected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Injected(InjectedFailure::new(code, message))
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidArgument { .. } => Self::INVALID_ARGUMENT,
            Self::Injected(failure) => &failure.code,
            Self::TokenValidity(error) => error.code(),
            Self::Token(error) => error.code(),
            Self::NotFound { code, .. } | Self::AlreadyExists { code, .. } => code,
            Self::ResultMismatch { .. } => Self::RESULT_MISMATCH,
            Self::Abandoned { .. } => Self::ABANDONED,
        }
    }
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument { operation, message } => {
                write!(f, "invalid argument to {operation}: {message}")
            }
            Self::Injected(failure) => write!(f, "{failure}"),
            Self::TokenValidity(error) => write!(f, "{error}"),
            Self::Token(error) => write!(f, "{error}"),
            Self::NotFound { code, message } | Self::AlreadyExists { code, message } => {
                write!(f, "{code}: {message}")
            }
            Self::ResultMismatch { operation, reason } => {
                write!(f, "injected result for {operation} does not fit: {reason}")
            }
            Self::Abandoned { operation } => {
                write!(f, "{operation} was dropped before it settled")
            }
        }
    }
}

impl std::error::Error for MockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Injected(failure) => Some(failure),
            Self::TokenValidity(error) => Some(error),
            Self::Token(error) => Some(error),
            Self::InvalidArgument { .. }
            | Self::NotFound { .. }
            | Self::AlreadyExists { .. }
            | Self::ResultMismatch { .. }
            | Self::Abandoned { .. } => None,
        }
    }
}

impl From<InjectedFailure> for MockError {
    fn from(failure: InjectedFailure) -> Self {
        Self::Injected(failure)
    }
}

impl From<JwtError> for MockError {
    fn from(error: JwtError) -> Self {
        Self::Token(error)
    }
}

impl From<TokenValidityError> for MockError {
    fn from(error: TokenValidityError) -> Self {
        Self::TokenValidity(error)
    }
}
