//! One-shot result and failure overrides.
//!
//! A test registers what the next settlement of an operation should produce.
//! The facade consumes the override when the operation is called, so exactly
//! one call sees it; the call after that falls back to the default result.
//!
//! # Invariants
//!
//! - At most one override is pending per operation name. Registering again
//!   before it is consumed replaces the previous override.
//! - Reading an override removes it.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::MockError;

/// An override waiting for the next call of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injected {
    /// Resolve with this value instead of the default result.
    Success(Value),
    /// Reject with this error.
    Failure(MockError),
}

/// Override table owned by one mock subsystem.
#[derive(Debug, Default)]
pub struct InjectionRegistry {
    overrides: RefCell<HashMap<String, Injected>>,
}

impl InjectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next settlement of `operation` reject with `error`.
    pub fn fail_next(&self, operation: &str, error: impl Into<MockError>) {
        self.register(operation, Injected::Failure(error.into()));
    }

    /// Make the next settlement of `operation` resolve with `value`.
    ///
    /// Operations that resolve with nothing take no result override; use
    /// [`fail_next`](Self::fail_next) for those.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `value` cannot be represented as JSON or
    /// is null.
    pub fn next_result(&self, operation: &str, value: impl Serialize) -> Result<(), MockError> {
        let value = serde_json::to_value(value).map_err(|e| {
            MockError::invalid_argument("nextResult", format!("result is not serializable: {e}"))
        })?;
        if value.is_null() {
            return Err(MockError::invalid_argument("nextResult", "result must not be null"));
        }
        self.register(operation, Injected::Success(value));
        Ok(())
    }

    /// Remove and return the override registered for `operation`, if any.
    pub fn consume(&self, operation: &str) -> Option<Injected> {
        self.overrides.borrow_mut().remove(operation)
    }

    /// Whether an override is waiting for `operation`.
    #[must_use]
    pub fn is_pending(&self, operation: &str) -> bool {
        self.overrides.borrow().contains_key(operation)
    }

    fn register(&self, operation: &str, injected: Injected) {
        let replaced = self
            .overrides
            .borrow_mut()
            .insert(operation.to_string(), injected);
        if replaced.is_some() {
            tracing::debug!(operation, "replaced unconsumed override");
        }
    }
}
