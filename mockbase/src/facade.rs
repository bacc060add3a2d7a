//! Shared plumbing for mock operation facades.
//!
//! # Life of a facade call
//!
//! 1. The facade method validates its arguments and returns
//!    `Err(InvalidArgument)` straight away if they are bad.
//! 2. It consumes any one-shot override registered for its operation name.
//! 3. It queues an operation whose action settles the returned future with
//!    the override, or with a default result computed at settle time.
//! 4. The caller gets a [`PendingFuture`] before anything has run.
//!
//! [`MockService`] gives every subsystem the same test-control surface:
//! flush, auto-flush, fault/result injection and listeners.

use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MockError;
use crate::future::{PendingFuture, pending};
use crate::injection::{Injected, InjectionRegistry};
use crate::scheduler::{AutoFlush, Operation, Scheduler};
use crate::time::Timer;

/// Scheduler plus override table for one mock subsystem.
#[derive(Debug)]
pub struct OperationFacade {
    scheduler: Scheduler,
    overrides: InjectionRegistry,
}

impl OperationFacade {
    #[must_use]
    pub fn new(timer: Rc<dyn Timer>) -> Self {
        Self {
            scheduler: Scheduler::new(timer),
            overrides: InjectionRegistry::new(),
        }
    }

    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub const fn overrides(&self) -> &InjectionRegistry {
        &self.overrides
    }

    /// Queue `operation`, settling with an override or `default`.
    ///
    /// Injected success values are deserialized into `T`; a value of the
    /// wrong shape rejects the future with `ResultMismatch`.
    pub fn defer<T, F>(
        &self,
        operation: &'static str,
        args: Vec<Value>,
        default: F,
    ) -> PendingFuture<T>
    where
        T: DeserializeOwned + 'static,
        F: FnOnce() -> Result<T, MockError> + 'static,
    {
        self.defer_with(
            operation,
            args,
            move |value| {
                serde_json::from_value(value).map_err(|e| MockError::ResultMismatch {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                })
            },
            default,
        )
    }

    /// Like [`defer`](Self::defer), with a custom conversion for injected values.
    pub fn defer_with<T, C, F>(
        &self,
        operation: &'static str,
        args: Vec<Value>,
        convert: C,
        default: F,
    ) -> PendingFuture<T>
    where
        T: 'static,
        C: FnOnce(Value) -> Result<T, MockError> + 'static,
        F: FnOnce() -> Result<T, MockError> + 'static,
    {
        let injected = self.overrides.consume(operation);
        let (settle, future) = pending(operation);

        self.scheduler.enqueue(Operation::new(operation, args, move || {
            let outcome = match injected {
                Some(Injected::Failure(error)) => Err(error),
                Some(Injected::Success(value)) => convert(value),
                None => default(),
            };
            if let Err(error) = &outcome {
                tracing::debug!(operation, code = error.code(), "operation rejected");
            }
            settle.settle(outcome);
        }));

        future
    }
}

/// Test-control surface shared by every mock subsystem.
///
/// Every method returns the subsystem so calls can be chained.
pub trait MockService {
    /// The facade backing this subsystem.
    fn facade(&self) -> &OperationFacade;

    /// Run every queued operation now.
    fn flush(&self) -> &Self {
        self.facade().scheduler().flush(None);
        self
    }

    /// Run every queued operation once `delay_ms` has elapsed on the timer.
    fn flush_after(&self, delay_ms: u64) -> &Self {
        self.facade().scheduler().flush(Some(delay_ms));
        self
    }

    /// Flush after every call, immediately (`true` / `0`) or after a delay.
    fn auto_flush(&self, mode: impl Into<AutoFlush>) -> &Self {
        self.facade().scheduler().auto_flush(mode);
        self
    }

    /// Make the next call of `operation` reject with `error`.
    fn fail_next(&self, operation: &str, error: impl Into<MockError>) -> &Self {
        self.facade().overrides().fail_next(operation, error);
        self
    }

    /// Make the next call of `operation` resolve with `value`.
    fn next_result(&self, operation: &str, value: impl Serialize) -> Result<&Self, MockError> {
        self.facade().overrides().next_result(operation, value)?;
        Ok(self)
    }

    /// Alias of [`next_result`](Self::next_result).
    fn respond_next(&self, operation: &str, value: impl Serialize) -> Result<&Self, MockError> {
        self.next_result(operation, value)
    }

    /// Observe the call arguments of every settled `operation`.
    fn on(&self, operation: &str, handler: impl Fn(&[Value]) + 'static) -> &Self {
        self.facade().scheduler().on(operation, handler);
        self
    }
}
