//! Settlement handles for deferred operations.
//!
//! A facade call creates a [`Settle`] / [`PendingFuture`] pair. The `Settle`
//! half is captured by the operation queued on the scheduler; the future is
//! handed to the caller. Exactly one operation settles exactly one future,
//! exactly once: `Settle` is consumed by `resolve` / `reject`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::error::MockError;

/// The caller's side of a deferred operation.
///
/// Resolves once the scheduler runs the operation. Poll it from any executor,
/// or check it synchronously after a flush with
/// [`FutureExt::now_or_never`](futures::FutureExt::now_or_never).
#[derive(Debug)]
#[must_use = "a pending future does nothing unless awaited or inspected"]
pub struct PendingFuture<T> {
    operation: &'static str,
    receiver: oneshot::Receiver<Result<T, MockError>>,
    taken: bool,
}

/// The operation's side of a deferred operation.
#[derive(Debug)]
pub struct Settle<T> {
    operation: &'static str,
    sender: oneshot::Sender<Result<T, MockError>>,
}

/// Create a linked settle handle and pending future for `operation`.
pub fn pending<T>(operation: &'static str) -> (Settle<T>, PendingFuture<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        Settle { operation, sender },
        PendingFuture {
            operation,
            receiver,
            taken: false,
        },
    )
}

impl<T> PendingFuture<T> {
    /// Name of the operation this future belongs to.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Take the outcome if the operation has already settled.
    ///
    /// Returns `None` while the operation is still queued. After an outcome
    /// has been returned once, later calls return `None` again.
    pub fn try_settled(&mut self) -> Option<Result<T, MockError>> {
        if self.taken {
            return None;
        }
        let outcome = match self.receiver.try_recv() {
            Ok(outcome) => outcome?,
            Err(oneshot::Canceled) => Err(MockError::Abandoned {
                operation: self.operation.to_string(),
            }),
        };
        self.taken = true;
        Some(outcome)
    }
}

impl<T> Future for PendingFuture<T> {
    type Output = Result<T, MockError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        Pin::new(&mut self.receiver).poll(cx).map(|outcome| {
            outcome.unwrap_or_else(|oneshot::Canceled| {
                Err(MockError::Abandoned {
                    operation: operation.to_string(),
                })
            })
        })
    }
}

impl<T> Settle<T> {
    /// Name of the operation being settled.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Settle the future with a value.
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Settle the future with an error.
    pub fn reject(self, error: MockError) {
        self.settle(Err(error));
    }

    /// Settle the future with an outcome.
    pub fn settle(self, outcome: Result<T, MockError>) {
        if self.sender.send(outcome).is_err() {
            tracing::debug!(
                operation = self.operation,
                "settled an operation whose future was already dropped"
            );
        }
    }
}
