//! Deterministic deferred-execution engine.
//!
//! Every mock operation that would normally resolve over the network is
//! queued here as an [`Operation`] and only runs when the queue is flushed.
//!
//! # Flush semantics
//!
//! - `flush(None)` drains every queued operation synchronously, FIFO.
//! - `flush(Some(ms))` asks the [`Timer`] to drain after `ms`. Repeated delayed
//!   flushes are allowed; an operation only ever runs once because draining
//!   removes it from the queue.
//! - Operations enqueued while a pass is running are never picked up by that
//!   pass. If a flush is requested from inside a pass (directly, or through
//!   auto-flush), a fresh pass runs as soon as the current one returns.
//! - A panicking action is caught and logged; the rest of the pass still runs.
//!
//! # Invariants
//!
//! - Operations on one scheduler run in enqueue order.
//! - Each operation runs at most once and is dropped after running.
//! - Listeners for an operation run after its action, whatever the outcome.

mod listeners;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::time::Timer;

pub use listeners::{Listener, Listeners};

/// A queued unit of deferred work.
pub struct Operation {
    /// Settles the operation's future.
    pub action: Box<dyn FnOnce()>,
    /// Name of the facade method that created the operation.
    pub source_method: &'static str,
    /// Arguments of that call, delivered to listeners.
    pub source_args: Vec<Value>,
}

impl Operation {
    #[must_use]
    pub fn new(
        source_method: &'static str,
        source_args: Vec<Value>,
        action: impl FnOnce() + 'static,
    ) -> Self {
        Self {
            action: Box::new(action),
            source_method,
            source_args,
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("source_method", &self.source_method)
            .field("source_args", &self.source_args)
            .finish_non_exhaustive()
    }
}

/// Whether, and how, enqueueing triggers a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoFlush {
    /// Operations wait for an explicit flush.
    #[default]
    Off,
    /// Every enqueue drains the queue synchronously.
    Immediate,
    /// Every enqueue schedules a drain after the given milliseconds.
    Delayed(u64),
}

impl From<bool> for AutoFlush {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Immediate } else { Self::Off }
    }
}

impl From<u64> for AutoFlush {
    fn from(delay_ms: u64) -> Self {
        if delay_ms == 0 {
            Self::Immediate
        } else {
            Self::Delayed(delay_ms)
        }
    }
}

struct Inner {
    timer: Rc<dyn Timer>,
    queue: RefCell<VecDeque<Operation>>,
    listeners: RefCell<Listeners>,
    auto_flush: Cell<AutoFlush>,
    /// True while a drain pass is executing actions.
    draining: Cell<bool>,
    /// Set when a flush is requested during a pass.
    rerun_requested: Cell<bool>,
    /// Delayed drains handed to the timer that have not fired yet.
    pending_drains: Cell<usize>,
}

/// Handle to a deferred operation queue.
///
/// Cloning the handle shares the queue; each mock subsystem owns one queue and
/// hands clones to the objects (such as users) that enqueue on its behalf.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Scheduler {
    /// Create an empty scheduler driven by `timer`.
    #[must_use]
    pub fn new(timer: Rc<dyn Timer>) -> Self {
        Self {
            inner: Rc::new(Inner {
                timer,
                queue: RefCell::new(VecDeque::new()),
                listeners: RefCell::new(Listeners::new()),
                auto_flush: Cell::new(AutoFlush::Off),
                draining: Cell::new(false),
                rerun_requested: Cell::new(false),
                pending_drains: Cell::new(0),
            }),
        }
    }

    /// The timer driving delayed drains.
    #[must_use]
    pub fn timer(&self) -> &Rc<dyn Timer> {
        &self.inner.timer
    }

    /// Current time according to the scheduler's timer.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.inner.timer.now_ms()
    }

    /// Append an operation to the queue.
    ///
    /// With auto-flush enabled this also triggers a flush.
    pub fn enqueue(&self, operation: Operation) {
        tracing::debug!(
            operation = operation.source_method,
            queued = self.len() + 1,
            "enqueued deferred operation"
        );
        self.inner.queue.borrow_mut().push_back(operation);

        match self.inner.auto_flush.get() {
            AutoFlush::Off => {}
            AutoFlush::Immediate => {
                self.flush(None);
            }
            AutoFlush::Delayed(delay_ms) => {
                self.flush(Some(delay_ms));
            }
        }
    }

    /// Drain the queue now (`None` or `Some(0)`) or after `delay_ms`.
    ///
    /// Returns the number of operations executed synchronously, which is
    /// always zero for a delayed flush.
    pub fn flush(&self, delay_ms: Option<u64>) -> usize {
        match delay_ms {
            None | Some(0) => self.drain(),
            Some(delay_ms) => {
                self.schedule_drain(delay_ms);
                0
            }
        }
    }

    /// Configure auto-flush for subsequent enqueues.
    pub fn auto_flush(&self, mode: impl Into<AutoFlush>) {
        let mode = mode.into();
        tracing::debug!(?mode, "auto-flush changed");
        self.inner.auto_flush.set(mode);
    }

    /// Current auto-flush mode.
    #[must_use]
    pub fn auto_flush_mode(&self) -> AutoFlush {
        self.inner.auto_flush.get()
    }

    /// Register a listener for settlements of `operation`.
    pub fn on(&self, operation: &str, handler: impl Fn(&[Value]) + 'static) {
        self.inner
            .listeners
            .borrow_mut()
            .on(operation, Rc::new(handler));
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Number of delayed drains that have not fired yet.
    #[must_use]
    pub fn pending_drains(&self) -> usize {
        self.inner.pending_drains.get()
    }

    fn schedule_drain(&self, delay_ms: u64) {
        let inner = &self.inner;
        inner.pending_drains.set(inner.pending_drains.get() + 1);

        let weak: Weak<Inner> = Rc::downgrade(inner);
        inner.timer.schedule(
            delay_ms,
            Box::new(move || {
                // The scheduler may be gone by the time the timer fires.
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner
                    .pending_drains
                    .set(inner.pending_drains.get().saturating_sub(1));
                Self { inner }.drain();
            }),
        );
        tracing::debug!(delay_ms, "scheduled delayed drain");
    }

    /// Run drain passes until no flush was requested during the last one.
    fn drain(&self) -> usize {
        let inner = &self.inner;
        if inner.draining.get() {
            inner.rerun_requested.set(true);
            return 0;
        }

        inner.draining.set(true);
        let mut executed = 0;
        loop {
            // Snapshot the queue: anything enqueued from here on waits for
            // the next pass.
            let batch = std::mem::take(&mut *inner.queue.borrow_mut());
            if !batch.is_empty() {
                tracing::debug!(operations = batch.len(), "draining deferred queue");
            }
            for operation in batch {
                self.execute(operation);
                executed += 1;
            }
            if !inner.rerun_requested.replace(false) {
                break;
            }
        }
        inner.draining.set(false);
        executed
    }

    fn execute(&self, operation: Operation) {
        let Operation {
            action,
            source_method,
            source_args,
        } = operation;

        if catch_unwind(AssertUnwindSafe(action)).is_err() {
            tracing::error!(
                operation = source_method,
                "deferred action panicked; continuing flush"
            );
        }

        let handlers = self.inner.listeners.borrow().handlers_for(source_method);
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&source_args))).is_err() {
                tracing::error!(
                    operation = source_method,
                    "listener panicked; continuing flush"
                );
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.len())
            .field("auto_flush", &self.inner.auto_flush.get())
            .field("pending_drains", &self.inner.pending_drains.get())
            .finish_non_exhaustive()
    }
}
