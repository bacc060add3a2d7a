//! Per-operation observation hooks.
//!
//! Tests register a handler for an operation name and receive the raw call
//! arguments each time an operation with that name settles.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

/// A listener receiving an operation's call arguments.
pub type Listener = Rc<dyn Fn(&[Value])>;

/// Listeners keyed by operation name, in registration order.
#[derive(Default)]
pub struct Listeners {
    handlers: HashMap<String, Vec<Listener>>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `operation`.
    pub fn on(&mut self, operation: &str, handler: Listener) {
        self.handlers
            .entry(operation.to_string())
            .or_default()
            .push(handler);
    }

    /// Snapshot of the handlers for `operation`.
    ///
    /// Callers invoke the returned handlers after releasing any borrow on the
    /// table, so a handler may register further listeners.
    #[must_use]
    pub fn handlers_for(&self, operation: &str) -> Vec<Listener> {
        self.handlers.get(operation).cloned().unwrap_or_default()
    }

    /// Number of handlers registered for `operation`.
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        self.handlers.get(operation).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .handlers
            .iter()
            .map(|(name, handlers)| (name.as_str(), handlers.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("Listeners").field("handlers", &counts).finish()
    }
}
