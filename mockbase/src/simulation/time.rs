//! Simulated timer for deterministic testing.
//!
//! This module provides a controlled clock that allows tests to advance time
//! explicitly. Tasks scheduled through [`Timer::schedule`] only fire while
//! [`SimulatedTimer::advance`] walks the clock past their deadline.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::time::{TimeSource, Timer, TimerTask};

/// A simulated clock with a manual task wheel.
///
/// Unlike [`TokioTimer`](crate::time::TokioTimer), this implementation does
/// not use the real system clock. Time only advances when explicitly told to,
/// making tests fully deterministic.
///
/// # Thread Safety
///
/// This implementation uses [`Cell`] and [`RefCell`] for interior mutability,
/// making it single-threaded only. The mocks run everything on one thread
/// anyway, so this is fine. Share it between mocks with an `Rc`.
///
/// # Example
///
/// ```
/// use mockbase::simulation::SimulatedTimer;
/// use mockbase::time::TimeSource;
///
/// let timer = SimulatedTimer::new(1000);
/// assert_eq!(timer.now_ms(), 1000);
///
/// timer.advance(100);
/// assert_eq!(timer.now_ms(), 1100);
/// ```
pub struct SimulatedTimer {
    /// Current simulated time in milliseconds since Unix epoch.
    current_time_ms: Cell<u64>,
    /// Scheduled tasks keyed by `(deadline, sequence)`.
    tasks: RefCell<BTreeMap<(u64, u64), TimerTask>>,
    /// Tie-breaker so tasks with equal deadlines fire in scheduling order.
    next_sequence: Cell<u64>,
}

impl SimulatedTimer {
    /// Create a new simulated timer with the given initial time.
    ///
    /// # Arguments
    ///
    /// * `initial_time_ms` - The initial time in milliseconds since Unix epoch.
    ///   A reasonable default is around `1_700_000_000_000` (late 2023).
    #[must_use]
    pub const fn new(initial_time_ms: u64) -> Self {
        Self {
            current_time_ms: Cell::new(initial_time_ms),
            tasks: RefCell::new(BTreeMap::new()),
            next_sequence: Cell::new(0),
        }
    }

    /// Create a new simulated timer starting at a reasonable default time.
    ///
    /// Uses `1_700_000_000_000` (approximately November 2023) as the starting point.
    #[must_use]
    pub const fn default_start() -> Self {
        Self::new(1_700_000_000_000)
    }

    /// Advance time by the given number of milliseconds, firing due tasks.
    ///
    /// Tasks fire in deadline order. While a task runs the clock reads exactly
    /// its deadline, so a task that schedules more work sees consistent time.
    /// Tasks scheduled during the advance fire too if they fall inside the
    /// window. Returns the number of tasks fired.
    ///
    /// Time saturates at `u64::MAX` if overflow would occur.
    pub fn advance(&self, ms: u64) -> usize {
        let target = self.current_time_ms.get().saturating_add(ms);
        let mut fired = 0;

        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                let due = tasks
                    .first_key_value()
                    .is_some_and(|(&(deadline, _), _)| deadline <= target);
                if due { tasks.pop_first() } else { None }
            };
            let Some(((deadline, _), task)) = next else {
                break;
            };

            if deadline > self.current_time_ms.get() {
                self.current_time_ms.set(deadline);
            }
            task();
            fired += 1;
        }

        self.current_time_ms.set(target);
        fired
    }

    /// Set the current time to a specific value without firing tasks.
    ///
    /// Note: This can move time backwards, which lets tests construct tokens
    /// that appear to come from the future. Prefer `advance` for normal testing.
    pub fn set(&self, time_ms: u64) {
        self.current_time_ms.set(time_ms);
    }

    /// Get the current simulated time without advancing it.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current_time_ms.get()
    }

    /// Number of tasks waiting for their deadline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl TimeSource for SimulatedTimer {
    fn now_ms(&self) -> u64 {
        self.current_time_ms.get()
    }
}

impl Timer for SimulatedTimer {
    fn schedule(&self, delay_ms: u64, task: TimerTask) {
        let deadline = self.current_time_ms.get().saturating_add(delay_ms);
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);
        self.tasks.borrow_mut().insert((deadline, sequence), task);
    }
}

impl Default for SimulatedTimer {
    fn default() -> Self {
        Self::default_start()
    }
}

impl std::fmt::Debug for SimulatedTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedTimer")
            .field("current_time_ms", &self.current_time_ms.get())
            .field("pending", &self.pending())
            .finish()
    }
}
