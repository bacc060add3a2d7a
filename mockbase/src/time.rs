//! Time source and timer abstractions for deterministic testing.
//!
//! The mocks never read the wall clock directly. Everything that needs "now"
//! goes through a [`TimeSource`], and everything that needs to run later goes
//! through a [`Timer`]. Production-like runs use [`TokioTimer`]; tests use
//! [`SimulatedTimer`](crate::simulation::SimulatedTimer) and advance time by hand.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A task scheduled to run once a timer fires.
pub type TimerTask = Box<dyn FnOnce()>;

/// Abstraction over time operations.
///
/// This trait allows swapping between real system time and simulated time
/// for deterministic testing.
pub trait TimeSource {
    /// Get the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// A time source that can also run a task after a delay.
///
/// Implementations must never run `task` synchronously from inside
/// `schedule`; callers rely on the task firing strictly later.
pub trait Timer: TimeSource {
    /// Run `task` once `delay_ms` milliseconds have elapsed.
    fn schedule(&self, delay_ms: u64, task: TimerTask);
}

/// Real time source using system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    #[allow(clippy::cast_possible_truncation)] // Milliseconds won't overflow u64 for billions of years
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_millis() as u64)
    }
}

/// Wall-clock timer backed by the tokio runtime.
///
/// Scheduled tasks are spawned with [`tokio::task::spawn_local`] because the
/// mocks are single-threaded and their tasks are not `Send`. Scheduling must
/// therefore happen inside a [`tokio::task::LocalSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl TimeSource for TokioTimer {
    fn now_ms(&self) -> u64 {
        SystemTimeSource.now_ms()
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay_ms: u64, task: TimerTask) {
        let _handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            task();
        });
    }
}
