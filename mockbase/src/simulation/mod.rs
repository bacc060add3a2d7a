//! Deterministic time for tests.
//!
//! Every mock takes its clock as an `Rc<dyn Timer>`. Handing the same
//! [`SimulatedTimer`] to several mocks puts them on one controlled clock:
//! delayed flushes and token validity windows only move when the test calls
//! [`SimulatedTimer::advance`] or [`SimulatedTimer::set`].
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//!
//! use mockbase::facade::MockService;
//! use mockbase::messaging::{Message, MockMessaging};
//! use mockbase::simulation::SimulatedTimer;
//!
//! let timer = Rc::new(SimulatedTimer::default_start());
//! let messaging = MockMessaging::with_timer(timer.clone());
//! let mut sent = messaging.send(&Message::for_topic("news"), false)?;
//!
//! messaging.flush_after(50);
//! assert!(sent.try_settled().is_none());
//! timer.advance(50);
//! assert!(sent.try_settled().is_some());
//! # Ok::<(), mockbase::error::MockError>(())
//! ```

mod time;

pub use time::SimulatedTimer;
