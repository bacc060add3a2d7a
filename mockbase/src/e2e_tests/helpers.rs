//! Common helpers for end-to-end tests.

use std::rc::Rc;

use futures::FutureExt;

use crate::auth::MockAuthentication;
use crate::config::MockConfig;
use crate::error::MockError;
use crate::firestore::MockCollection;
use crate::future::PendingFuture;
use crate::messaging::MockMessaging;
use crate::simulation::SimulatedTimer;
use crate::testing::init_tracing;

/// 2019-11-22T08:46:15.000Z
pub const START_MS: u64 = 1_574_412_375_000;

pub const HOUR_MS: u64 = 3_600_000;

/// Every subsystem on one simulated clock.
pub struct Harness {
    pub timer: Rc<SimulatedTimer>,
    pub auth: MockAuthentication,
    pub messaging: MockMessaging,
    pub users: MockCollection,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&MockConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &MockConfig) -> Self {
        init_tracing();
        let timer = Rc::new(SimulatedTimer::new(START_MS));
        Self {
            auth: MockAuthentication::with_config(config, timer.clone()),
            messaging: MockMessaging::with_config(config, timer.clone()),
            users: MockCollection::with_config("users", config, timer.clone())
                .expect("valid collection path"),
            timer,
        }
    }
}

/// The outcome of a future the test expects to have settled already.
pub fn settled<T>(future: PendingFuture<T>) -> Result<T, MockError> {
    future
        .now_or_never()
        .expect("operation should have settled")
}

/// Assert a future is still queued, handing it back.
pub fn still_pending<T>(mut future: PendingFuture<T>) -> PendingFuture<T> {
    assert!(
        future.try_settled().is_none(),
        "{} settled before its flush",
        future.operation()
    );
    future
}
