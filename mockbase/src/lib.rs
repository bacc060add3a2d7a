#![cfg_attr(
    test,
    allow(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used
    )
)]
// Life of a mock call:
// 1. A facade method (send, createUser, set, ...) validates its arguments
//    and fails synchronously if they are bad
// 2. A one-shot override registered for the operation name is consumed
// 3. The operation is queued on the subsystem's scheduler and a pending
//    future is returned
// 4. flush() (immediate, delayed or automatic) runs the queue in FIFO order:
//     - Listeners registered for the operation see its arguments
//     - The future settles with the override or the default result
//
// System components:
//  - Scheduler and timers
//  - Injection registry
//  - Subsystem mocks: auth, firestore, messaging

pub mod auth;
pub mod config;
pub mod error;
pub mod facade;
pub mod firestore;
pub mod future;
pub mod ids;
pub mod injection;
pub mod messaging;
pub mod scheduler;
pub mod simulation;
pub mod testing;
pub mod time;


pub use auth::{MockAuthentication, MockUser};
pub use config::MockConfig;
pub use error::MockError;
pub use facade::MockService;
pub use firestore::MockCollection;
pub use future::PendingFuture;
pub use messaging::MockMessaging;
pub use scheduler::{AutoFlush, Scheduler};
