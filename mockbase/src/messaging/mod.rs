//! Cloud messaging mock.
//!
//! `send`, `send_all` and `send_multicast` validate their arguments, queue an
//! operation and return a pending future. Unless a result was injected, a
//! flush resolves them with freshly generated message ids and all-successful
//! batch responses.

mod types;

use std::rc::Rc;

use serde_json::{Value, json};

use crate::config::MockConfig;
use crate::error::MockError;
use crate::facade::{MockService, OperationFacade};
use crate::future::PendingFuture;
use crate::ids::IdGenerator;
use crate::time::{Timer, TokioTimer};

pub use types::{
    BatchResponse, MAX_BATCH_SIZE, Message, MulticastMessage, Notification, SendResponse,
};

/// Mock of the messaging service.
#[derive(Debug)]
pub struct MockMessaging {
    facade: OperationFacade,
    ids: Rc<IdGenerator>,
}

impl MockMessaging {
    /// Mock driven by the wall clock. Delayed flushes need a tokio `LocalSet`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timer(Rc::new(TokioTimer))
    }

    #[must_use]
    pub fn with_timer(timer: Rc<dyn Timer>) -> Self {
        Self::with_config(&MockConfig::default(), timer)
    }

    #[must_use]
    pub fn with_config(config: &MockConfig, timer: Rc<dyn Timer>) -> Self {
        let facade = OperationFacade::new(timer);
        facade.scheduler().auto_flush(config.auto_flush);
        Self {
            facade,
            ids: Rc::new(config.id_generator()),
        }
    }

    /// Send one message. Resolves with its message id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the message names more than one target.
    pub fn send(&self, message: &Message, dry_run: bool) -> Result<PendingFuture<String>, MockError> {
        message.validate("send")?;
        let ids = Rc::clone(&self.ids);
        let timer = Rc::clone(self.facade.scheduler().timer());
        Ok(self
            .facade
            .defer("send", args(message, dry_run), move || {
                Ok(ids.next_id(timer.now_ms()))
            }))
    }

    /// Send up to [`MAX_BATCH_SIZE`] messages in one call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for too many messages or any invalid one.
    pub fn send_all(
        &self,
        messages: &[Message],
        dry_run: bool,
    ) -> Result<PendingFuture<BatchResponse>, MockError> {
        if messages.len() > MAX_BATCH_SIZE {
            return Err(MockError::invalid_argument(
                "sendAll",
                format!("messages must not contain more than {MAX_BATCH_SIZE} items"),
            ));
        }
        for message in messages {
            message.validate("sendAll")?;
        }
        let count = messages.len();
        let ids = Rc::clone(&self.ids);
        let timer = Rc::clone(self.facade.scheduler().timer());
        Ok(self
            .facade
            .defer("sendAll", args(&messages, dry_run), move || {
                Ok(delivered_batch(&ids, timer.now_ms(), count))
            }))
    }

    /// Send one payload to every token of `message`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless there are 1 to [`MAX_BATCH_SIZE`]
    /// non-empty tokens.
    pub fn send_multicast(
        &self,
        message: &MulticastMessage,
        dry_run: bool,
    ) -> Result<PendingFuture<BatchResponse>, MockError> {
        message.validate("sendMulticast")?;
        let count = message.tokens.len();
        let ids = Rc::clone(&self.ids);
        let timer = Rc::clone(self.facade.scheduler().timer());
        Ok(self
            .facade
            .defer("sendMulticast", args(message, dry_run), move || {
                Ok(delivered_batch(&ids, timer.now_ms(), count))
            }))
    }
}

impl Default for MockMessaging {
    fn default() -> Self {
        Self::new()
    }
}

impl MockService for MockMessaging {
    fn facade(&self) -> &OperationFacade {
        &self.facade
    }
}

fn args(payload: &impl serde::Serialize, dry_run: bool) -> Vec<Value> {
    vec![serde_json::to_value(payload).unwrap_or_default(), json!(dry_run)]
}

fn delivered_batch(ids: &IdGenerator, now_ms: u64, count: usize) -> BatchResponse {
    BatchResponse::from_responses(
        (0..count)
            .map(|_| SendResponse::delivered(ids.next_id(now_ms)))
            .collect(),
    )
}
