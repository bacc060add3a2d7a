//! Message payloads and send responses.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MockError;

/// Most messages one batch call may carry.
pub const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A message for one device token, topic or condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, String>,
}

impl Message {
    #[must_use]
    pub fn for_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn notification(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.notification = Some(Notification {
            title: Some(title.into()),
            body: Some(body.into()),
            image_url: None,
        });
        self
    }

    #[must_use]
    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Check the target fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if more than one target is set, a target is
    /// empty, or the topic name has characters outside `[A-Za-z0-9-_.~%]`.
    pub fn validate(&self, operation: &str) -> Result<(), MockError> {
        let targets = [&self.token, &self.topic, &self.condition];
        if targets.iter().filter(|target| target.is_some()).count() > 1 {
            return Err(MockError::invalid_argument(
                operation,
                "a message must specify at most one of token, topic or condition",
            ));
        }
        if targets.iter().any(|target| target.as_deref() == Some("")) {
            return Err(MockError::invalid_argument(operation, "message target must not be empty"));
        }
        if let Some(topic) = &self.topic {
            let name = topic.strip_prefix("/topics/").unwrap_or(topic);
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_.~%".contains(c));
            if !valid {
                return Err(MockError::invalid_argument(
                    operation,
                    format!("malformed topic name '{topic}'"),
                ));
            }
        }
        Ok(())
    }
}

/// One payload sent to many device tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, String>,
}

impl MulticastMessage {
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` unless there are 1 to [`MAX_BATCH_SIZE`]
    /// tokens, none of them empty.
    pub fn validate(&self, operation: &str) -> Result<(), MockError> {
        if self.tokens.is_empty() {
            return Err(MockError::invalid_argument(operation, "tokens must not be empty"));
        }
        if self.tokens.len() > MAX_BATCH_SIZE {
            return Err(MockError::invalid_argument(
                operation,
                format!("tokens must not contain more than {MAX_BATCH_SIZE} items"),
            ));
        }
        if self.tokens.iter().any(String::is_empty) {
            return Err(MockError::invalid_argument(operation, "tokens must not contain empty strings"));
        }
        Ok(())
    }
}

/// Outcome of one message within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResponse {
    #[must_use]
    pub const fn delivered(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    #[must_use]
    pub const fn failed(error: String) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error),
        }
    }
}

/// Result of a batch send.
///
/// # Invariants
///
/// `success_count + failure_count == responses.len()` for every response
/// built through [`BatchResponse::from_responses`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    #[must_use]
    pub fn from_responses(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }
}
