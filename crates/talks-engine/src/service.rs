//! Remote turn-generation service.
//!
//! The service owns the conversation on its side: it knows whose turn it is
//! and what has been said. The client only opens a session with a topic,
//! asks for the next turn, and discards the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Body of the initialization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub topic: String,
    /// Override for the first participant's model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_a: Option<String>,
    /// Override for the second participant's model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_b: Option<String>,
}

impl StartRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            model_a: None,
            model_b: None,
        }
    }
}

/// Answer to a turn request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    /// The next turn.
    Message(Message),
    /// The service declined to produce a turn.
    Error(String),
}

/// A network-fallible, one-call-at-a-time turn generator.
#[async_trait]
pub trait TurnService: Send + Sync {
    /// Open a session and return the initial context (e.g. a moderator line).
    async fn initialize(&self, request: &StartRequest) -> Result<Vec<Message>, ServiceError>;

    /// Produce the next turn.
    async fn next_turn(&self) -> Result<TurnReply, ServiceError>;

    /// Discard the session.
    async fn reset_session(&self) -> Result<(), ServiceError>;
}

/// Errors talking to the turn service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport or HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with a body that could not be interpreted.
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not what the contract describes.
    #[error("Invalid response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The server answered with an explicit error payload.
    #[error("Server rejected request: {0}")]
    Rejected(String),

    /// Service could not be reached for another reason.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}
