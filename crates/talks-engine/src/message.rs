//! Conversation messages.

use serde::{Deserialize, Serialize};

/// A single rendered turn of the conversation.
///
/// Messages are immutable once appended to a [`Transcript`](crate::Transcript).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Participant name or role (e.g. "Moderator", "Model A").
    pub speaker: String,
    /// Content of the turn. Untrusted: sanitize before rendering.
    pub text: String,
    /// Generator that produced the turn, absent for non-generated turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Message {
    /// Create a message without a model label.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            model: None,
        }
    }

    /// Attach the model label.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Header shown above the message body, e.g. `Model A (llama3)`.
    pub fn header(&self) -> String {
        match &self.model {
            Some(model) => format!("{} ({model})", self.speaker),
            None => self.speaker.clone(),
        }
    }
}
