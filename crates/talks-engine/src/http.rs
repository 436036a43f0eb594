//! JSON-over-HTTP client for the turn service.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST /api/start {topic, model_a?, model_b?}` → `{history: [message, ...]}`
//! - `POST /api/next {}` → `message | {error}`
//! - `POST /api/reset {}` → ack

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::message::Message;
use crate::service::{ServiceError, StartRequest, TurnReply, TurnService};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StartResponse {
    Rejected { error: String },
    Started { history: Vec<Message> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NextResponse {
    Rejected { error: String },
    Turn(Message),
}

/// [`TurnService`] backed by the conversation server's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTurnService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTurnService {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{name}", self.base_url)
    }

    /// POST a JSON body and return the status and raw response text.
    async fn post(
        &self,
        name: &str,
        body: &impl serde::Serialize,
    ) -> Result<(reqwest::StatusCode, String), ServiceError> {
        let url = self.endpoint(name);
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%url, status = status.as_u16(), bytes = text.len(), "response");
        Ok((status, text))
    }
}

/// Interpret a body, falling back to a status error when a failed
/// response carries something other than the expected JSON.
fn decode<T: serde::de::DeserializeOwned>(
    status: reqwest::StatusCode,
    body: String,
) -> Result<T, ServiceError> {
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(ServiceError::Decode(e)),
    }
}

#[async_trait]
impl TurnService for HttpTurnService {
    async fn initialize(&self, request: &StartRequest) -> Result<Vec<Message>, ServiceError> {
        let (status, body) = self.post("start", request).await?;
        match decode(status, body)? {
            StartResponse::Started { history } => Ok(history),
            StartResponse::Rejected { error } => Err(ServiceError::Rejected(error)),
        }
    }

    async fn next_turn(&self) -> Result<TurnReply, ServiceError> {
        let (status, body) = self.post("next", &serde_json::json!({})).await?;
        // The server reports failures as {error} with a 4xx/5xx status; the
        // payload, not the status, decides.
        match decode(status, body)? {
            NextResponse::Turn(message) => Ok(TurnReply::Message(message)),
            NextResponse::Rejected { error } => Ok(TurnReply::Error(error)),
        }
    }

    async fn reset_session(&self) -> Result<(), ServiceError> {
        let (status, body) = self.post("reset", &serde_json::json!({})).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
