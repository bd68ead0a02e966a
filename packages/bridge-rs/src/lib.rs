// HTTP client for the device bridge that hosts the chat-network session.
//
// The bridge owns the browser/multi-device session and its credential cache;
// this crate only starts, polls, drives and destroys it.

pub mod models;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::json;

use crate::models::{BridgeEvent, SentMessage, SessionInfo};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("request to bridge failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("bridge returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub base_url: String,
    pub api_key: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub struct BridgeService {
    options: BridgeOptions,
    client: Client,
}

impl BridgeService {
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.options.session_id
    }

    /// Start (or resume from the bridge's credential cache) the session.
    pub async fn start_session(&self) -> Result<SessionInfo, BridgeError> {
        let url = format!("{}/sessions", self.base_url());

        let request = self
            .client
            .post(url)
            .json(&json!({ "sessionId": self.options.session_id }));

        let response = self.send(request).await?;
        Ok(response.json::<SessionInfo>().await?)
    }

    /// Destroy the session. A session the bridge no longer knows about counts as destroyed.
    pub async fn destroy_session(&self) -> Result<(), BridgeError> {
        let url = format!(
            "{}/sessions/{}",
            self.base_url(),
            self.options.session_id
        );

        match self.send(self.client.delete(url)).await {
            Ok(_) => Ok(()),
            Err(BridgeError::Status { status: 404, .. }) => {
                tracing::debug!(session_id = %self.options.session_id, "bridge session already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn send_message(&self, chat_id: &str, body: &str) -> Result<SentMessage, BridgeError> {
        let url = format!(
            "{}/sessions/{}/messages",
            self.base_url(),
            self.options.session_id
        );

        let request = self
            .client
            .post(url)
            .json(&json!({ "chatId": chat_id, "body": body }));

        let response = self.send(request).await?;
        Ok(response.json::<SentMessage>().await?)
    }

    /// Fetch session events with a sequence number greater than `after`.
    pub async fn poll_events(&self, after: u64) -> Result<Vec<BridgeEvent>, BridgeError> {
        let url = format!(
            "{}/sessions/{}/events",
            self.base_url(),
            self.options.session_id
        );

        let request = self.client.get(url).query(&[("after", after)]);

        let response = self.send(request).await?;
        Ok(response.json::<Vec<BridgeEvent>>().await?)
    }

    fn base_url(&self) -> &str {
        self.options.base_url.trim_end_matches('/')
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, BridgeError> {
        let request = match &self.options.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "bridge returned an error");
        Err(BridgeError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl BridgeError {
    /// True when the bridge answered but refused the request (as opposed to being unreachable).
    pub fn is_rejection(&self) -> bool {
        matches!(self, BridgeError::Status { status, .. } if *status < StatusCode::INTERNAL_SERVER_ERROR.as_u16())
    }
}
