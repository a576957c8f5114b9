//! services/bot/src/adapters/slack.rs
//!
//! This module contains the adapter for Slack's `chat.postMessage` API.
//! It implements the `NotificationService` port from the `core` crate.

use async_trait::async_trait;
use attendance_core::{MessageId, NotificationService, OutboundMessage, PortError, PortResult};
use serde::{Deserialize, Serialize};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `NotificationService` port using the Slack Web API.
#[derive(Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl SlackNotifier {
    /// Creates a new `SlackNotifier`.
    pub fn new(client: reqwest::Client, api_base: String, token: String) -> Self {
        Self {
            client,
            api_base,
            token,
        }
    }
}

/// Slack error codes that mean the bot token itself was refused.
const AUTH_ERRORS: [&str; 5] = [
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

/// Maps the `error` field of an `ok: false` Web API answer to a port error.
pub(crate) fn api_error(code: Option<String>) -> PortError {
    let code = code.unwrap_or_else(|| "unknown_error".to_string());
    if AUTH_ERRORS.contains(&code.as_str()) {
        PortError::Unauthorized(code)
    } else {
        PortError::Rejected(code)
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize, Debug, PartialEq)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

/// Prefixes the text with a mention line when a mention id is given.
fn compose_text(message: &OutboundMessage) -> String {
    match &message.mention_id {
        Some(id) => format!("<@{}>\n{}", id, message.text),
        None => message.text.clone(),
    }
}

//=========================================================================================
// `NotificationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotificationService for SlackNotifier {
    async fn post(&self, message: &OutboundMessage) -> PortResult<MessageId> {
        let request = PostMessageRequest {
            channel: &message.channel_id,
            text: compose_text(message),
            thread_ts: message.thread_id.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let body: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match body {
            PostMessageResponse {
                ok: true,
                ts: Some(ts),
                ..
            } => Ok(ts),
            PostMessageResponse { ok: true, ts: None, .. } => Err(PortError::Unexpected(
                "chat.postMessage succeeded without a message ts".to_string(),
            )),
            PostMessageResponse { error, .. } => Err(api_error(error)),
        }
    }
}
