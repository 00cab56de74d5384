use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::SlackConfig;
use crate::error::{Error, Result};
use crate::moderation::DeleteCommand;

/// `error` codes from `rtm.connect` that mean the token itself is bad.
const AUTH_ERRORS: &[&str] = &[
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

/// The bot's own user, as reported by `rtm.connect`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelfIdentity {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RtmConnection {
    pub url: String,
    #[serde(rename = "self")]
    pub identity: SelfIdentity,
}

/// The Web API methods the bot relies on.
#[async_trait]
pub trait SlackMethods: Send + Sync {
    /// Ask for a fresh RTM WebSocket URL.
    async fn rtm_connect(&self) -> Result<RtmConnection>;

    /// `chat.delete`
    async fn delete_message(&self, command: &DeleteCommand) -> Result<()>;
}

/// Thin Slack Web API client: every method is a JSON POST to
/// `{api_url}/{method}` with the bearer token.
pub struct SlackClient {
    client: reqwest::Client,
    config: SlackConfig,
}

impl SlackClient {
    pub fn new(config: SlackConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Invoke any Web API method and return the response body when `ok` is
    /// true. Everything else becomes [`Error::RemoteCall`].
    pub async fn execute_method(&self, method: &str, params: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.config.api_url, method);

        debug!("Calling Slack method: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(params)
            .send()
            .await
            .map_err(|e| Error::remote_call(method, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Error::remote_call(
                method,
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::remote_call(method, format!("invalid response: {}", e)))?;

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(Error::remote_call(method, error));
        }

        Ok(body)
    }
}

#[async_trait]
impl SlackMethods for SlackClient {
    async fn rtm_connect(&self) -> Result<RtmConnection> {
        if self.config.api_token.trim().is_empty() {
            return Err(Error::Authentication("no API token configured".to_string()));
        }

        let body = match self.execute_method("rtm.connect", &json!({})).await {
            Ok(body) => body,
            Err(Error::RemoteCall { error, .. }) if AUTH_ERRORS.contains(&error.as_str()) => {
                return Err(Error::Authentication(error));
            }
            Err(Error::RemoteCall { error, .. }) => return Err(Error::Connection(error)),
            Err(other) => return Err(other),
        };

        serde_json::from_value(body)
            .map_err(|e| Error::Connection(format!("unexpected rtm.connect response: {}", e)))
    }

    async fn delete_message(&self, command: &DeleteCommand) -> Result<()> {
        self.execute_method(
            "chat.delete",
            &json!({ "channel": command.channel, "ts": command.ts }),
        )
        .await
        .map(|_| ())
    }
}
