//! Batch dispatcher for the Todoist Sync API command queue.
//!
//! A batch is one HTTP request carrying many commands. Each command carries a
//! fresh UUID; the response reports a status per UUID, and a real ID for
//! every `temp_id` a create command declared.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use super::error::{ApiError, ApiResult};
use super::http;
use super::rate_limiter::RateLimiter;

pub const DEFAULT_SYNC_URL: &str = "https://api.todoist.com/api/v1/sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    ItemAdd,
    ItemClose,
    ItemMove,
    ItemUpdate,
}

impl CommandKind {
    pub fn creates(&self) -> bool {
        matches!(self, CommandKind::ItemAdd)
    }
}

/// One queued mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub uuid: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
    pub args: Map<String, Value>,
}

impl Command {
    /// A command with a fresh correlation UUID. Create commands also get a
    /// fresh `temp_id` so later commands in the batch can reference them.
    pub fn new(kind: CommandKind, args: Map<String, Value>) -> Self {
        Self {
            kind,
            uuid: Uuid::new_v4(),
            temp_id: kind.creates().then(|| Uuid::new_v4().to_string()),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandError {
    pub error: String,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// Per-command outcome. The wire form is the string `"ok"` or an error object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawStatus")]
pub enum CommandStatus {
    Ok,
    Failed(CommandError),
}

impl CommandStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CommandStatus::Ok)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Text(String),
    Error(CommandError),
    Other(Value),
}

impl From<RawStatus> for CommandStatus {
    fn from(raw: RawStatus) -> Self {
        match raw {
            RawStatus::Text(text) if text == "ok" => CommandStatus::Ok,
            RawStatus::Text(text) => CommandStatus::Failed(CommandError {
                error: text,
                error_code: None,
            }),
            RawStatus::Error(err) => CommandStatus::Failed(err),
            RawStatus::Other(value) => CommandStatus::Failed(CommandError {
                error: value.to_string(),
                error_code: None,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchResult {
    /// Keyed by command UUID as sent. Kept as text so one odd key cannot
    /// sink the whole response.
    #[serde(default)]
    pub sync_status: HashMap<String, CommandStatus>,
    #[serde(default)]
    pub temp_id_mapping: HashMap<String, String>,
}

impl BatchResult {
    pub fn status(&self, command: &Command) -> Option<&CommandStatus> {
        self.sync_status.get(&command.uuid.to_string())
    }

    pub fn succeeded(&self, command: &Command) -> bool {
        self.status(command).is_some_and(CommandStatus::is_ok)
    }

    /// Server-assigned ID for a create command, if it succeeded.
    pub fn resolved_id(&self, command: &Command) -> Option<&str> {
        command
            .temp_id
            .as_ref()
            .and_then(|temp| self.temp_id_mapping.get(temp))
            .map(String::as_str)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Submit all `commands` in one request, consuming one rate-limit slot.
    async fn submit(&self, ct: &CancellationToken, commands: Vec<Command>) -> ApiResult<BatchResult>;
}

#[derive(Clone)]
pub struct SyncClient {
    http: Client,
    url: String,
    token: String,
    limiter: Arc<RateLimiter>,
}

impl SyncClient {
    pub fn new(
        http: Client,
        url: impl Into<String>,
        token: impl Into<String>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            token: token.into(),
            limiter,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BatchApi for SyncClient {
    #[instrument(skip(self, ct, commands), fields(commands = commands.len()))]
    async fn submit(&self, ct: &CancellationToken, commands: Vec<Command>) -> ApiResult<BatchResult> {
        if commands.is_empty() {
            return Err(ApiError::invalid("a batch needs at least one command"));
        }

        self.limiter.try_admit()?;

        let encoded = serde_json::to_string(&commands).map_err(|e| {
            ApiError::invalid(format!("failed to encode commands: {e}"))
        })?;
        debug!(count = commands.len(), "todoist sync request");

        // .form() sets Content-Type: application/x-www-form-urlencoded
        let request = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .form(&[("commands", encoded)]);

        let body = http::execute(ct, request).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
