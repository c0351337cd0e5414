//! MCP tool implementations
//!
//! Each module adds one `impl McpServer` block with its own router:
//! tasks, bulk, projects, sections, labels, comments.

mod bulk;
mod comments;
mod labels;
mod projects;
mod sections;
mod tasks;

#[cfg(test)]
mod tasks_test;

pub use bulk::{BulkCompleteParams, BulkCreateParams, BulkMoveParams};
pub use tasks::{DurationUnit, TaskStats};

use bytes::Bytes;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::todoist::{ApiError, ApiResult, decode_list};

/// Render a tool outcome as MCP content.
///
/// Backend failures never surface as protocol errors: they become an error
/// result carrying `failed to <action>: <reason>`. Argument errors are
/// reported as-is.
pub(crate) fn respond<T: Serialize>(
    action: &str,
    result: ApiResult<T>,
) -> Result<CallToolResult, McpError> {
    let text = result.and_then(|value| Ok(serde_json::to_string_pretty(&value)?));

    Ok(match text {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(ApiError::InvalidArgument(message)) => {
            CallToolResult::error(vec![Content::text(message)])
        }
        Err(e) => {
            warn!(action, error = %e, "tool call failed");
            CallToolResult::error(vec![Content::text(format!("failed to {action}: {e}"))])
        }
    })
}

/// `{"count": n, <key>: [...]}` from a list response body.
pub(crate) fn listing(key: &str, body: &Bytes) -> ApiResult<Value> {
    let items = decode_list(body)?;
    Ok(json!({ "count": items.len(), (key): items }))
}

/// Confirmation for mutations whose response has no body.
pub(crate) fn acknowledged(id_field: &str, id: &str, message: &str) -> Value {
    json!({ "success": true, (id_field): id, "message": message })
}

/// JSON request body that skips absent and empty fields.
#[derive(Debug, Default)]
pub(crate) struct Body(Map<String, Value>);

impl Body {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn text(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.0.insert(key.to_string(), Value::from(value));
        }
        self
    }

    pub(crate) fn field(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.into());
        }
        self
    }

    pub(crate) fn list(self, key: &str, value: Option<Vec<String>>) -> Self {
        self.field(key, value.filter(|v| !v.is_empty()))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject an update that would change nothing.
    pub(crate) fn require_any(self) -> ApiResult<Value> {
        if self.is_empty() {
            return Err(ApiError::invalid(
                "at least one field to update must be provided",
            ));
        }
        Ok(self.into_value())
    }

    pub(crate) fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

pub(crate) fn required<'a>(value: &'a str, field: &str) -> ApiResult<&'a str> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(format!("{field} is required")));
    }
    Ok(value)
}
