//! MCP tools for personal labels.

use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::{self, JsonSchema},
    tool, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Body, acknowledged, listing, required, respond};
use crate::mcp::McpServer;
use crate::todoist::{Idempotency, decode};
use crate::validation::ValidId;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateLabelParams {
    #[schemars(description = "Label name")]
    pub name: String,
    #[schemars(description = "Label color (e.g., 'red', 'blue', 'green')")]
    pub color: Option<String>,
    #[schemars(description = "Label order")]
    pub order: Option<i64>,
    #[schemars(description = "Whether label is a favorite")]
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateLabelParams {
    #[schemars(description = "Label ID to update")]
    pub label_id: String,
    #[schemars(description = "New label name")]
    pub name: Option<String>,
    #[schemars(description = "New label color")]
    pub color: Option<String>,
    #[schemars(description = "New label order")]
    pub order: Option<i64>,
    #[schemars(description = "Whether label is a favorite")]
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LabelIdParams {
    #[schemars(description = "Label ID to delete")]
    pub label_id: String,
}

#[tool_router(router = label_router, vis = "pub(crate)")]
impl McpServer {
    #[tool(
        description = "List all personal labels",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn list_labels(&self) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move { listing("labels", &self.rest.get(&ct, "/labels").await?) })
            .await;
        respond("list labels", result)
    }

    #[tool(
        description = "Create a new personal label",
        annotations(destructive_hint = false, open_world_hint = true)
    )]
    pub async fn create_label(
        &self,
        Parameters(params): Parameters<CreateLabelParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                required(&params.name, "name")?;
                let body = Body::new()
                    .text("name", Some(params.name.as_str()))
                    .text("color", params.color.as_deref())
                    .field("order", params.order)
                    .field("is_favorite", params.is_favorite)
                    .into_value();

                let created = self
                    .rest
                    .post(&ct, "/labels", Some(body), Idempotency::NonIdempotent)
                    .await?;
                decode::<Value>(&created)
            })
            .await;
        respond("create label", result)
    }

    #[tool(
        description = "Update a personal label",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn update_label(
        &self,
        Parameters(params): Parameters<UpdateLabelParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.label_id, "label_id")?;
                let body = Body::new()
                    .text("name", params.name.as_deref())
                    .text("color", params.color.as_deref())
                    .field("order", params.order)
                    .field("is_favorite", params.is_favorite)
                    .require_any()?;

                let updated = self
                    .rest
                    .post(&ct, &format!("/labels/{id}"), Some(body), Idempotency::Idempotent)
                    .await?;
                decode::<Value>(&updated)
            })
            .await;
        respond("update label", result)
    }

    #[tool(
        description = "Delete a personal label",
        annotations(destructive_hint = true, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn delete_label(
        &self,
        Parameters(params): Parameters<LabelIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.label_id, "label_id")?;
                self.rest.delete(&ct, &format!("/labels/{id}")).await?;
                Ok(acknowledged("label_id", id.as_str(), "Label deleted successfully"))
            })
            .await;
        respond("delete label", result)
    }
}
