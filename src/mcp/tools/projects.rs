//! MCP tools for Project management.

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ViewStyle {
    List,
    Board,
}

impl ViewStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewStyle::List => "list",
            ViewStyle::Board => "board",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProjectIdParams {
    #[schemars(description = "Project ID")]
    pub project_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateProjectParams {
    #[schemars(description = "Project name")]
    pub name: String,
    #[schemars(description = "Parent project ID (for sub-projects)")]
    pub parent_id: Option<String>,
    #[schemars(description = "Project color (e.g., 'red', 'blue', 'green')")]
    pub color: Option<String>,
    #[schemars(description = "Whether project is a favorite")]
    pub is_favorite: Option<bool>,
    #[schemars(description = "View style: 'list' or 'board'")]
    pub view_style: Option<ViewStyle>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateProjectParams {
    #[schemars(description = "Project ID to update")]
    pub project_id: String,
    #[schemars(description = "New project name")]
    pub name: Option<String>,
    #[schemars(description = "New project color")]
    pub color: Option<String>,
    #[schemars(description = "Whether project is a favorite")]
    pub is_favorite: Option<bool>,
    #[schemars(description = "New view style: 'list' or 'board'")]
    pub view_style: Option<ViewStyle>,
}

#[tool_router(router = project_router, vis = "pub(crate)")]
impl McpServer {
    #[tool(
        description = "List all projects",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn list_projects(&self) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move { listing("projects", &self.rest.get(&ct, "/projects").await?) })
            .await;
        respond("list projects", result)
    }

    #[tool(
        description = "Get a single project by ID",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn get_project(
        &self,
        Parameters(params): Parameters<ProjectIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.project_id, "project_id")?;
                decode::<Value>(&self.rest.get(&ct, &format!("/projects/{id}")).await?)
            })
            .await;
        respond("get project", result)
    }

    #[tool(
        description = "Create a new project",
        annotations(destructive_hint = false, open_world_hint = true)
    )]
    pub async fn create_project(
        &self,
        Parameters(params): Parameters<CreateProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                required(&params.name, "name")?;
                ValidId::parse_optional(params.parent_id.as_deref(), "parent_id")?;

                let body = Body::new()
                    .text("name", Some(params.name.as_str()))
                    .text("parent_id", params.parent_id.as_deref())
                    .text("color", params.color.as_deref())
                    .field("is_favorite", params.is_favorite)
                    .field("view_style", params.view_style.map(|v| v.as_str()))
                    .into_value();

                let created = self
                    .rest
                    .post(&ct, "/projects", Some(body), Idempotency::NonIdempotent)
                    .await?;
                decode::<Value>(&created)
            })
            .await;
        respond("create project", result)
    }

    #[tool(
        description = "Update an existing project",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn update_project(
        &self,
        Parameters(params): Parameters<UpdateProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.project_id, "project_id")?;
                let body = Body::new()
                    .text("name", params.name.as_deref())
                    .text("color", params.color.as_deref())
                    .field("is_favorite", params.is_favorite)
                    .field("view_style", params.view_style.map(|v| v.as_str()))
                    .require_any()?;

                let updated = self
                    .rest
                    .post(&ct, &format!("/projects/{id}"), Some(body), Idempotency::Idempotent)
                    .await?;
                decode::<Value>(&updated)
            })
            .await;
        respond("update project", result)
    }

    #[tool(
        description = "Delete a project",
        annotations(destructive_hint = true, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn delete_project(
        &self,
        Parameters(params): Parameters<ProjectIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.project_id, "project_id")?;
                self.rest.delete(&ct, &format!("/projects/{id}")).await?;
                Ok(acknowledged(
                    "project_id",
                    id.as_str(),
                    "Project deleted successfully",
                ))
            })
            .await;
        respond("delete project", result)
    }
}
