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
use crate::todoist::{Idempotency, decode, with_query};
use crate::validation::ValidId;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListSectionsParams {
    #[schemars(description = "Filter sections by project ID")]
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateSectionParams {
    #[schemars(description = "Section name")]
    pub name: String,
    #[schemars(description = "Project ID to create section in")]
    pub project_id: String,
    #[schemars(description = "Section order")]
    pub order: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateSectionParams {
    #[schemars(description = "Section ID to update")]
    pub section_id: String,
    #[schemars(description = "New section name")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SectionIdParams {
    #[schemars(description = "Section ID to delete")]
    pub section_id: String,
}

#[tool_router(router = section_router, vis = "pub(crate)")]
impl McpServer {
    #[tool(
        description = "List sections, optionally filtered by project",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn list_sections(
        &self,
        Parameters(params): Parameters<ListSectionsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let project = ValidId::parse_optional(params.project_id.as_deref(), "project_id")?;
                let project = project.as_ref().map(ValidId::as_str).unwrap_or_default();
                let path = with_query("/sections", &[("project_id", project)]);
                listing("sections", &self.rest.get(&ct, &path).await?)
            })
            .await;
        respond("list sections", result)
    }

    #[tool(
        description = "Create a new section in a project",
        annotations(destructive_hint = false, open_world_hint = true)
    )]
    pub async fn create_section(
        &self,
        Parameters(params): Parameters<CreateSectionParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                required(&params.name, "name")?;
                let project = ValidId::parse(params.project_id, "project_id")?;

                let body = Body::new()
                    .text("name", Some(params.name.as_str()))
                    .text("project_id", Some(project.as_str()))
                    .field("order", params.order)
                    .into_value();

                let created = self
                    .rest
                    .post(&ct, "/sections", Some(body), Idempotency::NonIdempotent)
                    .await?;
                decode::<Value>(&created)
            })
            .await;
        respond("create section", result)
    }

    #[tool(
        description = "Update a section name",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn update_section(
        &self,
        Parameters(params): Parameters<UpdateSectionParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.section_id, "section_id")?;
                required(&params.name, "name")?;

                let body = Body::new().text("name", Some(params.name.as_str())).into_value();
                let updated = self
                    .rest
                    .post(&ct, &format!("/sections/{id}"), Some(body), Idempotency::Idempotent)
                    .await?;
                decode::<Value>(&updated)
            })
            .await;
        respond("update section", result)
    }

    #[tool(
        description = "Delete a section",
        annotations(destructive_hint = true, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn delete_section(
        &self,
        Parameters(params): Parameters<SectionIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.section_id, "section_id")?;
                self.rest.delete(&ct, &format!("/sections/{id}")).await?;
                Ok(acknowledged(
                    "section_id",
                    id.as_str(),
                    "Section deleted successfully",
                ))
            })
            .await;
        respond("delete section", result)
    }
}
