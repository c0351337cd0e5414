//! MCP tools for task and project comments.
//!
//! Every comment hangs off either a task or a project; the read and create
//! tools require one of the two.

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
use crate::todoist::{ApiError, ApiResult, Idempotency, decode, with_query};
use crate::validation::ValidId;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetCommentsParams {
    #[schemars(description = "Task ID to get comments for")]
    pub task_id: Option<String>,
    #[schemars(description = "Project ID to get comments for")]
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct AddCommentParams {
    #[schemars(description = "Comment content (markdown supported)")]
    pub content: String,
    #[schemars(description = "Task ID to comment on")]
    pub task_id: Option<String>,
    #[schemars(description = "Project ID to comment on")]
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateCommentParams {
    #[schemars(description = "Comment ID to update")]
    pub comment_id: String,
    #[schemars(description = "New comment content")]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CommentIdParams {
    #[schemars(description = "Comment ID to delete")]
    pub comment_id: String,
}

/// The validated `(task_id, project_id)` pair; at least one is set.
fn comment_parent(
    task_id: Option<&str>,
    project_id: Option<&str>,
) -> ApiResult<(Option<ValidId>, Option<ValidId>)> {
    let task = ValidId::parse_optional(task_id, "task_id")?;
    let project = ValidId::parse_optional(project_id, "project_id")?;
    if task.is_none() && project.is_none() {
        return Err(ApiError::invalid("either task_id or project_id is required"));
    }
    Ok((task, project))
}

#[tool_router(router = comment_router, vis = "pub(crate)")]
impl McpServer {
    #[tool(
        description = "Get comments for a task or project",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn get_comments(
        &self,
        Parameters(params): Parameters<GetCommentsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let (task, project) =
                    comment_parent(params.task_id.as_deref(), params.project_id.as_deref())?;
                let path = with_query(
                    "/comments",
                    &[
                        ("task_id", task.as_ref().map(ValidId::as_str).unwrap_or_default()),
                        (
                            "project_id",
                            project.as_ref().map(ValidId::as_str).unwrap_or_default(),
                        ),
                    ],
                );
                listing("comments", &self.rest.get(&ct, &path).await?)
            })
            .await;
        respond("get comments", result)
    }

    #[tool(
        description = "Add a comment to a task or project",
        annotations(destructive_hint = false, open_world_hint = true)
    )]
    pub async fn add_comment(
        &self,
        Parameters(params): Parameters<AddCommentParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                required(&params.content, "content")?;
                let (task, project) =
                    comment_parent(params.task_id.as_deref(), params.project_id.as_deref())?;

                let body = Body::new()
                    .text("content", Some(params.content.as_str()))
                    .text("task_id", task.as_ref().map(ValidId::as_str))
                    .text("project_id", project.as_ref().map(ValidId::as_str))
                    .into_value();

                let created = self
                    .rest
                    .post(&ct, "/comments", Some(body), Idempotency::NonIdempotent)
                    .await?;
                decode::<Value>(&created)
            })
            .await;
        respond("add comment", result)
    }

    #[tool(
        description = "Update a comment",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn update_comment(
        &self,
        Parameters(params): Parameters<UpdateCommentParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.comment_id, "comment_id")?;
                required(&params.content, "content")?;

                let body = Body::new()
                    .text("content", Some(params.content.as_str()))
                    .into_value();
                let updated = self
                    .rest
                    .post(&ct, &format!("/comments/{id}"), Some(body), Idempotency::Idempotent)
                    .await?;
                decode::<Value>(&updated)
            })
            .await;
        respond("update comment", result)
    }

    #[tool(
        description = "Delete a comment",
        annotations(destructive_hint = true, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn delete_comment(
        &self,
        Parameters(params): Parameters<CommentIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.comment_id, "comment_id")?;
                self.rest.delete(&ct, &format!("/comments/{id}")).await?;
                Ok(acknowledged(
                    "comment_id",
                    id.as_str(),
                    "Comment deleted successfully",
                ))
            })
            .await;
        respond("delete comment", result)
    }
}
