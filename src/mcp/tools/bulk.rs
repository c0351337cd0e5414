//! MCP tools for set-oriented task operations.

use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::{self, JsonSchema},
    tool, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::respond;
use crate::bulk::{BulkOutcome, Destination, NewTask, Targets};
use crate::mcp::McpServer;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct BulkCompleteParams {
    #[schemars(description = "Array of task IDs to complete")]
    pub task_ids: Option<Vec<String>>,
    #[schemars(description = "Todoist filter to select tasks to complete (e.g., 'today & p1')")]
    pub filter: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct BulkCreateParams {
    #[schemars(
        description = "Tasks to create, in order. A task may set parent_index to nest under an earlier task in this list."
    )]
    pub tasks: Vec<NewTask>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct BulkMoveParams {
    #[schemars(description = "Array of task IDs to move")]
    pub task_ids: Option<Vec<String>>,
    #[schemars(description = "Todoist filter to select tasks to move")]
    pub filter: Option<String>,
    #[schemars(description = "Destination project ID")]
    pub project_id: Option<String>,
    #[schemars(description = "Destination section ID")]
    pub section_id: Option<String>,
    #[schemars(description = "Destination parent task ID")]
    pub parent_id: Option<String>,
}

/// Report shape for `bulk_complete_tasks`.
pub(crate) fn completion_report(outcome: &BulkOutcome) -> Value {
    let message = if outcome.failed == 0 {
        format!("Successfully completed {} tasks", outcome.succeeded)
    } else {
        format!(
            "Completed {} of {} tasks ({} failed)",
            outcome.succeeded, outcome.total, outcome.failed
        )
    };

    json!({
        "total_tasks": outcome.total,
        "completed": outcome.succeeded,
        "failed": outcome.failed,
        "failed_task_ids": outcome.failed_ids,
        "used_batching": outcome.used_batching,
        "message": message,
    })
}

#[tool_router(router = bulk_router, vis = "pub(crate)")]
impl McpServer {
    #[tool(
        description = "Complete multiple tasks by IDs or filter string (respects rate limits). More than 5 tasks are completed in a single batch request.",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn bulk_complete_tasks(
        &self,
        Parameters(params): Parameters<BulkCompleteParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let targets = Targets::from_params(params.task_ids, params.filter)?;
                let outcome = self.planner.complete(&ct, targets).await?;
                Ok(completion_report(&outcome))
            })
            .await;
        respond("complete tasks", result)
    }

    #[tool(
        description = "Create multiple tasks in one call. Tasks may reference an earlier task in the same list as their parent via parent_index. More than 5 tasks are created in a single batch request.",
        annotations(destructive_hint = false, open_world_hint = true)
    )]
    pub async fn bulk_create_tasks(
        &self,
        Parameters(params): Parameters<BulkCreateParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move { self.planner.create(&ct, params.tasks).await })
            .await;
        respond("create tasks", result)
    }

    #[tool(
        description = "Move multiple tasks (by IDs or filter) to exactly one of: a project, a section, or a parent task. All moves go out as a single batch request.",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn bulk_move_tasks(
        &self,
        Parameters(params): Parameters<BulkMoveParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let destination = Destination::from_params(
                    params.project_id.as_deref(),
                    params.section_id.as_deref(),
                    params.parent_id.as_deref(),
                )?;
                let targets = Targets::from_params(params.task_ids, params.filter)?;
                self.planner.move_tasks(&ct, targets, destination).await
            })
            .await;
        respond("move tasks", result)
    }
}
