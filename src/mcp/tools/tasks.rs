//! MCP tools for single-task operations.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::{self, JsonSchema},
    tool, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Body, acknowledged, listing, required, respond};
use crate::mcp::McpServer;
use crate::quick_add;
use crate::todoist::{ApiError, ApiResult, Idempotency, decode, decode_list, with_query};
use crate::validation::{ValidId, validate_priority};

// =============================================================================
// Parameter Structs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minute,
    Day,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Minute => "minute",
            DurationUnit::Day => "day",
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchTasksParams {
    #[schemars(
        description = "Todoist filter syntax (e.g., 'today', 'p1', 'overdue', '@label', '#project', 'today & p1')"
    )]
    pub filter: Option<String>,
    #[schemars(description = "Filter tasks by project ID")]
    pub project_id: Option<String>,
    #[schemars(description = "Filter tasks by label name")]
    pub label: Option<String>,
    #[schemars(description = "Get specific tasks by IDs")]
    pub ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TaskIdParams {
    #[schemars(description = "Task ID")]
    pub task_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateTaskParams {
    #[schemars(description = "Task title/content")]
    pub content: String,
    #[schemars(description = "Task description (markdown supported)")]
    pub description: Option<String>,
    #[schemars(description = "Project ID to add task to")]
    pub project_id: Option<String>,
    #[schemars(description = "Section ID within project")]
    pub section_id: Option<String>,
    #[schemars(description = "Parent task ID (for sub-tasks)")]
    pub parent_id: Option<String>,
    #[schemars(description = "Task order")]
    pub order: Option<i64>,
    #[schemars(description = "Array of label names")]
    pub labels: Option<Vec<String>>,
    #[schemars(description = "Priority from 1 (normal) to 4 (urgent/p1)")]
    pub priority: Option<u8>,
    #[schemars(
        description = "Natural language due date (e.g., 'tomorrow at 3pm', 'every monday')"
    )]
    pub due_string: Option<String>,
    #[schemars(description = "Due date in YYYY-MM-DD format")]
    pub due_date: Option<String>,
    #[schemars(description = "Due date and time in RFC3339 format")]
    pub due_datetime: Option<String>,
    #[schemars(description = "User ID to assign task to (for shared projects)")]
    pub assignee_id: Option<String>,
    #[schemars(description = "Task duration amount (requires duration_unit)")]
    pub duration: Option<u32>,
    #[schemars(description = "Duration unit: 'minute' or 'day'")]
    pub duration_unit: Option<DurationUnit>,
    #[schemars(description = "Deadline date in YYYY-MM-DD format")]
    pub deadline_date: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateTaskParams {
    #[schemars(description = "Task ID to update")]
    pub task_id: String,
    #[schemars(description = "New task title/content")]
    pub content: Option<String>,
    #[schemars(description = "New task description")]
    pub description: Option<String>,
    #[schemars(description = "New array of label names")]
    pub labels: Option<Vec<String>>,
    #[schemars(description = "New priority from 1 (normal) to 4 (urgent)")]
    pub priority: Option<u8>,
    #[schemars(description = "New natural language due date")]
    pub due_string: Option<String>,
    #[schemars(description = "New due date in YYYY-MM-DD format")]
    pub due_date: Option<String>,
    #[schemars(description = "New due date and time in RFC3339 format")]
    pub due_datetime: Option<String>,
    #[schemars(description = "New assignee user ID")]
    pub assignee_id: Option<String>,
    #[schemars(description = "New task duration amount (requires duration_unit)")]
    pub duration: Option<u32>,
    #[schemars(description = "New duration unit: 'minute' or 'day'")]
    pub duration_unit: Option<DurationUnit>,
    #[schemars(description = "New deadline date in YYYY-MM-DD format")]
    pub deadline_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QuickAddParams {
    #[schemars(
        description = "Task content with inline syntax: 'Buy milk #Shopping @groceries p1 tomorrow'"
    )]
    pub content: String,
}

/// Due fields, duration and deadline shared by create and update.
struct Scheduling<'a> {
    due_string: Option<&'a str>,
    due_date: Option<&'a str>,
    due_datetime: Option<&'a str>,
    assignee_id: Option<&'a str>,
    duration: Option<u32>,
    duration_unit: Option<DurationUnit>,
    deadline_date: Option<&'a str>,
}

impl Scheduling<'_> {
    fn apply(self, body: Body) -> ApiResult<Body> {
        match (self.duration, self.duration_unit) {
            (Some(_), None) => return Err(ApiError::invalid("duration requires duration_unit")),
            (None, Some(_)) => return Err(ApiError::invalid("duration_unit requires duration")),
            _ => {}
        }
        Ok(body
            .text("due_string", self.due_string)
            .text("due_date", self.due_date)
            .text("due_datetime", self.due_datetime)
            .text("assignee_id", self.assignee_id)
            .field("duration", self.duration)
            .field("duration_unit", self.duration_unit.map(|u| u.as_str()))
            .text("deadline_date", self.deadline_date))
    }
}

impl CreateTaskParams {
    fn into_body(self) -> ApiResult<Value> {
        required(&self.content, "content")?;
        validate_priority(self.priority)?;
        for (value, field) in [
            (&self.project_id, "project_id"),
            (&self.section_id, "section_id"),
            (&self.parent_id, "parent_id"),
        ] {
            ValidId::parse_optional(value.as_deref(), field)?;
        }

        let body = Body::new()
            .text("content", Some(self.content.as_str()))
            .text("description", self.description.as_deref())
            .text("project_id", self.project_id.as_deref())
            .text("section_id", self.section_id.as_deref())
            .text("parent_id", self.parent_id.as_deref())
            .field("order", self.order)
            .list("labels", self.labels.clone())
            .field("priority", self.priority);

        let scheduling = Scheduling {
            due_string: self.due_string.as_deref(),
            due_date: self.due_date.as_deref(),
            due_datetime: self.due_datetime.as_deref(),
            assignee_id: self.assignee_id.as_deref(),
            duration: self.duration,
            duration_unit: self.duration_unit,
            deadline_date: self.deadline_date.as_deref(),
        };
        Ok(scheduling.apply(body)?.into_value())
    }
}

impl UpdateTaskParams {
    fn into_body(self) -> ApiResult<Value> {
        validate_priority(self.priority)?;

        let body = Body::new()
            .text("content", self.content.as_deref())
            .text("description", self.description.as_deref())
            // An explicit empty list clears the labels.
            .field("labels", self.labels.clone())
            .field("priority", self.priority);

        let scheduling = Scheduling {
            due_string: self.due_string.as_deref(),
            due_date: self.due_date.as_deref(),
            due_datetime: self.due_datetime.as_deref(),
            assignee_id: self.assignee_id.as_deref(),
            duration: self.duration,
            duration_unit: self.duration_unit,
            deadline_date: self.deadline_date.as_deref(),
        };
        scheduling.apply(body)?.require_any()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Aggregate view over the active tasks.
///
/// `by_priority` uses the user-facing names: API priority 4 is `p1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total_active: usize,
    pub today: usize,
    pub overdue: usize,
    pub by_priority: BTreeMap<String, usize>,
    pub by_project: BTreeMap<String, usize>,
}

impl TaskStats {
    /// `today` is `YYYY-MM-DD`; due dates compare on their date part.
    pub fn compute(tasks: &[Value], projects: &[Value], today: &str) -> Self {
        let names: BTreeMap<&str, &str> = projects
            .iter()
            .filter_map(|p| Some((p.get("id")?.as_str()?, p.get("name")?.as_str()?)))
            .collect();

        let mut stats = TaskStats {
            total_active: tasks.len(),
            by_priority: ["p1", "p2", "p3", "p4"]
                .into_iter()
                .map(|p| (p.to_string(), 0))
                .collect(),
            ..TaskStats::default()
        };

        for task in tasks {
            if let Some(priority @ 1..=4) = task.get("priority").and_then(Value::as_u64) {
                *stats
                    .by_priority
                    .entry(format!("p{}", 5 - priority))
                    .or_default() += 1;
            }

            if let Some(project_id) = task.get("project_id").and_then(Value::as_str) {
                let name = names.get(project_id).copied().unwrap_or("Unknown");
                *stats.by_project.entry(name.to_string()).or_default() += 1;
            }

            let due = task
                .get("due")
                .and_then(|d| d.get("date"))
                .and_then(Value::as_str)
                .map(|d| d.get(..10).unwrap_or(d));
            match due {
                Some(date) if date == today => stats.today += 1,
                Some(date) if date < today => stats.overdue += 1,
                _ => {}
            }
        }

        stats
    }
}

// =============================================================================
// Task Tools
// =============================================================================

#[tool_router(router = task_router, vis = "pub(crate)")]
impl McpServer {
    #[tool(
        description = "Search and list tasks with optional filters (filter syntax, project_id, label, or ids)",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn search_tasks(
        &self,
        Parameters(params): Parameters<SearchTasksParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                ValidId::parse_optional(params.project_id.as_deref(), "project_id")?;
                let ids = params.ids.unwrap_or_default();
                for id in &ids {
                    ValidId::parse(id.as_str(), "ids")?;
                }
                let ids = ids.join(",");

                let path = with_query(
                    "/tasks",
                    &[
                        ("filter", params.filter.as_deref().unwrap_or_default()),
                        ("project_id", params.project_id.as_deref().unwrap_or_default()),
                        ("label", params.label.as_deref().unwrap_or_default()),
                        ("ids", ids.as_str()),
                    ],
                );
                let body = self.rest.get(&ct, &path).await?;
                listing("tasks", &body)
            })
            .await;
        respond("search tasks", result)
    }

    #[tool(
        description = "Get a single task by ID with full details",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn get_task(
        &self,
        Parameters(params): Parameters<TaskIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.task_id, "task_id")?;
                let body = self.rest.get(&ct, &format!("/tasks/{id}")).await?;
                decode::<Value>(&body)
            })
            .await;
        respond("get task", result)
    }

    #[tool(
        description = "Create a new task with optional due dates, priority, labels, and other properties",
        annotations(destructive_hint = false, open_world_hint = true)
    )]
    pub async fn create_task(
        &self,
        Parameters(params): Parameters<CreateTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let body = params.into_body()?;
                let created = self
                    .rest
                    .post(&ct, "/tasks", Some(body), Idempotency::NonIdempotent)
                    .await?;
                decode::<Value>(&created)
            })
            .await;
        respond("create task", result)
    }

    #[tool(
        description = "Update an existing task",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn update_task(
        &self,
        Parameters(params): Parameters<UpdateTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.task_id.clone(), "task_id")?;
                let body = params.into_body()?;
                let updated = self
                    .rest
                    .post(&ct, &format!("/tasks/{id}"), Some(body), Idempotency::Idempotent)
                    .await?;
                decode::<Value>(&updated)
            })
            .await;
        respond("update task", result)
    }

    #[tool(
        description = "Mark a task as completed",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn complete_task(
        &self,
        Parameters(params): Parameters<TaskIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.task_id, "task_id")?;
                self.rest
                    .post(&ct, &format!("/tasks/{id}/close"), None, Idempotency::Idempotent)
                    .await?;
                Ok(acknowledged("task_id", id.as_str(), "Task completed successfully"))
            })
            .await;
        respond("complete task", result)
    }

    #[tool(
        description = "Reopen a completed task",
        annotations(destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn uncomplete_task(
        &self,
        Parameters(params): Parameters<TaskIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.task_id, "task_id")?;
                self.rest
                    .post(&ct, &format!("/tasks/{id}/reopen"), None, Idempotency::Idempotent)
                    .await?;
                Ok(acknowledged("task_id", id.as_str(), "Task reopened successfully"))
            })
            .await;
        respond("reopen task", result)
    }

    #[tool(
        description = "Delete a task",
        annotations(destructive_hint = true, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn delete_task(
        &self,
        Parameters(params): Parameters<TaskIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let id = ValidId::parse(params.task_id, "task_id")?;
                self.rest.delete(&ct, &format!("/tasks/{id}")).await?;
                Ok(acknowledged("task_id", id.as_str(), "Task deleted successfully"))
            })
            .await;
        respond("delete task", result)
    }

    #[tool(
        description = "Quick add task using Todoist syntax: #project @label p1-p4 due date",
        annotations(destructive_hint = false, open_world_hint = true)
    )]
    pub async fn quick_add_task(
        &self,
        Parameters(params): Parameters<QuickAddParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                required(&params.content, "content")?;
                let parsed = quick_add::parse(&params.content);

                // An unknown project name leaves the task in the Inbox.
                let project_id = match &parsed.project_name {
                    Some(name) => match self
                        .rest
                        .get(&ct, "/projects")
                        .await
                        .and_then(|b| decode_list(&b))
                    {
                        Ok(projects) => projects
                            .iter()
                            .find(|p| {
                                p.get("name")
                                    .and_then(Value::as_str)
                                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
                            })
                            .and_then(|p| p.get("id").and_then(Value::as_str))
                            .map(str::to_string),
                        Err(e) => {
                            warn!(project = %name, error = %e, "could not resolve quick-add project");
                            None
                        }
                    },
                    None => None,
                };
                debug!(?parsed, ?project_id, "quick add parsed");

                let body = Body::new()
                    .text("content", Some(parsed.content.as_str()))
                    .text("project_id", project_id.as_deref())
                    .list("labels", Some(parsed.labels))
                    .field("priority", parsed.priority)
                    .text("due_string", parsed.due_string.as_deref())
                    .into_value();

                let created = self
                    .rest
                    .post(&ct, "/tasks", Some(body), Idempotency::NonIdempotent)
                    .await?;
                decode::<Value>(&created)
            })
            .await;
        respond("create task", result)
    }

    #[tool(
        description = "Get aggregate statistics about tasks (by project, priority, today, overdue)",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    pub async fn get_task_stats(&self) -> Result<CallToolResult, McpError> {
        let result = self
            .invoke(|ct| async move {
                let tasks = decode_list(&self.rest.get(&ct, "/tasks").await?)?;
                let projects = decode_list(&self.rest.get(&ct, "/projects").await?)?;
                let today = chrono::Local::now().format("%Y-%m-%d").to_string();
                Ok(json!(TaskStats::compute(&tasks, &projects, &today)))
            })
            .await;
        respond("get task stats", result)
    }
}
