//! Set-oriented task operations.
//!
//! [`BulkPlanner`] decides per call whether a bulk operation fans out over the
//! REST API or collapses into one Sync API batch, and reports the result the
//! same way either way.

mod planner;


pub use planner::{BATCH_THRESHOLD, BulkPlanner};

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::todoist::{ApiError, ApiResult};
use crate::validation::{ValidId, validate_priority};

/// Which tasks a bulk operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    Ids(Vec<String>),
    /// A Todoist filter query, resolved with one `GET /tasks?filter=...`.
    Filter(String),
}

impl Targets {
    /// An explicit ID list takes precedence over a filter.
    pub fn from_params(task_ids: Option<Vec<String>>, filter: Option<String>) -> ApiResult<Self> {
        match (task_ids, filter) {
            (Some(ids), _) if !ids.is_empty() => Ok(Targets::Ids(ids)),
            (_, Some(filter)) if !filter.trim().is_empty() => Ok(Targets::Filter(filter)),
            _ => Err(no_targets()),
        }
    }
}

pub(crate) fn no_targets() -> ApiError {
    ApiError::invalid("either task_ids or filter must be provided and match at least one task")
}

/// Where `bulk_move_tasks` sends its targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Project(ValidId),
    Section(ValidId),
    Parent(ValidId),
}

impl Destination {
    /// Exactly one of the three must be set.
    pub fn from_params(
        project_id: Option<&str>,
        section_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> ApiResult<Self> {
        let project = ValidId::parse_optional(project_id, "project_id")?;
        let section = ValidId::parse_optional(section_id, "section_id")?;
        let parent = ValidId::parse_optional(parent_id, "parent_id")?;

        match (project, section, parent) {
            (Some(id), None, None) => Ok(Destination::Project(id)),
            (None, Some(id), None) => Ok(Destination::Section(id)),
            (None, None, Some(id)) => Ok(Destination::Parent(id)),
            _ => Err(ApiError::invalid(
                "exactly one of project_id, section_id or parent_id is required",
            )),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Destination::Project(_) => "project_id",
            Destination::Section(_) => "section_id",
            Destination::Parent(_) => "parent_id",
        }
    }

    pub fn id(&self) -> &ValidId {
        match self {
            Destination::Project(id) | Destination::Section(id) | Destination::Parent(id) => id,
        }
    }

    pub(crate) fn to_args(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert(self.field().to_string(), json!(self.id().as_str()));
        args
    }
}

/// One task in a `bulk_create_tasks` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewTask {
    #[schemars(description = "Task title/content")]
    pub content: String,
    #[schemars(description = "Task description (markdown supported)")]
    pub description: Option<String>,
    #[schemars(description = "Project ID to add the task to")]
    pub project_id: Option<String>,
    #[schemars(description = "Section ID within the project")]
    pub section_id: Option<String>,
    #[schemars(description = "Label names")]
    pub labels: Option<Vec<String>>,
    #[schemars(description = "Priority from 1 (normal) to 4 (urgent)")]
    pub priority: Option<u8>,
    #[schemars(description = "Natural language due date (e.g. 'tomorrow at 3pm')")]
    pub due_string: Option<String>,
    #[schemars(
        description = "Zero-based index of an earlier task in this request to nest this one under"
    )]
    pub parent_index: Option<usize>,
}

impl NewTask {
    pub(crate) fn validate(&self, index: usize) -> ApiResult<()> {
        if self.content.trim().is_empty() {
            return Err(ApiError::invalid(format!("tasks[{index}].content is required")));
        }
        validate_priority(self.priority)?;
        ValidId::parse_optional(self.project_id.as_deref(), "project_id")?;
        ValidId::parse_optional(self.section_id.as_deref(), "section_id")?;
        if let Some(parent) = self.parent_index
            && parent >= index
        {
            return Err(ApiError::invalid(format!(
                "tasks[{index}].parent_index must reference an earlier task"
            )));
        }
        Ok(())
    }

    /// Fields shared by the REST body and the `item_add` args.
    fn common_args(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("content".into(), json!(self.content));
        insert_non_empty(&mut args, "description", self.description.as_deref());
        insert_non_empty(&mut args, "project_id", self.project_id.as_deref());
        insert_non_empty(&mut args, "section_id", self.section_id.as_deref());
        if let Some(labels) = self.labels.as_ref().filter(|l| !l.is_empty()) {
            args.insert("labels".into(), json!(labels));
        }
        if let Some(priority) = self.priority {
            args.insert("priority".into(), json!(priority));
        }
        args
    }

    pub(crate) fn rest_body(&self, parent_id: Option<&str>) -> Value {
        let mut body = self.common_args();
        insert_non_empty(&mut body, "due_string", self.due_string.as_deref());
        insert_non_empty(&mut body, "parent_id", parent_id);
        Value::Object(body)
    }

    pub(crate) fn command_args(&self, parent_temp_id: Option<&str>) -> Map<String, Value> {
        let mut args = self.common_args();
        if let Some(due) = self.due_string.as_deref().filter(|d| !d.is_empty()) {
            args.insert("due".into(), json!({ "string": due }));
        }
        insert_non_empty(&mut args, "parent_id", parent_temp_id);
        args
    }
}

fn insert_non_empty(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        map.insert(key.to_string(), json!(value));
    }
}

/// Uniform result of a bulk operation, whichever path ran it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Task IDs for complete/move, task contents for create.
    pub failed_ids: Vec<String>,
    pub used_batching: bool,
    /// Real IDs of created tasks, in request order. Only set by create.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_ids: Vec<String>,
}

impl BulkOutcome {
    pub(crate) fn new(total: usize, used_batching: bool) -> Self {
        Self {
            total,
            used_batching,
            ..Self::default()
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self, id: impl Into<String>) {
        self.failed += 1;
        self.failed_ids.push(id.into());
    }
}
