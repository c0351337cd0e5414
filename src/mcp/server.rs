//! MCP server coordinator.
//!
//! One [`McpServer`] serves every tool. Tool bodies live in `tools::*`, each
//! file contributing one router to the combined [`ToolRouter`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{ServerCapabilities, ServerInfo},
    tool_handler,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bulk::BulkPlanner;
use crate::config::DEFAULT_TOOL_DEADLINE;
use crate::todoist::{ApiError, ApiResult, BatchApi, RateLimiter, RestApi};

#[derive(Clone)]
pub struct McpServer {
    pub(crate) rest: Arc<dyn RestApi>,
    pub(crate) planner: BulkPlanner,
    deadline: Duration,
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// `limiter` must be the one both dispatchers were built with.
    pub fn new(rest: Arc<dyn RestApi>, batch: Arc<dyn BatchApi>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            planner: BulkPlanner::new(Arc::clone(&rest), batch, limiter),
            rest,
            deadline: DEFAULT_TOOL_DEADLINE,
            tool_router: Self::task_router()
                + Self::bulk_router()
                + Self::project_router()
                + Self::section_router()
                + Self::label_router()
                + Self::comment_router(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn router(&self) -> &ToolRouter<Self> {
        &self.tool_router
    }

    /// Run one tool body under the invocation deadline.
    ///
    /// The body gets its own cancellation token; it is cancelled when the
    /// deadline passes, so in-flight requests and retry sleeps stop with it.
    pub(crate) async fn invoke<T, F, Fut>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let ct = CancellationToken::new();
        // Cancels on every exit path, including the caller dropping us.
        let _guard = ct.clone().drop_guard();

        match tokio::time::timeout(self.deadline, op(ct.clone())).await {
            Ok(result) => result,
            Err(_) => {
                ct.cancel();
                warn!(deadline_secs = self.deadline.as_secs(), "tool call timed out");
                Err(ApiError::DeadlineExceeded {
                    seconds: self.deadline.as_secs(),
                })
            }
        }
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            "Todoist MCP Server - Manage tasks, projects, sections, labels, and comments. \
             Bulk tools batch large operations automatically.",
        )
    }
}
