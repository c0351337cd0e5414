//! Tests for Task MCP tools

use std::sync::Arc;

use bytes::Bytes;
use mockall::predicate::eq;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Value, json};

use crate::mcp::McpServer;
use crate::mcp::tools::tasks::{
    CreateTaskParams, QuickAddParams, SearchTasksParams, TaskIdParams, UpdateTaskParams,
};
use crate::mcp::tools::{DurationUnit, TaskStats};
use crate::todoist::rest::MockRestApi;
use crate::todoist::sync::MockBatchApi;
use crate::todoist::{ApiError, Idempotency, RateLimiter};

fn server(rest: MockRestApi) -> McpServer {
    McpServer::new(
        Arc::new(rest),
        Arc::new(MockBatchApi::new()),
        Arc::new(RateLimiter::default()),
    )
}

fn text(result: &CallToolResult) -> &str {
    match &result.content[0].raw {
        RawContent::Text(text) => text.text.as_str(),
        _ => panic!("Expected text content"),
    }
}

fn json_of(result: &CallToolResult) -> Value {
    serde_json::from_str(text(result)).expect("tool output should be JSON")
}

fn body(value: Value) -> Bytes {
    Bytes::from(value.to_string())
}

#[tokio::test]
async fn test_search_tasks_builds_query() {
    let mut rest = MockRestApi::new();
    rest.expect_get()
        .withf(|_, path| path == "/tasks?filter=today&project_id=220474322&ids=1%2C2")
        .times(1)
        .returning(|_, _| Ok(body(json!([{"id": "1"}, {"id": "2"}]))));

    let result = server(rest)
        .search_tasks(Parameters(SearchTasksParams {
            filter: Some("today".to_string()),
            project_id: Some("220474322".to_string()),
            label: None,
            ids: Some(vec!["1".to_string(), "2".to_string()]),
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(false));
    let output = json_of(&result);
    assert_eq!(output["count"], 2);
    assert_eq!(output["tasks"][1]["id"], "2");
}

#[tokio::test]
async fn test_search_tasks_without_filters() {
    let mut rest = MockRestApi::new();
    rest.expect_get()
        .withf(|_, path| path == "/tasks")
        .returning(|_, _| Ok(body(json!({"results": [], "next_cursor": null}))));

    let result = server(rest)
        .search_tasks(Parameters(SearchTasksParams::default()))
        .await
        .unwrap();

    assert_eq!(json_of(&result), json!({"count": 0, "tasks": []}));
}

#[tokio::test]
async fn test_get_task_not_found() {
    let mut rest = MockRestApi::new();
    rest.expect_get()
        .with(mockall::predicate::always(), eq("/tasks/999"))
        .returning(|_, _| Err(ApiError::NotFound));

    let result = server(rest)
        .get_task(Parameters(TaskIdParams {
            task_id: "999".to_string(),
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(true));
    assert_eq!(
        text(&result),
        "failed to get task: resource not found: the requested item doesn't exist"
    );
}

#[tokio::test]
async fn test_get_task_rejects_path_injection() {
    let mut rest = MockRestApi::new();
    rest.expect_get().never();

    let result = server(rest)
        .get_task(Parameters(TaskIdParams {
            task_id: "../projects".to_string(),
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(true));
    assert_eq!(text(&result), "task_id contains invalid characters");
}

#[tokio::test]
async fn test_create_task_sends_only_set_fields() {
    let mut rest = MockRestApi::new();
    rest.expect_post()
        .withf(|_, path, body, idempotency| {
            path == "/tasks"
                && *idempotency == Idempotency::NonIdempotent
                && body.as_ref()
                    == Some(&json!({
                        "content": "Write report",
                        "project_id": "2203306141",
                        "labels": ["work"],
                        "priority": 4,
                        "due_string": "tomorrow at 3pm",
                        "duration": 45,
                        "duration_unit": "minute",
                    }))
        })
        .times(1)
        .returning(|_, _, _, _| Ok(body(json!({"id": "7025", "content": "Write report"}))));

    let result = server(rest)
        .create_task(Parameters(CreateTaskParams {
            content: "Write report".to_string(),
            description: Some(String::new()),
            project_id: Some("2203306141".to_string()),
            labels: Some(vec!["work".to_string()]),
            priority: Some(4),
            due_string: Some("tomorrow at 3pm".to_string()),
            duration: Some(45),
            duration_unit: Some(DurationUnit::Minute),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(false));
    assert_eq!(json_of(&result)["id"], "7025");
}

#[tokio::test]
async fn test_create_task_validates_before_sending() {
    let cases = [
        (
            CreateTaskParams {
                content: "   ".to_string(),
                ..Default::default()
            },
            "content is required",
        ),
        (
            CreateTaskParams {
                content: "x".to_string(),
                priority: Some(5),
                ..Default::default()
            },
            "priority must be between 1 (normal) and 4 (urgent)",
        ),
        (
            CreateTaskParams {
                content: "x".to_string(),
                duration: Some(30),
                ..Default::default()
            },
            "duration requires duration_unit",
        ),
        (
            CreateTaskParams {
                content: "x".to_string(),
                section_id: Some("a/b".to_string()),
                ..Default::default()
            },
            "section_id contains invalid characters",
        ),
    ];

    for (params, message) in cases {
        let mut rest = MockRestApi::new();
        rest.expect_post().never();

        let result = server(rest).create_task(Parameters(params)).await.unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(text(&result), message);
    }
}

#[tokio::test]
async fn test_update_task_requires_a_field() {
    let mut rest = MockRestApi::new();
    rest.expect_post().never();

    let result = server(rest)
        .update_task(Parameters(UpdateTaskParams {
            task_id: "7025".to_string(),
            content: Some(String::new()),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(true));
    assert_eq!(text(&result), "at least one field to update must be provided");
}

#[tokio::test]
async fn test_update_task_can_clear_labels() {
    let mut rest = MockRestApi::new();
    rest.expect_post()
        .withf(|_, path, body, idempotency| {
            path == "/tasks/7025"
                && *idempotency == Idempotency::Idempotent
                && body.as_ref() == Some(&json!({"labels": []}))
        })
        .times(1)
        .returning(|_, _, _, _| Ok(body(json!({"id": "7025", "labels": []}))));

    let result = server(rest)
        .update_task(Parameters(UpdateTaskParams {
            task_id: "7025".to_string(),
            labels: Some(vec![]),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(false));
}

#[tokio::test]
async fn test_complete_and_reopen_acknowledge() {
    let mut rest = MockRestApi::new();
    rest.expect_post()
        .withf(|_, path, body, _| path == "/tasks/7025/close" && body.is_none())
        .times(1)
        .returning(|_, _, _, _| Ok(Bytes::new()));
    rest.expect_post()
        .withf(|_, path, body, _| path == "/tasks/7025/reopen" && body.is_none())
        .times(1)
        .returning(|_, _, _, _| Ok(Bytes::new()));
    let server = server(rest);

    let completed = server
        .complete_task(Parameters(TaskIdParams {
            task_id: "7025".to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(
        json_of(&completed),
        json!({"success": true, "task_id": "7025", "message": "Task completed successfully"})
    );

    let reopened = server
        .uncomplete_task(Parameters(TaskIdParams {
            task_id: "7025".to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(json_of(&reopened)["message"], "Task reopened successfully");
}

#[tokio::test]
async fn test_delete_task_surfaces_backend_error() {
    let mut rest = MockRestApi::new();
    rest.expect_delete()
        .returning(|_, _| Err(ApiError::BackendUnavailable { status: 503 }));

    let result = server(rest)
        .delete_task(Parameters(TaskIdParams {
            task_id: "7025".to_string(),
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(true));
    assert_eq!(
        text(&result),
        "failed to delete task: Todoist server error (status 503): please try again later"
    );
}

#[tokio::test]
async fn test_quick_add_resolves_project_name() {
    let mut rest = MockRestApi::new();
    rest.expect_get()
        .withf(|_, path| path == "/projects")
        .times(1)
        .returning(|_, _| {
            Ok(body(json!([
                {"id": "100", "name": "Inbox"},
                {"id": "200", "name": "Shopping"},
            ])))
        });
    rest.expect_post()
        .withf(|_, path, body, _| {
            path == "/tasks"
                && body.as_ref()
                    == Some(&json!({
                        "content": "Buy milk",
                        "project_id": "200",
                        "labels": ["groceries"],
                        "priority": 4,
                        "due_string": "tomorrow",
                    }))
        })
        .times(1)
        .returning(|_, _, _, _| Ok(body(json!({"id": "9"}))));

    let result = server(rest)
        .quick_add_task(Parameters(QuickAddParams {
            content: "Buy milk #shopping @groceries p1 tomorrow".to_string(),
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(false));
    assert_eq!(json_of(&result)["id"], "9");
}

#[tokio::test]
async fn test_quick_add_ignores_unknown_project() {
    let mut rest = MockRestApi::new();
    rest.expect_get()
        .returning(|_, _| Ok(body(json!([{"id": "100", "name": "Inbox"}]))));
    rest.expect_post()
        .withf(|_, _, body, _| body.as_ref() == Some(&json!({"content": "Call mum"})))
        .times(1)
        .returning(|_, _, _, _| Ok(body(json!({"id": "10"}))));

    let result = server(rest)
        .quick_add_task(Parameters(QuickAddParams {
            content: "Call mum #nowhere".to_string(),
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(false));
}

#[test]
fn test_task_stats_compute() {
    let projects = vec![
        json!({"id": "p1", "name": "Work"}),
        json!({"id": "p2", "name": "Home"}),
    ];
    let tasks = vec![
        json!({"id": "1", "priority": 4, "project_id": "p1", "due": {"date": "2026-03-10"}}),
        json!({"id": "2", "priority": 1, "project_id": "p1", "due": {"date": "2026-03-09"}}),
        json!({"id": "3", "priority": 2, "project_id": "p2",
               "due": {"date": "2026-03-10T09:00:00"}}),
        json!({"id": "4", "priority": 1, "project_id": "gone"}),
        json!({"id": "5", "priority": 3, "project_id": "p2", "due": {"date": "2026-04-01"}}),
    ];

    let stats = TaskStats::compute(&tasks, &projects, "2026-03-10");

    assert_eq!(stats.total_active, 5);
    assert_eq!(stats.today, 2);
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.by_priority["p1"], 1);
    assert_eq!(stats.by_priority["p2"], 1);
    assert_eq!(stats.by_priority["p3"], 1);
    assert_eq!(stats.by_priority["p4"], 2);
    assert_eq!(stats.by_project["Work"], 2);
    assert_eq!(stats.by_project["Home"], 2);
    assert_eq!(stats.by_project["Unknown"], 1);
}

#[test]
fn test_task_stats_empty() {
    let stats = TaskStats::compute(&[], &[], "2026-03-10");

    assert_eq!(stats.total_active, 0);
    assert_eq!(stats.by_priority.len(), 4);
    assert!(stats.by_priority.values().all(|&n| n == 0));
    assert!(stats.by_project.is_empty());
}

#[tokio::test]
async fn test_get_task_stats_tool() {
    let mut rest = MockRestApi::new();
    rest.expect_get()
        .withf(|_, path| path == "/tasks")
        .returning(|_, _| Ok(body(json!([{"id": "1", "priority": 4, "project_id": "p1"}]))));
    rest.expect_get()
        .withf(|_, path| path == "/projects")
        .returning(|_, _| Ok(body(json!([{"id": "p1", "name": "Work"}]))));

    let result = server(rest).get_task_stats().await.unwrap();

    let output = json_of(&result);
    assert_eq!(output["total_active"], 1);
    assert_eq!(output["by_priority"]["p1"], 1);
    assert_eq!(output["by_project"]["Work"], 1);
}
