use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::todoist::http::{REQUEST_TIMEOUT, build_client};
use crate::todoist::{
    ApiError, BatchApi, BatchResult, Command, CommandKind, CommandStatus, RateLimiter, RestApi,
    RestClient, RetryPolicy, SyncClient,
};

const TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";

fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn sync_client(url: &str, limiter: Arc<RateLimiter>) -> SyncClient {
    init_crypto();
    SyncClient::new(
        build_client(REQUEST_TIMEOUT).unwrap(),
        format!("{url}/sync"),
        TOKEN,
        limiter,
    )
}

#[test]
fn test_command_serializes_to_sync_envelope() {
    let close = Command::new(CommandKind::ItemClose, args(json!({"id": "42"})));
    let value = serde_json::to_value(&close).unwrap();

    assert_eq!(value["type"], "item_close");
    assert_eq!(value["uuid"], close.uuid.to_string());
    assert_eq!(value["args"]["id"], "42");
    assert!(value.get("temp_id").is_none());
}

#[test]
fn test_create_commands_carry_temp_id() {
    let add = Command::new(CommandKind::ItemAdd, args(json!({"content": "x"})));
    let value = serde_json::to_value(&add).unwrap();

    assert_eq!(value["type"], "item_add");
    assert_eq!(value["temp_id"], add.temp_id.clone().unwrap());
    assert_ne!(add.temp_id.as_deref(), Some(add.uuid.to_string().as_str()));
}

#[test]
fn test_correlation_ids_are_unique() {
    let ids: HashSet<_> = (0..500)
        .map(|_| Command::new(CommandKind::ItemClose, Map::new()).uuid)
        .collect();
    assert_eq!(ids.len(), 500);
}

#[test]
fn test_decode_sync_status() {
    let ok = Command::new(CommandKind::ItemClose, Map::new());
    let failed = Command::new(CommandKind::ItemClose, Map::new());
    let missing = Command::new(CommandKind::ItemClose, Map::new());

    let body = json!({
        "sync_token": "abc",
        "sync_status": {
            ok.uuid.to_string(): "ok",
            failed.uuid.to_string(): {"error_code": 22, "error": "Item not found"},
        },
        "temp_id_mapping": {},
        "full_sync": false,
    });
    let result: BatchResult = serde_json::from_value(body).unwrap();

    assert!(result.succeeded(&ok));
    assert!(!result.succeeded(&failed));
    assert!(!result.succeeded(&missing));
    assert_eq!(
        result.status(&failed),
        Some(&CommandStatus::Failed(crate::todoist::sync::CommandError {
            error: "Item not found".to_string(),
            error_code: Some(22),
        }))
    );
    assert!(result.status(&missing).is_none());
}

#[test]
fn test_resolved_id_maps_temp_ids() {
    let add = Command::new(CommandKind::ItemAdd, Map::new());
    let temp = add.temp_id.clone().unwrap();
    let result: BatchResult = serde_json::from_value(json!({
        "sync_status": {add.uuid.to_string(): "ok"},
        "temp_id_mapping": {(temp): "6X7rM8997g3RQmvh"},
    }))
    .unwrap();

    assert_eq!(result.resolved_id(&add), Some("6X7rM8997g3RQmvh"));
}

#[test]
fn test_decode_tolerates_non_uuid_status_keys() {
    let close = Command::new(CommandKind::ItemClose, Map::new());
    let result: BatchResult = serde_json::from_value(json!({
        "sync_status": {
            close.uuid.to_string(): "ok",
            "legacy-command-1": {"error_code": 15, "error": "Invalid temporary id"},
        },
        "temp_id_mapping": {},
    }))
    .unwrap();

    assert!(result.succeeded(&close));
    assert_eq!(result.sync_status.len(), 2);
    assert!(!result.sync_status["legacy-command-1"].is_ok());
}

#[tokio::test]
async fn test_submit_posts_form_encoded_commands() {
    let commands: Vec<Command> = (0..3)
        .map(|i| Command::new(CommandKind::ItemClose, args(json!({"id": i.to_string()}))))
        .collect();

    let status: Map<String, Value> = commands
        .iter()
        .map(|c| (c.uuid.to_string(), json!("ok")))
        .collect();

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/sync")
        .match_header("authorization", format!("Bearer {TOKEN}").as_str())
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::Regex("^commands=".to_string()))
        .with_status(200)
        .with_body(json!({"sync_status": status, "temp_id_mapping": {}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let sync = sync_client(&server.url(), Arc::new(RateLimiter::default()));
    let result = sync
        .submit(&CancellationToken::new(), commands.clone())
        .await
        .unwrap();

    assert!(commands.iter().all(|c| result.succeeded(c)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_submit_consumes_one_slot_per_batch() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/sync")
        .with_status(200)
        .with_body(r#"{"sync_status":{},"temp_id_mapping":{}}"#)
        .create_async()
        .await;

    let limiter = Arc::new(RateLimiter::new(Duration::from_secs(900), 10));
    let sync = sync_client(&server.url(), Arc::clone(&limiter));
    let commands = (0..40)
        .map(|_| Command::new(CommandKind::ItemClose, Map::new()))
        .collect();

    sync.submit(&CancellationToken::new(), commands).await.unwrap();
    assert_eq!(limiter.remaining(), 9);
}

#[tokio::test]
async fn test_submit_rejects_empty_batch() {
    let sync = sync_client("http://127.0.0.1:1", Arc::new(RateLimiter::default()));
    let err = sync
        .submit(&CancellationToken::new(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_submit_malformed_response_is_decode_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/sync")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let sync = sync_client(&server.url(), Arc::new(RateLimiter::default()));
    let err = sync
        .submit(
            &CancellationToken::new(),
            vec![Command::new(CommandKind::ItemClose, Map::new())],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ResponseDecodeFailure { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_submit_classifies_http_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/sync")
        .with_status(401)
        .create_async()
        .await;

    let sync = sync_client(&server.url(), Arc::new(RateLimiter::default()));
    let err = sync
        .submit(
            &CancellationToken::new(),
            vec![Command::new(CommandKind::ItemClose, Map::new())],
        )
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::AuthenticationFailed);
}

#[tokio::test]
async fn test_rest_and_sync_share_one_budget() {
    init_crypto();
    let mut server = mockito::Server::new_async().await;
    let _projects = server
        .mock("GET", "/projects")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let _sync = server
        .mock("POST", "/sync")
        .with_status(200)
        .with_body(r#"{"sync_status":{},"temp_id_mapping":{}}"#)
        .create_async()
        .await;

    let capacity = 5;
    for rest_calls in 0..=capacity {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(900), capacity));
        let rest = RestClient::new(
            build_client(REQUEST_TIMEOUT).unwrap(),
            server.url(),
            TOKEN,
            Arc::clone(&limiter),
        )
        .with_retry(RetryPolicy::none());
        let sync = sync_client(&server.url(), Arc::clone(&limiter));
        let ct = CancellationToken::new();

        for _ in 0..rest_calls {
            rest.get(&ct, "/projects").await.unwrap();
        }
        for _ in rest_calls..capacity {
            sync.submit(&ct, vec![Command::new(CommandKind::ItemClose, Map::new())])
                .await
                .unwrap();
        }

        assert_eq!(limiter.remaining(), 0);
        assert!(matches!(
            rest.get(&ct, "/projects").await,
            Err(ApiError::RateLimitExceeded { .. })
        ));
        assert!(matches!(
            sync.submit(&ct, vec![Command::new(CommandKind::ItemClose, Map::new())])
                .await,
            Err(ApiError::RateLimitExceeded { .. })
        ));
    }
}
