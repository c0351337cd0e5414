//! HTTP plumbing shared by the REST and Sync clients.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{ApiError, ApiResult};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Build the process-wide connection pool.
///
/// One client is created at startup and cloned into both dispatchers; clones
/// share the same pool.
pub fn build_client(timeout: Duration) -> ApiResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .user_agent(concat!("todoist-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::TransportFailure {
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Send a prepared request, returning the body of a 2xx response.
///
/// The whole exchange races the cancellation token, so a cancelled
/// invocation drops the in-flight request instead of waiting it out.
pub(crate) async fn execute(ct: &CancellationToken, request: RequestBuilder) -> ApiResult<Bytes> {
    tokio::select! {
        biased;
        _ = ct.cancelled() => Err(ApiError::Cancelled),
        result = exchange(request) => result,
    }
}

async fn exchange(request: RequestBuilder) -> ApiResult<Bytes> {
    let response = request.send().await?;
    let status = response.status();
    let path = response.url().path().to_string();
    let body = response.bytes().await?;
    debug!(status = status.as_u16(), %path, bytes = body.len(), "todoist response");

    if status.is_success() {
        Ok(body)
    } else {
        Err(ApiError::from_status(
            status.as_u16(),
            &String::from_utf8_lossy(&body),
        ))
    }
}
