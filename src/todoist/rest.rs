//! Single-resource dispatcher for the Todoist REST API.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

#[cfg(test)]
use mockall::automock;

use super::error::ApiResult;
use super::http;
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;

pub const DEFAULT_REST_URL: &str = "https://api.todoist.com/rest/v2";

/// Whether a POST may be replayed without changing the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Updates, close, reopen, move.
    Idempotent,
    /// Creates. Never retried.
    NonIdempotent,
}

/// Path-addressed calls against the REST API.
///
/// `path` is relative to the base URL and may carry an encoded query string.
/// Every attempt is admitted through the shared [`RateLimiter`] first.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RestApi: Send + Sync {
    async fn get(&self, ct: &CancellationToken, path: &str) -> ApiResult<Bytes>;

    async fn post(
        &self,
        ct: &CancellationToken,
        path: &str,
        body: Option<Value>,
        idempotency: Idempotency,
    ) -> ApiResult<Bytes>;

    async fn delete(&self, ct: &CancellationToken, path: &str) -> ApiResult<()>;
}

#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    token: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl RestClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            limiter,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Startup probe: one `GET /projects`.
    pub async fn test_connection(&self, ct: &CancellationToken) -> ApiResult<()> {
        self.get(ct, "/projects").await.map(|_| ())
    }

    /// Retries draw only on slots no sequential bulk run has reserved.
    fn may_retry(&self) -> bool {
        self.limiter.unreserved() > 0
    }

    async fn attempt(
        &self,
        ct: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<Bytes> {
        self.limiter.try_admit()?;
        debug!(%method, path, "todoist rest request");

        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.token);
        if let Some(body) = body {
            // .json() sets Content-Type: application/json
            request = request.json(body);
        }

        http::execute(ct, request).await
    }
}

#[async_trait]
impl RestApi for RestClient {
    #[instrument(skip(self, ct))]
    async fn get(&self, ct: &CancellationToken, path: &str) -> ApiResult<Bytes> {
        self.retry
            .run_while(
                ct,
                move || self.attempt(ct, Method::GET, path, None),
                || self.may_retry(),
            )
            .await
    }

    #[instrument(skip(self, ct, body))]
    async fn post(
        &self,
        ct: &CancellationToken,
        path: &str,
        body: Option<Value>,
        idempotency: Idempotency,
    ) -> ApiResult<Bytes> {
        let body = body.as_ref();
        match idempotency {
            Idempotency::Idempotent => {
                self.retry
                    .run_while(
                        ct,
                        move || self.attempt(ct, Method::POST, path, body),
                        || self.may_retry(),
                    )
                    .await
            }
            Idempotency::NonIdempotent => self.attempt(ct, Method::POST, path, body).await,
        }
    }

    #[instrument(skip(self, ct))]
    async fn delete(&self, ct: &CancellationToken, path: &str) -> ApiResult<()> {
        self.retry
            .run_while(
                ct,
                move || self.attempt(ct, Method::DELETE, path, None),
                || self.may_retry(),
            )
            .await
            .map(|_| ())
    }
}
