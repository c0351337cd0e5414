//! Error taxonomy for calls against the Todoist backends.
//!
//! Every failure a tool can hit is one of these variants. Retry decisions are
//! made by [`ApiError::is_retryable`], never by inspecting message text.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    #[diagnostic(code(todoist_mcp::api::invalid_argument))]
    InvalidArgument(String),

    #[error(
        "rate limit reached: {used} requests in the last {window_minutes} minutes (max: {capacity})"
    )]
    #[diagnostic(
        code(todoist_mcp::api::rate_limit_exceeded),
        help("Wait for the rate window to advance before calling this tool again.")
    )]
    RateLimitExceeded {
        used: usize,
        capacity: usize,
        window_minutes: u64,
    },

    #[error(
        "authentication failed: invalid API token (get a valid token from https://todoist.com/prefs/integrations)"
    )]
    #[diagnostic(code(todoist_mcp::api::authentication_failed))]
    AuthenticationFailed,

    #[error("access forbidden: you don't have permission to access this resource")]
    #[diagnostic(code(todoist_mcp::api::forbidden))]
    Forbidden,

    #[error("resource not found: the requested item doesn't exist")]
    #[diagnostic(
        code(todoist_mcp::api::not_found),
        help("Use the matching list_* or search_tasks tool to look up a valid ID first.")
    )]
    NotFound,

    #[error("rate limit exceeded on the Todoist side: too many requests, please wait and try again")]
    #[diagnostic(code(todoist_mcp::api::backend_rate_limited))]
    BackendRateLimited,

    #[error("Todoist server error (status {status}): please try again later")]
    #[diagnostic(code(todoist_mcp::api::backend_unavailable))]
    BackendUnavailable { status: u16 },

    #[error("API error (status {status}): {message}")]
    #[diagnostic(code(todoist_mcp::api::rejected))]
    Rejected { status: u16, message: String },

    #[error("request failed: {message}")]
    #[diagnostic(
        code(todoist_mcp::api::transport_failure),
        help("Check network connectivity to api.todoist.com.")
    )]
    TransportFailure { message: String },

    #[error("failed to parse Todoist response: {message}")]
    #[diagnostic(code(todoist_mcp::api::response_decode_failure))]
    ResponseDecodeFailure { message: String },

    #[error("operation cancelled")]
    #[diagnostic(code(todoist_mcp::api::cancelled))]
    Cancelled,

    #[error("operation timed out after {seconds}s")]
    #[diagnostic(code(todoist_mcp::api::deadline_exceeded))]
    DeadlineExceeded { seconds: u64 },
}

impl ApiError {
    /// Transient failures that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::BackendRateLimited
            | ApiError::BackendUnavailable { .. }
            | ApiError::TransportFailure { .. } => true,
            ApiError::InvalidArgument(_)
            | ApiError::RateLimitExceeded { .. }
            | ApiError::AuthenticationFailed
            | ApiError::Forbidden
            | ApiError::NotFound
            | ApiError::Rejected { .. }
            | ApiError::ResponseDecodeFailure { .. }
            | ApiError::Cancelled
            | ApiError::DeadlineExceeded { .. } => false,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidArgument(message.into())
    }

    /// Map a non-2xx status to a variant. `body` is only surfaced for statuses
    /// outside the fixed taxonomy.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::AuthenticationFailed,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            429 => ApiError::BackendRateLimited,
            500..=599 => ApiError::BackendUnavailable { status },
            _ => ApiError::Rejected {
                status,
                message: if body.trim().is_empty() {
                    "unexpected status code".to_string()
                } else {
                    body.trim().to_string()
                },
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::ResponseDecodeFailure {
                message: e.to_string(),
            }
        } else {
            ApiError::TransportFailure {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::ResponseDecodeFailure {
            message: e.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
