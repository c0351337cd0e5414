//! Todoist backend dispatch.
//!
//! - **rest**: single-resource REST calls
//! - **sync**: batched Sync API commands
//! - **rate_limiter**: the one admission window both of them share
//! - **retry**: backoff for idempotent REST calls

pub mod error;
pub mod http;
pub mod rate_limiter;
pub mod rest;
pub mod retry;
pub mod sync;

#[cfg(test)]
mod sync_test;

pub use error::{ApiError, ApiResult};
pub use rate_limiter::{RateLimiter, Reservation};
pub use rest::{Idempotency, RestApi, RestClient};
pub use retry::RetryPolicy;
pub use sync::{BatchApi, BatchResult, Command, CommandKind, CommandStatus, SyncClient};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a JSON response body.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    Ok(serde_json::from_slice(body)?)
}

/// Items of a list response: a bare array or a paginated `{"results": [...]}`.
/// Any other shape yields no items.
pub fn decode_list(body: &[u8]) -> ApiResult<Vec<Value>> {
    Ok(match decode::<Value>(body)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    })
}

/// Append an encoded query string to `path`. Pairs with empty values are
/// skipped; no `?` is added when nothing remains.
pub fn with_query(path: &str, pairs: &[(&str, &str)]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in pairs.iter().filter(|(_, v)| !v.is_empty()) {
        query.append_pair(key, value);
        any = true;
    }

    if any {
        format!("{path}?{}", query.finish())
    } else {
        path.to_string()
    }
}
