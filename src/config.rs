//! Process configuration.
//!
//! Precedence: builder overrides (CLI flags) > environment > `.env` > defaults.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::todoist::rate_limiter::{DEFAULT_CAPACITY, DEFAULT_WINDOW};
use crate::todoist::rest::DEFAULT_REST_URL;
use crate::todoist::sync::DEFAULT_SYNC_URL;

pub const TOKEN_VAR: &str = "TODOIST_API_TOKEN";
pub const REST_URL_VAR: &str = "TODOIST_REST_URL";
pub const SYNC_URL_VAR: &str = "TODOIST_SYNC_URL";

/// Prefix that makes [`TOKEN_VAR`] name a file holding the token.
const FILE_PREFIX: &str = "file://";

const MIN_TOKEN_LEN: usize = 20;
const MAX_TOKEN_LEN: usize = 200;

/// Deadline applied to every tool invocation.
pub const DEFAULT_TOOL_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error(
        "TODOIST_API_TOKEN environment variable is required (get your token from https://todoist.com/prefs/integrations)"
    )]
    #[diagnostic(
        code(todoist_mcp::config::missing_token),
        help("Set TODOIST_API_TOKEN in the environment or in a .env file.")
    )]
    MissingToken,

    #[error("failed to read API token from file {}: {source}", path.display())]
    #[diagnostic(code(todoist_mcp::config::token_file))]
    TokenFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API token file {} is empty", path.display())]
    #[diagnostic(code(todoist_mcp::config::token_file))]
    TokenFileEmpty { path: PathBuf },

    #[error("API token appears too short (got {0} characters)")]
    #[diagnostic(code(todoist_mcp::config::invalid_token))]
    TokenTooShort(usize),

    #[error("API token appears too long (got {0} characters)")]
    #[diagnostic(code(todoist_mcp::config::invalid_token))]
    TokenTooLong(usize),

    #[error("API token contains whitespace characters")]
    #[diagnostic(code(todoist_mcp::config::invalid_token))]
    TokenWhitespace,

    #[error("API token contains control characters")]
    #[diagnostic(code(todoist_mcp::config::invalid_token))]
    TokenControlCharacters,
}

#[derive(Clone)]
pub struct Config {
    pub api_token: String,
    pub rest_url: String,
    pub sync_url: String,
    pub tool_deadline: Duration,
    pub rate_window: Duration,
    pub rate_capacity: usize,
}

// Keeps the token out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<redacted>")
            .field("rest_url", &self.rest_url)
            .field("sync_url", &self.sync_url)
            .field("tool_deadline", &self.tool_deadline)
            .field("rate_window", &self.rate_window)
            .field("rate_capacity", &self.rate_capacity)
            .finish()
    }
}

impl Config {
    /// Defaults around an already validated token.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            rest_url: DEFAULT_REST_URL.to_string(),
            sync_url: DEFAULT_SYNC_URL.to_string(),
            tool_deadline: DEFAULT_TOOL_DEADLINE,
            rate_window: DEFAULT_WINDOW,
            rate_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is not an error; real env vars win over it.
        dotenv::dotenv().ok();

        let raw = env::var(TOKEN_VAR)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let token = resolve_token(&raw)?;
        validate_token(&token)?;

        let mut config = Self::new(token);
        if let Some(url) = non_empty_var(REST_URL_VAR) {
            config.rest_url = url;
        }
        if let Some(url) = non_empty_var(SYNC_URL_VAR) {
            config.sync_url = url;
        }
        Ok(config)
    }

    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }

    pub fn with_sync_url(mut self, url: impl Into<String>) -> Self {
        self.sync_url = url.into();
        self
    }

    pub fn with_tool_deadline(mut self, deadline: Duration) -> Self {
        self.tool_deadline = deadline;
        self
    }

    pub fn with_rate_limit(mut self, window: Duration, capacity: usize) -> Self {
        self.rate_window = window;
        self.rate_capacity = capacity;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Follow `file://<path>` indirection, returning the trimmed file contents.
/// Any other value is returned unchanged.
pub fn resolve_token(raw: &str) -> Result<String, ConfigError> {
    let Some(path) = raw.strip_prefix(FILE_PREFIX) else {
        return Ok(raw.to_string());
    };

    let path = Path::new(path).to_path_buf();
    let contents =
        std::fs::read_to_string(&path).map_err(|source| ConfigError::TokenFileUnreadable {
            path: path.clone(),
            source,
        })?;

    let token = contents.trim();
    if token.is_empty() {
        return Err(ConfigError::TokenFileEmpty { path });
    }
    Ok(token.to_string())
}

pub fn validate_token(token: &str) -> Result<(), ConfigError> {
    let len = token.chars().count();
    if len < MIN_TOKEN_LEN {
        return Err(ConfigError::TokenTooShort(len));
    }
    if len > MAX_TOKEN_LEN {
        return Err(ConfigError::TokenTooLong(len));
    }

    for c in token.chars() {
        if c.is_whitespace() {
            return Err(ConfigError::TokenWhitespace);
        }
        if c.is_control() {
            return Err(ConfigError::TokenControlCharacters);
        }
    }
    Ok(())
}
