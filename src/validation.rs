//! Identifier checks applied before an ID is interpolated into a request path.

use std::fmt;

use crate::todoist::{ApiError, ApiResult};

/// Reject IDs that are empty or could alter the request path.
///
/// Todoist IDs are opaque strings; this only guards against path traversal
/// and header/control-character injection.
pub fn validate_identifier(value: &str, field: &str) -> ApiResult<()> {
    if value.is_empty() {
        return Err(ApiError::invalid(format!("{field} is required")));
    }

    let invalid = value.contains("..")
        || value.contains(['/', '\\'])
        || value.chars().any(|c| (c as u32) < 0x20 || c as u32 == 0x7f);

    if invalid {
        return Err(ApiError::invalid(format!(
            "{field} contains invalid characters"
        )));
    }

    Ok(())
}

/// Todoist priorities run from 1 (normal) to 4 (urgent).
pub fn validate_priority(priority: Option<u8>) -> ApiResult<()> {
    match priority {
        Some(p) if !(1..=4).contains(&p) => Err(ApiError::invalid(
            "priority must be between 1 (normal) and 4 (urgent)",
        )),
        _ => Ok(()),
    }
}

/// An identifier that passed [`validate_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidId(String);

impl ValidId {
    pub fn parse(value: impl Into<String>, field: &str) -> ApiResult<Self> {
        let value = value.into();
        validate_identifier(&value, field)?;
        Ok(Self(value))
    }

    /// Validate an optional ID, treating `None` and `""` as absent.
    pub fn parse_optional(value: Option<&str>, field: &str) -> ApiResult<Option<Self>> {
        match value {
            None | Some("") => Ok(None),
            Some(v) => Self::parse(v, field).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
