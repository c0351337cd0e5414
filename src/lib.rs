//! Todoist MCP server.
//!
//! Exposes Todoist tasks, projects, sections, labels and comments as MCP
//! tools. Single-item calls go to the REST API; bulk calls are planned into
//! either a REST fan-out or one Sync API batch, all under one shared rate
//! limit.

pub mod bulk;
pub mod config;
pub mod mcp;
pub mod quick_add;
pub mod todoist;
pub mod validation;

#[cfg(test)]
mod config_test;
