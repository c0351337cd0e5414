//! Model Context Protocol (MCP) server implementation
//!
//! The server speaks MCP over stdio and exposes Todoist tasks, projects,
//! sections, labels and comments as tools.
//!
//! - **server**: Main MCP server coordinator and the per-call deadline
//! - **tools**: one router per entity, merged by the server

pub mod server;
pub mod tools;


pub use server::McpServer;
