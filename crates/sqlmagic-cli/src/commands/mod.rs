//! CLI command implementations for the SQLMagic MCP server.

pub mod check;
pub mod serve;
pub mod tools;
