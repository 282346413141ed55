//! Application tools
//!
//! Operations behind the MCP tool surface and the command-line binaries.

pub mod foods;
pub mod labels;
pub mod recipes;
pub mod status;
