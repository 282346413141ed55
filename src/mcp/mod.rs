//! MCP server module
//!
//! Stdio tool surface for MCP clients.

pub mod server;

pub use server::NutrilabelService;
