//! MCP server
//!
//! Exposes the SugarMama tools over the Model Context Protocol.

mod server;

pub use server::SugarMamaService;
