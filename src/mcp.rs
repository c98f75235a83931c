//! Client side of the MCP tool protocol over streamable HTTP, plus the
//! session object that owns the single outbound connection.
pub mod client;
pub mod session;

pub use client::McpClient;
pub use session::McpSession;
