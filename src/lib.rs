pub mod agent;
pub mod attachments;
pub mod bridge;
pub mod errors;
pub mod extract;
pub mod mcp;
pub mod models;
pub mod providers;
pub mod registry;
