use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum AgentError {
    #[error("No API key provided for model: {0}")]
    MissingCredential(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("MCP Client is not connected. Please connect first.")]
    NotConnected,

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures establishing or replacing the MCP session.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("invalid MCP endpoint '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to establish MCP session at {url}: {source}")]
    Handshake {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
