use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn default_input_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// A tool that can be used by a model. Sourced from the remote MCP catalog,
/// never authored locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// The name of the tool, unique within a catalog
    pub name: String,
    /// A description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON schema for the arguments the tool accepts
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool call request emitted by a model response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution
    pub arguments: Value,
}

impl ToolCall {
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}
