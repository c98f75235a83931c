//! Bridges the remote MCP tool catalog into the calling convention a provider
//! expects, and routes invocations back through the live session.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::errors::{AgentError, AgentResult};
use crate::mcp::{McpClient, McpSession};
use crate::models::tool::Tool;
use crate::registry::ProviderFamily;

/// Typed view of the heterogeneous result shapes tool servers return.
/// Precedence when rendering: first text field, else whole-structure
/// serialization, else empty.
#[derive(Debug, PartialEq)]
pub(crate) enum ToolOutput {
    Text(String),
    Structured(Value),
    Empty,
}

impl ToolOutput {
    pub(crate) fn classify(result: &Value) -> Self {
        if let Some(items) = result.get("content").and_then(|c| c.as_array()) {
            for item in items {
                if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                    return ToolOutput::Text(text.to_string());
                }
            }
        }
        if result.is_null() {
            return ToolOutput::Empty;
        }
        ToolOutput::Structured(result.clone())
    }

    pub(crate) fn into_text(self) -> String {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Structured(value) => value.to_string(),
            ToolOutput::Empty => String::new(),
        }
    }
}

/// A catalog tool rendered for one provider family, carrying the handle used
/// to invoke it remotely.
pub struct AdaptedTool {
    tool: Tool,
    client: Arc<McpClient>,
}

impl AdaptedTool {
    pub fn definition(&self) -> &Tool {
        &self.tool
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// Call the remote tool. Failures never propagate: they render as an
    /// error-content string the model can read in the tool-result message.
    pub async fn invoke(&self, arguments: Value) -> String {
        match self.client.call_tool(&self.tool.name, arguments).await {
            Ok(result) => ToolOutput::classify(&result).into_text(),
            Err(e) => {
                tracing::warn!(tool = %self.tool.name, error = %e, "tool invocation failed");
                format!("Error: {e}")
            }
        }
    }
}

pub struct ToolBridge {
    session: Arc<McpSession>,
}

impl ToolBridge {
    pub fn new(session: Arc<McpSession>) -> Self {
        Self { session }
    }

    /// Fetch the remote catalog, keyed by name. Duplicate names resolve
    /// last-wins with a logged warning; an empty catalog is a warning, not an
    /// error.
    pub async fn discover_tools(&self) -> AgentResult<Vec<Tool>> {
        let client = self.session.client().await.ok_or(AgentError::NotConnected)?;

        let tools = client
            .list_tools()
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        if tools.is_empty() {
            tracing::warn!("No tools found in MCP catalog");
            return Ok(Vec::new());
        }

        let mut catalog: Vec<Tool> = Vec::with_capacity(tools.len());
        let mut index_by_name: HashMap<String, usize> = HashMap::new();
        for tool in tools {
            match index_by_name.get(&tool.name) {
                Some(&idx) => {
                    tracing::warn!(tool = %tool.name, "duplicate tool name in catalog, later definition wins");
                    catalog[idx] = tool;
                }
                None => {
                    index_by_name.insert(tool.name.clone(), catalog.len());
                    catalog.push(tool);
                }
            }
        }
        Ok(catalog)
    }

    /// Render each tool for the target provider family and attach the
    /// invocation handle.
    pub async fn adapt(
        &self,
        tools: Vec<Tool>,
        family: ProviderFamily,
    ) -> AgentResult<Vec<AdaptedTool>> {
        let client = self.session.client().await.ok_or(AgentError::NotConnected)?;

        Ok(tools
            .into_iter()
            .map(|tool| AdaptedTool {
                tool: render_for_family(tool, family),
                client: client.clone(),
            })
            .collect())
    }
}

fn render_for_family(tool: Tool, family: ProviderFamily) -> Tool {
    match family {
        // Gemini function declarations get a flattened, string-typed argument
        // schema; the other families accept the catalog schema as-is.
        ProviderFamily::Gemini => Tool {
            input_schema: stringify_schema(&tool.input_schema),
            ..tool
        },
        _ => tool,
    }
}

fn stringify_schema(schema: &Value) -> Value {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .unwrap_or(&empty);

    let mut stringified = Map::new();
    for (key, prop) in properties {
        let description = prop
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("");
        stringified.insert(
            key.clone(),
            json!({"type": "string", "description": description}),
        );
    }

    let required: Vec<&String> = properties.keys().collect();
    json!({
        "type": "object",
        "properties": stringified,
        "required": required,
    })
}
