use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;

use crate::models::tool::Tool;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const SESSION_HEADER: &str = "mcp-session-id";

/// A connected MCP client speaking JSON-RPC over streamable HTTP.
///
/// The server may answer a POST either with a plain JSON body or with a short
/// SSE stream carrying the response as a `data:` event; both are handled.
pub struct McpClient {
    http: Client,
    endpoint: Url,
    session_id: Option<String>,
    next_id: AtomicI64,
}

impl McpClient {
    /// Establish a session against the given endpoint: JSON-RPC `initialize`,
    /// capture the server-assigned session id, then `notifications/initialized`.
    pub async fn connect(endpoint: Url) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        let mut client = Self {
            http,
            endpoint,
            session_id: None,
            next_id: AtomicI64::new(1),
        };

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "mcp-agent",
                "version": env!("CARGO_PKG_VERSION"),
            }
        });

        // The initialize result is unused beyond confirming the handshake
        let (_result, session_id) = client.post_rpc("initialize", params, true).await?;
        client.session_id = session_id;

        client.notify("notifications/initialized").await?;
        tracing::debug!(endpoint = %client.endpoint, "MCP session established");
        Ok(client)
    }

    /// Fetch the remote tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .unwrap_or_else(|| json!([]));
        let tools: Vec<Tool> = serde_json::from_value(tools)
            .map_err(|e| anyhow!("malformed tool catalog: {e}"))?;
        Ok(tools)
    }

    /// Invoke a remote tool by name, returning the raw structured result.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )
        .await
    }

    /// Tear down the remote session. Best effort: servers without explicit
    /// session cleanup simply reject the DELETE.
    pub async fn close(&self) -> Result<()> {
        let mut request = self.http.delete(self.endpoint.clone());
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id);
        }
        request.send().await?;
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (result, _) = self.post_rpc(method, params, false).await?;
        Ok(result)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
        });

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("Accept", "application/json, text/event-stream")
            .json(&payload);
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "notification {method} rejected: {}",
                response.status()
            ));
        }
        Ok(())
    }

    /// POST one JSON-RPC request and unwrap the response envelope. Returns the
    /// result value and, when `capture_session` is set, the session id header.
    async fn post_rpc(
        &self,
        method: &str,
        params: Value,
        capture_session: bool,
    ) -> Result<(Value, Option<String>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("Accept", "application/json, text/event-stream")
            .json(&payload);
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => {
                let session_id = if capture_session {
                    response
                        .headers()
                        .get(SESSION_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .map(String::from)
                } else {
                    None
                };
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let body = response.text().await?;
                let envelope = parse_rpc_body(&content_type, &body)?;
                Ok((unwrap_envelope(envelope)?, session_id))
            }
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {status}"))
            }
            status => Err(anyhow!("Request failed: {status}")),
        }
    }
}

/// Decode a response body that is either plain JSON or an SSE stream whose
/// first `data:` event carries the JSON-RPC response.
fn parse_rpc_body(content_type: &str, body: &str) -> Result<Value> {
    if content_type.starts_with("text/event-stream") {
        for line in body.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                return serde_json::from_str(data.trim())
                    .map_err(|e| anyhow!("invalid SSE event payload: {e}"));
            }
        }
        return Err(anyhow!("event stream contained no data event"));
    }
    serde_json::from_str(body).map_err(|e| anyhow!("invalid response body: {e}"))
}

fn unwrap_envelope(envelope: Value) -> Result<Value> {
    if let Some(error) = envelope.get("error") {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(anyhow!("RPC error {code}: {message}"));
    }
    Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
}
