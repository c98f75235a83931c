use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::AnthropicProviderConfig;
use super::utils::{convert_image, ImageFormat};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = match data.get("usage") {
            Some(usage) => usage,
            None => return Usage::default(),
        };

        let input_tokens = usage
            .get("input_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let output_tokens = usage
            .get("output_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
        let mut anthropic_messages = Vec::new();

        for message in messages {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            let mut blocks = Vec::new();
            for content in &message.content {
                match content {
                    MessageContent::Text(text) => {
                        if !text.text.is_empty() {
                            blocks.push(json!({"type": "text", "text": text.text}));
                        }
                    }
                    MessageContent::Image(image) => {
                        blocks.push(convert_image(image, &ImageFormat::Anthropic));
                    }
                    MessageContent::File(file) => {
                        blocks.push(json!({
                            "type": "document",
                            "source": {
                                "type": "base64",
                                "media_type": file.mime_type,
                                "data": file.data,
                            }
                        }));
                    }
                    MessageContent::ToolRequest(request) => match &request.tool_call {
                        Ok(tool_call) => blocks.push(json!({
                            "type": "tool_use",
                            "id": request.id,
                            "name": tool_call.name,
                            "input": tool_call.arguments,
                        })),
                        Err(e) => blocks.push(json!({
                            "type": "text",
                            "text": format!("Error: {}", e),
                        })),
                    },
                    MessageContent::ToolResponse(response) => blocks.push(json!({
                        "type": "tool_result",
                        "tool_use_id": response.id,
                        "content": response.text,
                    })),
                }
            }

            if !blocks.is_empty() {
                anthropic_messages.push(json!({"role": role, "content": blocks}));
            }
        }

        anthropic_messages
    }

    fn response_to_message(response: &Value) -> Result<Message> {
        let blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| anyhow!("Invalid response format from Anthropic API"))?;

        let mut message = Message::assistant();
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        message = message.with_text(text);
                    }
                }
                Some("tool_use") => {
                    let id = block["id"].as_str().unwrap_or_default().to_string();
                    let name = block["name"].as_str().unwrap_or_default().to_string();
                    let input = block.get("input").cloned().unwrap_or(json!({}));
                    message = message.with_tool_request(id, Ok(ToolCall::new(name, input)));
                }
                _ => {}
            }
        }
        Ok(message)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let error_text = response.text().await?;
                Err(anyhow!("Request failed: {} - {}", status, error_text))
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Message, Usage)> {
        let anthropic_messages = Self::messages_to_anthropic_spec(messages);

        let mut payload = json!({
            "model": self.config.model,
            "messages": anthropic_messages,
            "max_tokens": 4096
        });

        if !tools.is_empty() {
            let tools_spec: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "input_schema": tool.input_schema,
                    })
                })
                .collect();
            payload
                .as_object_mut()
                .unwrap()
                .insert("tools".to_string(), json!(tools_spec));
        }

        let response = self.post(payload).await?;

        let message = Self::response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}
