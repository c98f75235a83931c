use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::GeminiProviderConfig;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

pub struct GeminiProvider {
    client: Client,
    config: GeminiProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = match data.get("usageMetadata") {
            Some(usage) => usage,
            None => return Usage::default(),
        };

        let input_tokens = usage
            .get("promptTokenCount")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let output_tokens = usage
            .get("candidatesTokenCount")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let total_tokens = usage
            .get("totalTokenCount")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    /// Gemini has no tool-call ids; function responses are keyed by function
    /// name, recovered here from the originating requests.
    fn messages_to_gemini_spec(messages: &[Message]) -> Vec<Value> {
        let mut call_names: HashMap<String, String> = HashMap::new();
        let mut contents = Vec::new();

        for message in messages {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "model",
            };

            let mut parts = Vec::new();
            for content in &message.content {
                match content {
                    MessageContent::Text(text) => {
                        if !text.text.is_empty() {
                            parts.push(json!({"text": text.text}));
                        }
                    }
                    MessageContent::Image(image) => parts.push(json!({
                        "inlineData": {"mimeType": image.mime_type, "data": image.data}
                    })),
                    MessageContent::File(file) => parts.push(json!({
                        "inlineData": {"mimeType": file.mime_type, "data": file.data}
                    })),
                    MessageContent::ToolRequest(request) => match &request.tool_call {
                        Ok(tool_call) => {
                            call_names.insert(request.id.clone(), tool_call.name.clone());
                            parts.push(json!({
                                "functionCall": {
                                    "name": tool_call.name,
                                    "args": tool_call.arguments,
                                }
                            }));
                        }
                        Err(e) => parts.push(json!({"text": format!("Error: {}", e)})),
                    },
                    MessageContent::ToolResponse(response) => {
                        let name = call_names
                            .get(&response.id)
                            .cloned()
                            .unwrap_or_else(|| response.id.clone());
                        parts.push(json!({
                            "functionResponse": {
                                "name": name,
                                "response": {"content": response.text},
                            }
                        }));
                    }
                }
            }

            if !parts.is_empty() {
                contents.push(json!({"role": role, "parts": parts}));
            }
        }

        contents
    }

    fn response_to_message(response: &Value) -> Result<Message> {
        let parts = response["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| anyhow!("Invalid response format from Gemini API"))?;

        let mut message = Message::assistant();
        for (idx, part) in parts.iter().enumerate() {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                message = message.with_text(text);
            } else if let Some(call) = part.get("functionCall") {
                let name = call["name"].as_str().unwrap_or_default().to_string();
                let args = call.get("args").cloned().unwrap_or(json!({}));
                message =
                    message.with_tool_request(format!("call_{idx}"), Ok(ToolCall::new(name, args)));
            }
        }
        Ok(message)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.host.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
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
impl Provider for GeminiProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "contents": Self::messages_to_gemini_spec(messages),
        });

        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    })
                })
                .collect();
            payload.as_object_mut().unwrap().insert(
                "tools".to_string(),
                json!([{"functionDeclarations": declarations}]),
            );
        }

        let response = self.post(payload).await?;

        let message = Self::response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, GeminiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1beta/models/gemini-2.0-flash:generateContent",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = GeminiProviderConfig::new("gemini-2.0-flash", "test_api_key")
            .with_host(mock_server.uri());
        let provider = GeminiProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello from Gemini!"}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 5,
                "candidatesTokenCount": 7,
                "totalTokenCount": 12
            }
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let messages = vec![Message::user().with_text("Hello?")];
        let (message, usage) = provider.complete(&messages, &[]).await?;

        assert_eq!(message.content[0].as_text(), Some("Hello from Gemini!"));
        assert_eq!(usage.total_tokens, Some(12));
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_function_call() -> Result<()> {
        let response_body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "get_weather",
                            "args": {"location": "Tokyo"}
                        }
                    }]
                }
            }]
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let tool = Tool::new(
            "get_weather",
            "Gets the weather",
            json!({"type": "object", "properties": {"location": {"type": "string"}}}),
        );
        let messages = vec![Message::user().with_text("Weather in Tokyo?")];
        let (message, _) = provider.complete(&messages, &[tool]).await?;

        let requests = message.tool_requests();
        assert_eq!(requests.len(), 1);
        let call = requests[0].tool_call.as_ref().unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments, json!({"location": "Tokyo"}));
        Ok(())
    }

    #[test]
    fn test_function_response_recovers_name() {
        let messages = vec![
            Message::user().with_text("Weather?"),
            Message::assistant().with_tool_request(
                "call_0",
                Ok(ToolCall::new("get_weather", json!({"location": "Tokyo"}))),
            ),
            Message::user().with_tool_response("call_0", "Rainy"),
        ];

        let spec = GeminiProvider::messages_to_gemini_spec(&messages);
        assert_eq!(spec.len(), 3);
        assert_eq!(spec[1]["role"], "model");
        assert_eq!(spec[2]["parts"][0]["functionResponse"]["name"], "get_weather");
        assert_eq!(
            spec[2]["parts"][0]["functionResponse"]["response"]["content"],
            "Rainy"
        );
    }
}
