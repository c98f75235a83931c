//! The turn-bounded state machine driving one conversation turn: resolve the
//! provider for the requested model, bind the remote tool catalog, then
//! alternate between provider dispatch and tool execution until the model
//! answers without tool calls or the turn budget runs out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attachments::normalize;
use crate::bridge::{AdaptedTool, ToolBridge};
use crate::errors::AgentError;
use crate::extract::DocumentExtractor;
use crate::mcp::McpSession;
use crate::models::attachment::FileAttachment;
use crate::models::message::{Message, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::Tool;
use crate::providers::base::Provider;
use crate::providers::factory::provider_for;
use crate::registry::{resolve, ProviderFamily};

/// Maximum number of provider dispatch rounds per turn
pub const MAX_TURNS: usize = 5;

pub const STOPPED_MESSAGE: &str = "Agent stopped after reaching max turns.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOutcome {
    Final,
    Error,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub content: String,
}

/// Terminal result of one `run_turn` invocation. Every failure path is a
/// structured result; nothing escapes the core boundary as a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub success: bool,
    pub outcome: TurnOutcome,
    pub content: String,
    pub transcript: Vec<TranscriptEntry>,
}

impl TurnResult {
    fn finished(content: String, transcript: Vec<TranscriptEntry>) -> Self {
        Self {
            success: true,
            outcome: TurnOutcome::Final,
            content,
            transcript,
        }
    }

    fn error<S: Into<String>>(content: S) -> Self {
        Self {
            success: false,
            outcome: TurnOutcome::Error,
            content: content.into(),
            transcript: Vec::new(),
        }
    }

    fn stopped(transcript: Vec<TranscriptEntry>) -> Self {
        Self {
            success: false,
            outcome: TurnOutcome::Stopped,
            content: STOPPED_MESSAGE.to_string(),
            transcript,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Model,
}

/// One prior turn of conversation, replayed verbatim ahead of the new prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub text: String,
}

pub struct TurnRequest<'a> {
    pub prompt: &'a str,
    pub attachments: &'a [FileAttachment],
    pub model: &'a str,
    pub credential: &'a str,
    pub history: &'a [HistoryEntry],
}

/// Drives conversation turns against one MCP session.
///
/// The session and extractor are explicit collaborators rather than globals,
/// so independent agents never interfere with each other's connections.
pub struct Agent {
    session: Arc<McpSession>,
    bridge: ToolBridge,
    extractor: Arc<dyn DocumentExtractor>,
}

impl Agent {
    pub fn new(session: Arc<McpSession>, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self {
            bridge: ToolBridge::new(session.clone()),
            session,
            extractor,
        }
    }

    pub fn session(&self) -> &Arc<McpSession> {
        &self.session
    }

    /// Run one conversation turn to completion.
    pub async fn run_turn(&self, request: TurnRequest<'_>) -> TurnResult {
        if request.credential.trim().is_empty() {
            return TurnResult::error(
                AgentError::MissingCredential(request.model.to_string()).to_string(),
            );
        }

        let family = match resolve(request.model) {
            Some(family) => family,
            None => {
                return TurnResult::error(
                    AgentError::UnsupportedModel(request.model.to_string()).to_string(),
                )
            }
        };

        if !self.session.is_connected().await {
            return TurnResult::error(AgentError::NotConnected.to_string());
        }

        let provider = match provider_for(family, request.model, request.credential) {
            Ok(provider) => provider,
            Err(e) => return TurnResult::error(e.to_string()),
        };

        self.run_with_provider(&request, family, provider.as_ref())
            .await
    }

    async fn run_with_provider(
        &self,
        request: &TurnRequest<'_>,
        family: ProviderFamily,
        provider: &dyn Provider,
    ) -> TurnResult {
        let tools = match self.bridge.discover_tools().await {
            Ok(tools) => tools,
            Err(e) => return TurnResult::error(e.to_string()),
        };

        let adapted = if tools.is_empty() {
            Vec::new()
        } else {
            match self.bridge.adapt(tools, family).await {
                Ok(adapted) => adapted,
                Err(e) => return TurnResult::error(e.to_string()),
            }
        };
        let bound: Vec<Tool> = adapted
            .iter()
            .map(|tool| tool.definition().clone())
            .collect();

        let mut messages = self.build_initial_messages(request).await;

        for turn in 0..MAX_TURNS {
            tracing::debug!(turn, model = request.model, "dispatching to provider");
            let (response, _usage) = match provider.complete(&messages, &bound).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "provider invocation failed");
                    return TurnResult::error(e.to_string());
                }
            };
            messages.push(response.clone());

            let requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();
            if requests.is_empty() {
                return TurnResult::finished(response.text(), transcript(&messages));
            }

            // One tool-result message per request, in request order, even when
            // individual calls fail
            for tool_request in &requests {
                let text = execute_tool(tool_request, &adapted).await;
                messages.push(Message::user().with_tool_response(&tool_request.id, text));
            }
        }

        tracing::warn!(model = request.model, "turn budget exhausted");
        TurnResult::stopped(transcript(&messages))
    }

    async fn build_initial_messages(&self, request: &TurnRequest<'_>) -> Vec<Message> {
        let mut messages: Vec<Message> = request
            .history
            .iter()
            .map(|entry| match entry.role {
                HistoryRole::User => Message::user().with_text(&entry.text),
                HistoryRole::Model => Message::assistant().with_text(&entry.text),
            })
            .collect();

        let mut user_message = Message::user().with_text(request.prompt);
        for block in normalize(request.attachments, self.extractor.as_ref()).await {
            user_message = user_message.with_content(block.into());
        }
        messages.push(user_message);
        messages
    }
}

async fn execute_tool(request: &ToolRequest, adapted: &[AdaptedTool]) -> String {
    match &request.tool_call {
        Ok(call) => match adapted.iter().find(|tool| tool.name() == call.name) {
            Some(tool) => tool.invoke(call.arguments.clone()).await,
            None => format!("Error: {}", AgentError::ToolNotFound(call.name.clone())),
        },
        Err(e) => format!("Error: {e}"),
    }
}

fn transcript(messages: &[Message]) -> Vec<TranscriptEntry> {
    messages
        .iter()
        .map(|message| {
            if message.is_tool_response() {
                let content = message
                    .content
                    .iter()
                    .filter_map(|c| c.as_tool_response())
                    .map(|r| r.text.clone())
                    .collect::<Vec<_>>()
                    .join("\n");
                TranscriptEntry {
                    role: "tool".to_string(),
                    content,
                }
            } else {
                let role = match message.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                TranscriptEntry {
                    role: role.to_string(),
                    content: message.text(),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::UnsupportedExtractor;
    use crate::models::tool::ToolCall;
    use crate::providers::mock::{FailingProvider, MockProvider};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // RUST_LOG=debug surfaces the loop's tracing output when a test fails
    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn mcp_server_with_tools(tools: serde_json::Value) -> MockServer {
        init_logging();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": {"capabilities": {}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(
                json!({"method": "notifications/initialized"}),
            ))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "tools/list"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 2, "result": {"tools": tools}
            })))
            .mount(&server)
            .await;
        server
    }

    async fn connected_agent(server: &MockServer) -> Agent {
        let session = Arc::new(McpSession::new());
        session
            .connect(&format!("{}/mcp", server.uri()))
            .await
            .unwrap();
        Agent::new(session, Arc::new(UnsupportedExtractor))
    }

    fn request<'a>(prompt: &'a str, history: &'a [HistoryEntry]) -> TurnRequest<'a> {
        TurnRequest {
            prompt,
            attachments: &[],
            model: "gpt-4o-mini",
            credential: "test-key",
            history,
        }
    }

    fn mock_tool_call_response(name: &str, text: &str) -> Mock {
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(
                json!({"method": "tools/call", "params": {"name": name}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 9,
                "result": {"content": [{"type": "text", "text": text}]}
            })))
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let agent = Agent::new(Arc::new(McpSession::new()), Arc::new(UnsupportedExtractor));
        let result = agent
            .run_turn(TurnRequest {
                prompt: "hi",
                attachments: &[],
                model: "gpt-4o-mini",
                credential: "",
                history: &[],
            })
            .await;

        assert!(!result.success);
        assert_eq!(result.outcome, TurnOutcome::Error);
        assert_eq!(result.content, "No API key provided for model: gpt-4o-mini");
        assert!(result.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_model() {
        let agent = Agent::new(Arc::new(McpSession::new()), Arc::new(UnsupportedExtractor));
        let result = agent
            .run_turn(TurnRequest {
                prompt: "hi",
                attachments: &[],
                model: "llama-3-70b",
                credential: "key",
                history: &[],
            })
            .await;

        assert_eq!(result.outcome, TurnOutcome::Error);
        assert_eq!(result.content, "Unsupported model: llama-3-70b");
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let agent = Agent::new(Arc::new(McpSession::new()), Arc::new(UnsupportedExtractor));
        let result = agent.run_turn(request("hi", &[])).await;

        assert_eq!(result.outcome, TurnOutcome::Error);
        assert!(result.content.contains("not connected"));
    }

    #[tokio::test]
    async fn test_simple_final_response() {
        let server = mcp_server_with_tools(json!([])).await;
        let agent = connected_agent(&server).await;
        let provider = MockProvider::new(vec![Message::assistant().with_text("4")]);

        let result = agent
            .run_with_provider(
                &request("What is 2+2?", &[]),
                ProviderFamily::OpenAi,
                &provider,
            )
            .await;

        assert!(result.success);
        assert_eq!(result.outcome, TurnOutcome::Final);
        assert_eq!(result.content, "4");
        assert_eq!(
            result.transcript,
            vec![
                TranscriptEntry {
                    role: "user".into(),
                    content: "What is 2+2?".into()
                },
                TranscriptEntry {
                    role: "model".into(),
                    content: "4".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_history_replayed_before_prompt() {
        let server = mcp_server_with_tools(json!([])).await;
        let agent = connected_agent(&server).await;
        let provider = MockProvider::new(vec![Message::assistant().with_text("still here")]);
        let history = vec![
            HistoryEntry {
                role: HistoryRole::User,
                text: "hello".into(),
            },
            HistoryEntry {
                role: HistoryRole::Model,
                text: "hi!".into(),
            },
        ];

        let result = agent
            .run_with_provider(
                &request("are you there?", &history),
                ProviderFamily::OpenAi,
                &provider,
            )
            .await;

        assert_eq!(result.transcript.len(), 4);
        assert_eq!(result.transcript[0].role, "user");
        assert_eq!(result.transcript[0].content, "hello");
        assert_eq!(result.transcript[1].role, "model");
        assert_eq!(result.transcript[2].content, "are you there?");
    }

    #[tokio::test]
    async fn test_tool_call_then_final() {
        let server = mcp_server_with_tools(json!([{"name": "echo"}])).await;
        mock_tool_call_response("echo", "echoed!")
            .mount(&server)
            .await;
        let agent = connected_agent(&server).await;

        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("echo", json!({"message": "test"})))),
            Message::assistant().with_text("Done!"),
        ]);

        let result = agent
            .run_with_provider(&request("Echo test", &[]), ProviderFamily::OpenAi, &provider)
            .await;

        assert!(result.success);
        assert_eq!(result.content, "Done!");
        // user, model (tool request), tool, model
        assert_eq!(result.transcript.len(), 4);
        assert_eq!(result.transcript[2].role, "tool");
        assert_eq!(result.transcript[2].content, "echoed!");
    }

    #[tokio::test]
    async fn test_tool_results_preserve_order_through_failure() {
        let server = mcp_server_with_tools(json!([
            {"name": "t1"}, {"name": "t2"}, {"name": "t3"}
        ]))
        .await;
        mock_tool_call_response("t1", "one")
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(
                json!({"method": "tools/call", "params": {"name": "t2"}}),
            ))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mock_tool_call_response("t3", "three")
            .mount(&server)
            .await;
        let agent = connected_agent(&server).await;

        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("t1", json!({}))))
                .with_tool_request("2", Ok(ToolCall::new("t2", json!({}))))
                .with_tool_request("3", Ok(ToolCall::new("t3", json!({})))),
            Message::assistant().with_text("all done"),
        ]);

        let result = agent
            .run_with_provider(&request("run all", &[]), ProviderFamily::OpenAi, &provider)
            .await;

        assert!(result.success);
        let tool_entries: Vec<&TranscriptEntry> = result
            .transcript
            .iter()
            .filter(|entry| entry.role == "tool")
            .collect();
        assert_eq!(tool_entries.len(), 3);
        assert_eq!(tool_entries[0].content, "one");
        assert!(tool_entries[1].content.starts_with("Error: "));
        assert_eq!(tool_entries[2].content, "three");
    }

    #[tokio::test]
    async fn test_unknown_tool_renders_error_result() {
        let server = mcp_server_with_tools(json!([])).await;
        let agent = connected_agent(&server).await;

        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("phantom", json!({})))),
            Message::assistant().with_text("recovered"),
        ]);

        let result = agent
            .run_with_provider(&request("go", &[]), ProviderFamily::OpenAi, &provider)
            .await;

        assert!(result.success);
        let tool_entry = result
            .transcript
            .iter()
            .find(|entry| entry.role == "tool")
            .unwrap();
        assert!(tool_entry.content.contains("Tool not found: phantom"));
    }

    #[tokio::test]
    async fn test_turn_budget_exhaustion_stops() {
        let server = mcp_server_with_tools(json!([])).await;
        let agent = connected_agent(&server).await;

        // Every response requests another tool call; the loop must stop anyway
        let responses: Vec<Message> = (0..MAX_TURNS + 1)
            .map(|i| {
                Message::assistant().with_tool_request(
                    i.to_string(),
                    Ok(ToolCall::new("loop_forever", json!({}))),
                )
            })
            .collect();
        let provider = MockProvider::new(responses);

        let result = agent
            .run_with_provider(&request("never ends", &[]), ProviderFamily::OpenAi, &provider)
            .await;

        assert!(!result.success);
        assert_eq!(result.outcome, TurnOutcome::Stopped);
        assert_eq!(result.content, STOPPED_MESSAGE);
        // 1 user + MAX_TURNS * (model + tool result)
        assert_eq!(result.transcript.len(), 1 + MAX_TURNS * 2);
    }

    #[tokio::test]
    async fn test_provider_failure_is_error_outcome() {
        let server = mcp_server_with_tools(json!([])).await;
        let agent = connected_agent(&server).await;
        let provider = FailingProvider {
            message: "rate limited".into(),
        };

        let result = agent
            .run_with_provider(&request("hi", &[]), ProviderFamily::OpenAi, &provider)
            .await;

        assert!(!result.success);
        assert_eq!(result.outcome, TurnOutcome::Error);
        assert!(result.content.contains("rate limited"));
        assert!(result.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_attachments_folded_into_user_message() {
        let server = mcp_server_with_tools(json!([])).await;
        let agent = connected_agent(&server).await;
        let provider = MockProvider::new(vec![Message::assistant().with_text("noted")]);
        let attachments = vec![FileAttachment::new(
            "notes.txt",
            "text/plain",
            "remember this",
        )];

        let result = agent
            .run_with_provider(
                &TurnRequest {
                    prompt: "read my notes",
                    attachments: &attachments,
                    model: "gpt-4o-mini",
                    credential: "test-key",
                    history: &[],
                },
                ProviderFamily::OpenAi,
                &provider,
            )
            .await;

        assert!(result.success);
        assert_eq!(
            result.transcript[0].content,
            "read my notes\nremember this"
        );
    }
}
