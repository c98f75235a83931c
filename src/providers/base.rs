use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for AI providers (OpenAI, Anthropic, Gemini, Grok)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message for the transcript, with tools bound when any
    /// are supplied. A response may carry tool-call requests in its content.
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Message, Usage)>;
}
