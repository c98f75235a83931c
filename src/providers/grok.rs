use anyhow::Result;
use async_trait::async_trait;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::openai::OpenAiProvider;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Grok models speak the OpenAI chat-completions wire format against the xAI
/// host, so this provider delegates to the OpenAI implementation while keeping
/// the family distinct for dispatch.
pub struct GrokProvider {
    inner: OpenAiProvider,
}

impl GrokProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        Ok(Self {
            inner: OpenAiProvider::new(config)?,
        })
    }
}

#[async_trait]
impl Provider for GrokProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Message, Usage)> {
        self.inner.complete(messages, tools).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Hi from Grok"}
                }]
            })))
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig::new("grok-3", "test_key").with_host(mock_server.uri());
        let provider = GrokProvider::new(config)?;

        let messages = vec![Message::user().with_text("Hello?")];
        let (message, _) = provider.complete(&messages, &[]).await?;
        assert_eq!(message.content[0].as_text(), Some("Hi from Grok"));
        Ok(())
    }
}
