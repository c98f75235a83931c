use anyhow::Result;

use super::anthropic::AnthropicProvider;
use super::base::Provider;
use super::configs::{
    AnthropicProviderConfig, GeminiProviderConfig, OpenAiProviderConfig, XAI_HOST,
};
use super::gemini::GeminiProvider;
use super::grok::GrokProvider;
use super::openai::OpenAiProvider;
use crate::registry::ProviderFamily;

/// Build the provider client for a resolved family. Dispatch is a closed
/// match, so adding a family is a compile error until it is handled here.
pub fn provider_for(
    family: ProviderFamily,
    model: &str,
    api_key: &str,
) -> Result<Box<dyn Provider + Send + Sync>> {
    match family {
        ProviderFamily::OpenAi => Ok(Box::new(OpenAiProvider::new(OpenAiProviderConfig::new(
            model, api_key,
        ))?)),
        ProviderFamily::Grok => Ok(Box::new(GrokProvider::new(
            OpenAiProviderConfig::new(model, api_key).with_host(XAI_HOST),
        )?)),
        ProviderFamily::Claude => Ok(Box::new(AnthropicProvider::new(
            AnthropicProviderConfig::new(model, api_key),
        )?)),
        ProviderFamily::Gemini => Ok(Box::new(GeminiProvider::new(GeminiProviderConfig::new(
            model, api_key,
        ))?)),
    }
}
