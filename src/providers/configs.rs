pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const XAI_HOST: &str = "https://api.x.ai";
pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";

/// Config for any provider speaking the OpenAI chat-completions wire format.
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
}

impl OpenAiProviderConfig {
    pub fn new<M: Into<String>, K: Into<String>>(model: M, api_key: K) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }
}

pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
}

impl AnthropicProviderConfig {
    pub fn new<M: Into<String>, K: Into<String>>(model: M, api_key: K) -> Self {
        Self {
            host: ANTHROPIC_HOST.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }
}

pub struct GeminiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
}

impl GeminiProviderConfig {
    pub fn new<M: Into<String>, K: Into<String>>(model: M, api_key: K) -> Self {
        Self {
            host: GEMINI_HOST.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }
}
