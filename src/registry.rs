//! Static mapping from model identifier to provider family.
//!
//! Every identifier belongs to at most one family. An identifier found in no
//! list is an error at the call site, never a silent default.

use strum_macros::EnumIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ProviderFamily {
    OpenAi,
    Gemini,
    Claude,
    Grok,
}

pub const OPENAI_MODELS: &[&str] = &[
    "gpt-5",
    "gpt-5-mini",
    "gpt-5-nano",
    "gpt-5-chat",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4o",
    "gpt-4o-mini",
    "o3",
    "o3-mini",
    "o3-mini-high",
    "o3-pro",
    "o4-mini",
    "o4-mini-high",
    "dall-e-2",
    "dall-e-3",
];

pub const GEMINI_MODELS: &[&str] = &[
    "gemini-1.5-flash",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-live-2.5-flash-preview",
    "gemini-2.5-flash-preview-native-audio-dialog",
    "gemini-2.5-flash-exp-native-audio-thinking-dialog",
    "gemini-2.5-flash-preview-tts",
    "gemini-2.5-pro-preview-tts",
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
];

pub const CLAUDE_MODELS: &[&str] = &[
    "claude-opus-4-1-20250805",
    "claude-opus-4-20250514",
    "claude-sonnet-4-20250514",
    "claude-3-7-sonnet-20250219",
    "claude-3-5-haiku-20241022",
    "claude-3-5-sonnet-20241022",
    "claude-3-haiku-20240307",
];

pub const GROK_MODELS: &[&str] = &[
    "grok-1",
    "grok-1.5",
    "grok-2",
    "grok-2-mini",
    "grok-3",
    "grok-3-mini",
    "grok-4",
    "grok-4-heavy",
];

impl ProviderFamily {
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            ProviderFamily::OpenAi => OPENAI_MODELS,
            ProviderFamily::Gemini => GEMINI_MODELS,
            ProviderFamily::Claude => CLAUDE_MODELS,
            ProviderFamily::Grok => GROK_MODELS,
        }
    }
}

/// Resolve a model identifier to its provider family, if any.
pub fn resolve(model: &str) -> Option<ProviderFamily> {
    use strum::IntoEnumIterator;
    ProviderFamily::iter().find(|family| family.models().contains(&model))
}
