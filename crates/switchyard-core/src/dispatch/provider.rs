//! Provider identities and completion exchange types

use serde::{Deserialize, Serialize};

/// Supported completion providers
///
/// The known roster matches the deployed integrations; anything else parses
/// into `Custom` so configuration can introduce a provider without a code
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// OpenAI (GPT models)
    OpenAI,
    /// Google (Gemini models)
    Google,
    /// Anthropic (Claude models)
    Anthropic,
    /// Perplexity (web-search capable Sonar models)
    Perplexity,
    /// Custom provider
    Custom(String),
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::OpenAI => write!(f, "openai"),
            ProviderId::Google => write!(f, "google"),
            ProviderId::Anthropic => write!(f, "anthropic"),
            ProviderId::Perplexity => write!(f, "perplexity"),
            ProviderId::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAI),
            "google" => Ok(ProviderId::Google),
            "anthropic" => Ok(ProviderId::Anthropic),
            "perplexity" => Ok(ProviderId::Perplexity),
            _ => Ok(ProviderId::Custom(s.to_string())),
        }
    }
}

/// Token accounting reported by a provider for one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Create usage from the two counters
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Total tokens billed for the exchange
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// One completion request as handed to a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model name/ID
    pub model: String,
    /// User prompt text
    pub prompt: String,
    /// Optional system prompt
    pub system: Option<String>,
    /// Temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a new request with just model and prompt
    pub fn new<S: Into<String>>(model: S, prompt: S) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A successful completion as returned by a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Model that actually served the request
    pub model: String,
    /// Token accounting for the exchange
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Create a response
    pub fn new(text: impl Into<String>, model: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage,
        }
    }
}
