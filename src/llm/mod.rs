//! LLM provider layer.
//!
//! Every model backend sits behind [`LlmProvider`], a synchronous,
//! JSON-biased text generation call. Providers are built explicitly with
//! [`build_provider`] and handed to whoever needs them; there is no global
//! client. [`ProviderKind::detect`] picks a backend from environment
//! variables when the config does not name one.

pub mod anthropic;
pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;

use std::collections::HashMap;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

use crate::error::ConfigError;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors from the LLM subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("LLM provider is not reachable at {url}")]
    #[diagnostic(
        code(devkg::llm::unavailable),
        help("Start Ollama with `ollama serve`, or set an API key for a hosted provider.")
    )]
    Unavailable { url: String },

    #[error("{provider} requires an API key in ${var}")]
    #[diagnostic(
        code(devkg::llm::missing_api_key),
        help("Export {var}, or choose another provider in the [provider] section of devkg.toml.")
    )]
    MissingApiKey { provider: String, var: String },

    #[error("LLM request failed: {message}")]
    #[diagnostic(
        code(devkg::llm::request_failed),
        help("Check network connectivity and that the configured model exists.")
    )]
    RequestFailed { message: String },

    #[error("LLM endpoint returned HTTP {status}: {body}")]
    #[diagnostic(
        code(devkg::llm::http_status),
        help("A 401/403 means the API key was rejected; a 429 means the provider is rate limiting.")
    )]
    Http { status: u16, body: String },

    #[error("failed to parse LLM response: {message}")]
    #[diagnostic(
        code(devkg::llm::parse_error),
        help("The provider returned an unexpected response envelope.")
    )]
    ParseError { message: String },

    #[error("LLM request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(devkg::llm::timeout),
        help("Increase provider.timeout_secs or use a smaller model.")
    )]
    Timeout { timeout_secs: u64 },
}

/// Text returned by a provider for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    /// The provider reported that generation stopped at the output token
    /// limit (`length`, `max_tokens`, `MAX_TOKENS`).
    pub stopped_at_limit: bool,
}

impl ModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stopped_at_limit: false,
        }
    }
}

/// A text-generation backend.
///
/// Implementations must be shareable across rayon workers: sessions are
/// processed in parallel against one provider handle.
pub trait LlmProvider: Send + Sync {
    /// Short backend name, used in logs.
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Generate a completion for `prompt`, asking for JSON output.
    fn generate_content(&self, prompt: &str) -> Result<ModelResponse, LlmError>;
}

impl<P: LlmProvider + ?Sized> LlmProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn generate_content(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
        (**self).generate_content(prompt)
    }
}

// ── Provider selection ──────────────────────────────────────────────────

/// Which backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    /// Choose a provider from environment variables.
    ///
    /// Precedence: `GEMINI_API_KEY`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// then local Ollama. Empty values count as unset.
    pub fn detect(env: &HashMap<String, String>) -> Self {
        let set = |var: &str| env.get(var).is_some_and(|v| !v.trim().is_empty());
        if set("GEMINI_API_KEY") {
            Self::Gemini
        } else if set("OPENAI_API_KEY") {
            Self::OpenAi
        } else if set("ANTHROPIC_API_KEY") {
            Self::Anthropic
        } else {
            Self::Ollama
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Ollama => "llama3.1",
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Gemini => "gemini-2.5-flash",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    /// Environment variable holding the API key, if the backend needs one.
    pub fn api_key_var(self) -> Option<&'static str> {
        match self {
            Self::Ollama => None,
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            _ => Err(ConfigError::UnknownProvider {
                name: s.to_string(),
            }),
        }
    }
}

/// Fully resolved settings for one provider handle.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Defaults for `kind`, with the API key and `OLLAMA_BASE_URL` taken from `env`.
    pub fn from_env(kind: ProviderKind, env: &HashMap<String, String>) -> Self {
        let non_empty = |var: &str| env.get(var).filter(|v| !v.trim().is_empty()).cloned();

        let base_url = match kind {
            ProviderKind::Ollama => non_empty("OLLAMA_BASE_URL"),
            _ => None,
        }
        .unwrap_or_else(|| kind.default_base_url().to_string());

        Self {
            kind,
            model: kind.default_model().to_string(),
            base_url,
            timeout_secs: 120,
            api_key: kind.api_key_var().and_then(non_empty),
        }
    }
}

/// Construct the provider described by `config`.
pub fn build_provider(config: &ProviderConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let require_key = || {
        config.api_key.clone().ok_or_else(|| LlmError::MissingApiKey {
            provider: config.kind.to_string(),
            var: config.kind.api_key_var().unwrap_or_default().to_string(),
        })
    };

    let provider: Box<dyn LlmProvider> = match config.kind {
        ProviderKind::Ollama => Box::new(OllamaProvider::new(config.clone())),
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(config.clone(), require_key()?)),
        ProviderKind::Anthropic => {
            Box::new(AnthropicProvider::new(config.clone(), require_key()?))
        }
        ProviderKind::Gemini => Box::new(GeminiProvider::new(config.clone(), require_key()?)),
    };

    tracing::debug!(
        provider = provider.name(),
        model = provider.model(),
        "built LLM provider"
    );
    Ok(provider)
}
