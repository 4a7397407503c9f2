use common::{LlmError, LlmResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Every provider the factory knows how to construct. Adding a variant
/// forces the dispatch sites to be updated before the crate compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
    Local,
    Enterprise,
    Apigee,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Local => "local",
            ProviderKind::Enterprise => "enterprise",
            ProviderKind::Apigee => "apigee",
        }
    }

    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Gemini,
            ProviderKind::Ollama,
            ProviderKind::Local,
            ProviderKind::Enterprise,
            ProviderKind::Apigee,
        ]
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-20241022",
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::Local => "llama-3.2-3b-instruct",
            ProviderKind::Enterprise => "gpt-4o-mini",
            ProviderKind::Apigee => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "ollama" => Ok(ProviderKind::Ollama),
            "local" => Ok(ProviderKind::Local),
            "enterprise" => Ok(ProviderKind::Enterprise),
            "apigee" => Ok(ProviderKind::Apigee),
            other => Err(LlmError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Configuration for a single LLM provider client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Model name; falls back to the provider's default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: None,
            api_base: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    /// Build configuration from environment variables, loading `.env` when
    /// present. Unknown `LLM_PROVIDER` values fail here, before any client
    /// is constructed.
    pub fn from_env() -> LlmResult<Self> {
        dotenv::dotenv().ok();

        let provider_name = env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = provider_name.parse::<ProviderKind>()?;

        let api_key = env::var("LLM_API_KEY")
            .ok()
            .or_else(|| provider_key_from_env(provider))
            .filter(|k| !k.is_empty());

        let timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_timeout_secs);

        let max_tokens = env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_tokens);

        let temperature = env::var("TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_temperature);

        Ok(Self {
            provider,
            model: env::var("LLM_MODEL").ok().filter(|m| !m.is_empty()),
            api_key,
            api_base: env::var("LLM_API_BASE")
                .ok()
                .filter(|b| !b.is_empty())
                .or_else(|| provider_base_from_env(provider)),
            timeout_secs,
            max_tokens,
            temperature,
        })
    }

    /// Environment view for one specific provider, regardless of what
    /// `LLM_PROVIDER` selects. Used when listing availability across all
    /// providers.
    pub fn for_provider(provider: ProviderKind) -> Self {
        dotenv::dotenv().ok();

        Self {
            provider,
            api_key: provider_key_from_env(provider).filter(|k| !k.is_empty()),
            api_base: provider_base_from_env(provider),
            ..Default::default()
        }
    }

    pub fn model_name(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn provider_key_from_env(provider: ProviderKind) -> Option<String> {
    let var = match provider {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::Gemini => "GEMINI_API_KEY",
        ProviderKind::Apigee => "APIGEE_API_KEY",
        _ => return None,
    };
    env::var(var).ok()
}

fn provider_base_from_env(provider: ProviderKind) -> Option<String> {
    let var = match provider {
        ProviderKind::Enterprise => "ENTERPRISE_LLM_ENDPOINT",
        ProviderKind::Apigee => "APIGEE_ENDPOINT",
        _ => return None,
    };
    env::var(var).ok().filter(|b| !b.is_empty())
}

fn default_provider() -> ProviderKind {
    ProviderKind::OpenAi
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}
