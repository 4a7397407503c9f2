use common::{LlmError, LlmResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingsProviderKind {
    OpenAi,
    Gemini,
    Ollama,
    Local,
}

impl EmbeddingsProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingsProviderKind::OpenAi => "openai",
            EmbeddingsProviderKind::Gemini => "gemini",
            EmbeddingsProviderKind::Ollama => "ollama",
            EmbeddingsProviderKind::Local => "local",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            EmbeddingsProviderKind::OpenAi => "text-embedding-3-small",
            EmbeddingsProviderKind::Gemini => "text-embedding-004",
            EmbeddingsProviderKind::Ollama => "nomic-embed-text",
            EmbeddingsProviderKind::Local => "nomic-embed-text",
        }
    }
}

impl fmt::Display for EmbeddingsProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingsProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingsProviderKind::OpenAi),
            "gemini" | "google" => Ok(EmbeddingsProviderKind::Gemini),
            "ollama" => Ok(EmbeddingsProviderKind::Ollama),
            "local" => Ok(EmbeddingsProviderKind::Local),
            other => Err(LlmError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Configuration for the embeddings client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_provider")]
    pub provider: EmbeddingsProviderKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Inputs per upstream call; larger requests are split into chunks of
    /// this size.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: None,
            api_base: None,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingsConfig {
    pub fn from_env() -> LlmResult<Self> {
        dotenv::dotenv().ok();

        let provider_name =
            env::var("EMBEDDINGS_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = provider_name.parse::<EmbeddingsProviderKind>()?;

        let batch_size = env::var("EMBEDDINGS_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or_else(default_batch_size);

        let timeout_secs = env::var("EMBEDDINGS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_timeout_secs);

        Ok(Self {
            provider,
            model: env::var("EMBEDDINGS_MODEL").ok().filter(|m| !m.is_empty()),
            api_key: env::var("EMBEDDINGS_API_KEY").ok().filter(|k| !k.is_empty()),
            api_base: env::var("EMBEDDINGS_API_BASE").ok().filter(|b| !b.is_empty()),
            batch_size,
            timeout_secs,
        })
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

fn default_provider() -> EmbeddingsProviderKind {
    EmbeddingsProviderKind::OpenAi
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    30
}
