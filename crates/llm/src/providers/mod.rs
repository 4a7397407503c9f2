use async_trait::async_trait;
use common::LlmResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::ProviderKind;

pub mod anthropic;
pub mod apigee;
pub mod enterprise;
pub mod gemini;
pub mod local;
pub mod ollama;
pub mod openai;
mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use apigee::ApigeeProvider;
pub use enterprise::EnterpriseProvider;
pub use gemini::GeminiProvider;
pub use local::LocalProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Request object for LLM providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: &str) -> Self {
        self.system_prompt = Some(system_prompt.to_string());
        self
    }

    pub fn with_parameters(mut self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// Response object from LLM providers.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub elapsed: Duration,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Rough 4-bytes-per-token estimate for providers that do not report
    /// usage.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        Self::new(prompt.len() as u32 / 4, completion.len() as u32 / 4)
    }
}

/// Provider identification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderId {
    pub kind: ProviderKind,
    pub model: String,
}

impl ProviderId {
    pub fn new(kind: ProviderKind, model: &str) -> Self {
        Self {
            kind,
            model: model.to_string(),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.model)
    }
}

/// Unified LLM provider contract.
///
/// `is_available` is a pure function of the required configuration fields;
/// it performs no network traffic. `complete` raises a `Configuration`
/// error when the client is not available rather than sending a request
/// that can only fail.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn is_available(&self) -> bool;

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;

    fn name(&self) -> String {
        self.id().to_string()
    }
}

/// Concrete provider clients behind one exhaustively matched enum.
///
/// A new provider variant will not compile until every dispatch arm below
/// handles it, which replaces the stringly-typed switch the factory would
/// otherwise need.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
    Gemini(GeminiProvider),
    Ollama(OllamaProvider),
    Local(LocalProvider),
    Enterprise(EnterpriseProvider),
    Apigee(ApigeeProvider),
}

#[async_trait]
impl LlmProvider for ProviderClient {
    fn id(&self) -> ProviderId {
        match self {
            ProviderClient::OpenAi(p) => p.id(),
            ProviderClient::Anthropic(p) => p.id(),
            ProviderClient::Gemini(p) => p.id(),
            ProviderClient::Ollama(p) => p.id(),
            ProviderClient::Local(p) => p.id(),
            ProviderClient::Enterprise(p) => p.id(),
            ProviderClient::Apigee(p) => p.id(),
        }
    }

    fn is_available(&self) -> bool {
        match self {
            ProviderClient::OpenAi(p) => p.is_available(),
            ProviderClient::Anthropic(p) => p.is_available(),
            ProviderClient::Gemini(p) => p.is_available(),
            ProviderClient::Ollama(p) => p.is_available(),
            ProviderClient::Local(p) => p.is_available(),
            ProviderClient::Enterprise(p) => p.is_available(),
            ProviderClient::Apigee(p) => p.is_available(),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        match self {
            ProviderClient::OpenAi(p) => p.complete(request).await,
            ProviderClient::Anthropic(p) => p.complete(request).await,
            ProviderClient::Gemini(p) => p.complete(request).await,
            ProviderClient::Ollama(p) => p.complete(request).await,
            ProviderClient::Local(p) => p.complete(request).await,
            ProviderClient::Enterprise(p) => p.complete(request).await,
            ProviderClient::Apigee(p) => p.complete(request).await,
        }
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            common::LlmError::Configuration(format!("failed to create HTTP client: {e}"))
        })
}
