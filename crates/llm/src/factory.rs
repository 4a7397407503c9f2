use crate::auth::TokenManager;
use crate::config::{LlmConfig, ProviderKind};
use crate::providers::{
    AnthropicProvider, ApigeeProvider, EnterpriseProvider, GeminiProvider, LocalProvider,
    OllamaProvider, OpenAiProvider, ProviderClient,
};
use common::LlmResult;
use std::sync::Arc;
use tracing::info;

/// Factory for constructing provider clients from configuration.
///
/// Construction is lenient: a hosted provider without an API key is built
/// but reports `is_available() == false` and fails with a `Configuration`
/// error on the first call. Unsupported provider names never reach this
/// point, `ProviderKind` parsing rejects them.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &LlmConfig) -> LlmResult<ProviderClient> {
        let model = config.model_name();
        let timeout = config.timeout();

        let client = match config.provider {
            ProviderKind::OpenAi => ProviderClient::OpenAi(OpenAiProvider::new(
                config.api_key.clone(),
                model,
                config.api_base.clone(),
                timeout,
            )?),
            ProviderKind::Anthropic => ProviderClient::Anthropic(AnthropicProvider::new(
                config.api_key.clone(),
                model,
                config.api_base.clone(),
                timeout,
            )?),
            ProviderKind::Gemini => ProviderClient::Gemini(GeminiProvider::new(
                config.api_key.clone(),
                model,
                config.api_base.clone(),
                timeout,
            )?),
            ProviderKind::Ollama => ProviderClient::Ollama(OllamaProvider::new(
                model,
                config.api_base.clone(),
                timeout,
            )?),
            ProviderKind::Local => ProviderClient::Local(LocalProvider::new(
                model,
                config.api_base.clone(),
                timeout,
            )?),
            ProviderKind::Enterprise => ProviderClient::Enterprise(EnterpriseProvider::new(
                model,
                config.api_base.clone(),
                Arc::new(TokenManager::enterprise()),
                timeout,
            )?),
            ProviderKind::Apigee => ProviderClient::Apigee(ApigeeProvider::new(
                model,
                config.api_base.clone(),
                config.api_key.clone(),
                Arc::new(TokenManager::apigee()),
                timeout,
            )?),
        };

        info!(provider = %config.provider, "constructed LLM provider client");
        Ok(client)
    }

    /// Convenience wrapper: environment configuration straight to a client.
    pub fn from_env() -> LlmResult<ProviderClient> {
        let config = LlmConfig::from_env()?;
        Self::create(&config)
    }
}
