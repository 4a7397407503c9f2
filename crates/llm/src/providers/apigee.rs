use super::{
    build_http_client, openai_compat, CompletionRequest, CompletionResponse, LlmProvider,
    ProviderId,
};
use crate::auth::TokenManager;
use crate::config::ProviderKind;
use async_trait::async_trait;
use common::{LlmError, LlmResult};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const PROVIDER: &str = "apigee";

/// OpenAI-shaped gateway behind Apigee. Sends the bearer token from the
/// Apigee token manager plus an optional `x-api-key` routing key when one
/// is configured for the proxy.
#[derive(Debug, Clone)]
pub struct ApigeeProvider {
    model: String,
    endpoint: Option<String>,
    api_key: Option<String>,
    tokens: Arc<TokenManager>,
    client: Client,
    timeout: Duration,
}

impl ApigeeProvider {
    pub fn new(
        model: String,
        endpoint: Option<String>,
        api_key: Option<String>,
        tokens: Arc<TokenManager>,
        timeout: Duration,
    ) -> LlmResult<Self> {
        Ok(Self {
            model,
            endpoint: endpoint.filter(|e| !e.is_empty()),
            api_key: api_key.filter(|k| !k.is_empty()),
            tokens,
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    fn chat_url(&self) -> LlmResult<String> {
        let base = self.endpoint.as_ref().ok_or_else(|| {
            LlmError::Configuration("Apigee gateway base URL is not configured".to_string())
        })?;
        Ok(format!("{}/chat/completions", base.trim_end_matches('/')))
    }
}

#[async_trait]
impl LlmProvider for ApigeeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderKind::Apigee, &self.model)
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some() && self.tokens.is_configured()
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let url = self.chat_url()?;
        let token = self.tokens.get_valid_token()?;

        debug!(model = %self.model, "sending request to Apigee gateway");

        let mut headers = vec![("Authorization", format!("Bearer {token}"))];
        if let Some(api_key) = &self.api_key {
            headers.push(("x-api-key", api_key.clone()));
        }

        let response = openai_compat::complete(
            &self.client,
            PROVIDER,
            url,
            &headers,
            &self.model,
            &request,
            self.timeout,
        )
        .await?;

        info!(
            model = %self.model,
            elapsed_ms = response.elapsed.as_millis() as u64,
            "Apigee completion finished"
        );
        Ok(response)
    }
}
