use super::{
    build_http_client, openai_compat, CompletionRequest, CompletionResponse, LlmProvider,
    ProviderId,
};
use crate::config::ProviderKind;
use async_trait::async_trait;
use common::LlmResult;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434/v1";
const PROVIDER: &str = "local";

/// OpenAI-compatible local runtime (LM Studio, llama.cpp server, Ollama's
/// `/v1` facade). Takes no credentials, so availability only depends on
/// construction succeeding.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    model: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl LocalProvider {
    pub fn new(model: String, endpoint: Option<String>, timeout: Duration) -> LlmResult<Self> {
        Ok(Self {
            model,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for LocalProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderKind::Local, &self.model)
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        debug!(model = %self.model, endpoint = %self.endpoint, "sending request to local model");

        let response = openai_compat::complete(
            &self.client,
            PROVIDER,
            self.chat_url(),
            &[],
            &self.model,
            &request,
            self.timeout,
        )
        .await?;

        info!(
            model = %self.model,
            elapsed_ms = response.elapsed.as_millis() as u64,
            "local completion finished"
        );
        Ok(response)
    }
}
