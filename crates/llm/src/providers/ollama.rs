use super::{
    build_http_client, CompletionRequest, CompletionResponse, LlmProvider, ProviderId, TokenUsage,
};
use crate::config::ProviderKind;
use async_trait::async_trait;
use common::{LlmError, LlmResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
const PROVIDER: &str = "ollama";

/// Client for the native Ollama generate API. Needs no credentials, so it
/// is always available once constructed.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    model: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(model: String, endpoint: Option<String>, timeout: Duration) -> LlmResult<Self> {
        Ok(Self {
            model,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderKind::Ollama, &self.model)
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let start = Instant::now();

        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system_prompt.clone(),
            stream: false,
            options: GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        debug!(model = %self.model, endpoint = %self.endpoint, "sending request to Ollama");

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(PROVIDER, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let usage = TokenUsage::new(
            parsed.prompt_eval_count.unwrap_or(0),
            parsed.eval_count.unwrap_or(0),
        );

        let elapsed = start.elapsed();
        info!(
            model = %self.model,
            elapsed_ms = elapsed.as_millis() as u64,
            "Ollama completion finished"
        );

        Ok(CompletionResponse {
            content: parsed.response,
            model: self.model.clone(),
            usage,
            elapsed,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}
