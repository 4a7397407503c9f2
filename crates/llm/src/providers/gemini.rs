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

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER: &str = "gemini";

/// Client for the Google Generative Language API.
///
/// Auth travels as a `key` query parameter rather than a header, and the
/// response nests text under `candidates[].content.parts[]`.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(
        api_key: Option<String>,
        model: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> LlmResult<Self> {
        Ok(Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            model,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    fn generate_url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            api_key
        )
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderKind::Gemini, &self.model)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LlmError::Configuration("Gemini API key is not configured".to_string())
        })?;

        let start = Instant::now();

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system_prompt.as_ref().map(|s| Content {
                role: None,
                parts: vec![Part { text: s.clone() }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        debug!(model = %self.model, "sending request to Gemini");

        let response = self
            .client
            .post(self.generate_url(api_key))
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

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                message: "response contained no candidates".to_string(),
            })?;

        let usage = match parsed.usage_metadata {
            Some(u) => TokenUsage::new(u.prompt_token_count, u.candidates_token_count),
            None => TokenUsage::estimate(&request.prompt, &text),
        };

        let elapsed = start.elapsed();
        info!(
            model = %self.model,
            total_tokens = usage.total_tokens,
            elapsed_ms = elapsed.as_millis() as u64,
            "Gemini completion finished"
        );

        Ok(CompletionResponse {
            content: text,
            model: self.model.clone(),
            usage,
            elapsed,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}
