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

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl OpenAiProvider {
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

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderKind::OpenAi, &self.model)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LlmError::Configuration("OpenAI API key is not configured".to_string())
        })?;

        let start = Instant::now();

        let mut messages = Vec::new();
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.model, "sending request to OpenAI");

        let response = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {api_key}"))
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

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let choice = parsed.choices.first().ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            message: "response contained no choices".to_string(),
        })?;

        let usage = match parsed.usage {
            Some(u) => TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            None => TokenUsage::estimate(&request.prompt, &choice.message.content),
        };

        let elapsed = start.elapsed();
        info!(
            model = %self.model,
            total_tokens = usage.total_tokens,
            elapsed_ms = elapsed.as_millis() as u64,
            "OpenAI completion finished"
        );

        Ok(CompletionResponse {
            content: choice.message.content.clone(),
            model: self.model.clone(),
            usage,
            elapsed,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn provider_with_base(base: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            Some("test-api-key".to_string()),
            "gpt-4o-mini".to_string(),
            Some(base.to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_availability_requires_key() {
        let without_key = OpenAiProvider::new(
            None,
            "gpt-4o-mini".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!without_key.is_available());

        let empty_key = OpenAiProvider::new(
            Some(String::new()),
            "gpt-4o-mini".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!empty_key.is_available());

        assert!(provider_with_base("http://localhost:9").is_available());
    }

    #[tokio::test]
    async fn test_complete_without_key_is_configuration_error() {
        let provider = OpenAiProvider::new(
            None,
            "gpt-4o-mini".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider
            .complete(CompletionRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_complete_parses_choices_and_usage() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-api-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "choices": [{"message": {"role": "assistant", "content": "Two subnets, one NAT gateway."}}],
                "usage": {"prompt_tokens": 42, "completion_tokens": 7}
            }"#,
            )
            .create_async()
            .await;

        let provider = provider_with_base(&server.url());
        let response = provider
            .complete(CompletionRequest::new("summarize the diagram"))
            .await
            .unwrap();

        assert_eq!(response.content, "Two subnets, one NAT gateway.");
        assert_eq!(response.usage.prompt_tokens, 42);
        assert_eq!(response.usage.total_tokens, 49);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_carries_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limit exceeded")
            .create_async()
            .await;

        let provider = provider_with_base(&server.url());
        let err = provider
            .complete(CompletionRequest::new("hello"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert!(matches!(err, LlmError::Http { .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider = provider_with_base(&server.url());
        let err = provider
            .complete(CompletionRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}
