//! Shared request plumbing for OpenAI-compatible gateways (local runtimes,
//! the enterprise gateway, and Apigee). Each caller supplies its own auth
//! headers; everything else about the wire format is identical.

use super::{CompletionRequest, CompletionResponse, TokenUsage};
use common::{LlmError, LlmResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

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

/// Execute one chat completion against an OpenAI-compatible endpoint.
pub(crate) async fn complete(
    client: &Client,
    provider: &str,
    url: String,
    headers: &[(&str, String)],
    model: &str,
    request: &CompletionRequest,
    timeout: Duration,
) -> LlmResult<CompletionResponse> {
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
        model: model.to_string(),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };

    let mut builder = client.post(url).json(&body);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| LlmError::from_reqwest(provider, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(LlmError::Http {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    let parsed: ChatCompletionResponse =
        response.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: provider.to_string(),
            message: e.to_string(),
        })?;

    let choice = parsed.choices.first().ok_or_else(|| LlmError::InvalidResponse {
        provider: provider.to_string(),
        message: "response contained no choices".to_string(),
    })?;

    let usage = match parsed.usage {
        Some(u) => TokenUsage::new(u.prompt_tokens, u.completion_tokens),
        None => TokenUsage::estimate(&request.prompt, &choice.message.content),
    };

    Ok(CompletionResponse {
        content: choice.message.content.clone(),
        model: model.to_string(),
        usage,
        elapsed: start.elapsed(),
    })
}
