use crate::config::{EmbeddingsConfig, EmbeddingsProviderKind};
use common::{LlmError, LlmResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Provider-abstracted embeddings client.
///
/// Mirrors the LLM side: availability is a pure configuration check, every
/// upstream call carries the configured timeout, and failures surface the
/// typed error without retries. Batches larger than `batch_size` are split
/// into one upstream call per chunk; output order matches input order.
#[derive(Debug, Clone)]
pub struct EmbeddingsClient {
    kind: EmbeddingsProviderKind,
    model: String,
    api_key: Option<String>,
    endpoint: String,
    batch_size: usize,
    client: Client,
    timeout: Duration,
}

impl EmbeddingsClient {
    pub fn new(config: &EmbeddingsConfig) -> LlmResult<Self> {
        let timeout = config.timeout();
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            LlmError::Configuration(format!("failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            kind: config.provider,
            model: config.model_name(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            endpoint: config
                .api_base
                .clone()
                .unwrap_or_else(|| default_endpoint(config.provider).to_string()),
            batch_size: config.batch_size.max(1),
            client,
            timeout,
        })
    }

    pub fn from_env() -> LlmResult<Self> {
        Self::new(&EmbeddingsConfig::from_env()?)
    }

    pub fn provider(&self) -> EmbeddingsProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_available(&self) -> bool {
        match self.kind {
            EmbeddingsProviderKind::OpenAi | EmbeddingsProviderKind::Gemini => {
                self.api_key.is_some()
            }
            EmbeddingsProviderKind::Ollama | EmbeddingsProviderKind::Local => true,
        }
    }

    pub async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| LlmError::InvalidResponse {
            provider: self.kind.to_string(),
            message: "no embedding returned for input".to_string(),
        })
    }

    pub async fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if !self.is_available() {
            return Err(LlmError::Configuration(format!(
                "{} embeddings API key is not configured",
                self.kind
            )));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            debug!(
                provider = %self.kind,
                chunk_len = chunk.len(),
                "requesting embeddings chunk"
            );

            let mut chunk_vectors = match self.kind {
                EmbeddingsProviderKind::OpenAi | EmbeddingsProviderKind::Local => {
                    self.embed_openai(chunk).await?
                }
                EmbeddingsProviderKind::Gemini => self.embed_gemini(chunk).await?,
                EmbeddingsProviderKind::Ollama => self.embed_ollama(chunk).await?,
            };

            if chunk_vectors.len() != chunk.len() {
                return Err(LlmError::InvalidResponse {
                    provider: self.kind.to_string(),
                    message: format!(
                        "expected {} embeddings, got {}",
                        chunk.len(),
                        chunk_vectors.len()
                    ),
                });
            }
            vectors.append(&mut chunk_vectors);
        }

        info!(
            provider = %self.kind,
            inputs = texts.len(),
            "embeddings batch finished"
        );
        Ok(vectors)
    }

    async fn embed_openai(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.endpoint.trim_end_matches('/'));
        let body = OpenAiEmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let mut builder = self.client.post(url).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let parsed: OpenAiEmbedResponse = self.send(builder).await?;

        // Pair embeddings with inputs by the reported index, not body order.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    async fn embed_gemini(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LlmError::Configuration("Gemini embeddings API key is not configured".to_string())
        })?;

        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            api_key
        );

        let body = GeminiBatchRequest {
            requests: texts
                .iter()
                .map(|text| GeminiEmbedRequest {
                    model: format!("models/{}", self.model),
                    content: GeminiContent {
                        parts: vec![GeminiPart { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let parsed: GeminiBatchResponse = self.send(self.client.post(url).json(&body)).await?;
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn embed_ollama(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.endpoint.trim_end_matches('/'));
        let body = OllamaEmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let parsed: OllamaEmbedResponse = self.send(self.client.post(url).json(&body)).await?;
        Ok(parsed.embeddings)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> LlmResult<T> {
        let provider = self.kind.as_str();

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(provider, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                provider: provider.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: provider.to_string(),
            message: e.to_string(),
        })
    }
}

fn default_endpoint(kind: EmbeddingsProviderKind) -> &'static str {
    match kind {
        EmbeddingsProviderKind::OpenAi => "https://api.openai.com/v1",
        EmbeddingsProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        EmbeddingsProviderKind::Ollama => "http://localhost:11434",
        EmbeddingsProviderKind::Local => "http://localhost:11434/v1",
    }
}

#[derive(Debug, Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GeminiBatchRequest {
    requests: Vec<GeminiEmbedRequest>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbedRequest {
    model: String,
    content: GeminiContent,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiBatchResponse {
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn openai_config(base: &str) -> EmbeddingsConfig {
        EmbeddingsConfig {
            provider: EmbeddingsProviderKind::OpenAi,
            api_key: Some("test-api-key".to_string()),
            api_base: Some(base.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_hosted_provider_needs_key() {
        let client = EmbeddingsClient::new(&EmbeddingsConfig::default()).unwrap();
        assert!(!client.is_available());

        let client = EmbeddingsClient::new(&EmbeddingsConfig {
            provider: EmbeddingsProviderKind::Ollama,
            ..Default::default()
        })
        .unwrap();
        assert!(client.is_available());
    }

    #[tokio::test]
    async fn test_unavailable_client_fails_before_network() {
        let client = EmbeddingsClient::new(&EmbeddingsConfig::default()).unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_openai_embed_parses_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer test-api-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data": [
                    {"index": 1, "embedding": [0.4, 0.5]},
                    {"index": 0, "embedding": [0.1, 0.2]}
                ]}"#,
            )
            .create_async()
            .await;

        let client = EmbeddingsClient::new(&openai_config(&server.url())).unwrap();
        let vectors = client
            .embed_batch(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();

        // Out-of-order indices in the body still map back to input order.
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ollama_embed_shape() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [[1.0, 2.0, 3.0]]}"#)
            .create_async()
            .await;

        let client = EmbeddingsClient::new(&EmbeddingsConfig {
            provider: EmbeddingsProviderKind::Ollama,
            api_base: Some(server.url()),
            ..Default::default()
        })
        .unwrap();

        let vector = client.embed("gamma").await.unwrap();
        assert_eq!(vector, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_gemini_embed_shape() {
        let mut server = Server::new_async().await;
        server
            .mock(
                "POST",
                "/models/text-embedding-004:batchEmbedContents?key=test-api-key",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [{"values": [0.7, 0.8]}]}"#)
            .create_async()
            .await;

        let client = EmbeddingsClient::new(&EmbeddingsConfig {
            provider: EmbeddingsProviderKind::Gemini,
            api_key: Some("test-api-key".to_string()),
            api_base: Some(server.url()),
            ..Default::default()
        })
        .unwrap();

        let vector = client.embed("delta").await.unwrap();
        assert_eq!(vector, vec![0.7, 0.8]);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_invalid_response() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"index": 0, "embedding": [0.1]}]}"#)
            .create_async()
            .await;

        let client = EmbeddingsClient::new(&openai_config(&server.url())).unwrap();
        let err = client
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_upstream_error_carries_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = EmbeddingsClient::new(&openai_config(&server.url())).unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }
}
