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

const PROVIDER: &str = "enterprise";

/// OpenAI-shaped enterprise gateway. The bearer token is fetched from the
/// injected `TokenManager` on every call, so a refreshed token is picked up
/// without rebuilding the client.
#[derive(Debug, Clone)]
pub struct EnterpriseProvider {
    model: String,
    endpoint: Option<String>,
    tokens: Arc<TokenManager>,
    client: Client,
    timeout: Duration,
}

impl EnterpriseProvider {
    pub fn new(
        model: String,
        endpoint: Option<String>,
        tokens: Arc<TokenManager>,
        timeout: Duration,
    ) -> LlmResult<Self> {
        Ok(Self {
            model,
            endpoint: endpoint.filter(|e| !e.is_empty()),
            tokens,
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    fn chat_url(&self) -> LlmResult<String> {
        let base = self.endpoint.as_ref().ok_or_else(|| {
            LlmError::Configuration("enterprise gateway base URL is not configured".to_string())
        })?;
        Ok(format!("{}/chat/completions", base.trim_end_matches('/')))
    }
}

#[async_trait]
impl LlmProvider for EnterpriseProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderKind::Enterprise, &self.model)
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some() && self.tokens.is_configured()
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let url = self.chat_url()?;
        let token = self.tokens.get_valid_token()?;

        debug!(model = %self.model, "sending request to enterprise gateway");

        let headers = [("Authorization", format!("Bearer {token}"))];
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
            "enterprise completion finished"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serial_test::serial;

    fn manager(var: &str) -> Arc<TokenManager> {
        Arc::new(TokenManager::new(var, Duration::from_secs(3600)))
    }

    #[test]
    #[serial]
    fn test_unavailable_without_endpoint_or_token() {
        std::env::remove_var("ENT_TEST_TOKEN_AVAIL");
        let provider = EnterpriseProvider::new(
            "gpt-4o-mini".to_string(),
            None,
            manager("ENT_TEST_TOKEN_AVAIL"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!provider.is_available());

        let provider = EnterpriseProvider::new(
            "gpt-4o-mini".to_string(),
            Some("https://gateway.internal/v1".to_string()),
            manager("ENT_TEST_TOKEN_AVAIL"),
            Duration::from_secs(5),
        )
        .unwrap();
        // Endpoint present but token env var unset.
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_configuration_error() {
        let provider = EnterpriseProvider::new(
            "gpt-4o-mini".to_string(),
            None,
            manager("ENT_TEST_TOKEN_NOEP"),
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
    #[serial]
    async fn test_bearer_token_from_manager() {
        std::env::set_var("ENT_TEST_TOKEN_BEARER", "ent-secret");

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer ent-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices": [{"message": {"role": "assistant", "content": "ok"}}], "usage": {"prompt_tokens": 1, "completion_tokens": 1}}"#,
            )
            .create_async()
            .await;

        let provider = EnterpriseProvider::new(
            "gpt-4o-mini".to_string(),
            Some(server.url()),
            manager("ENT_TEST_TOKEN_BEARER"),
            Duration::from_secs(5),
        )
        .unwrap();

        let response = provider
            .complete(CompletionRequest::new("ping"))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
        mock.assert_async().await;

        std::env::remove_var("ENT_TEST_TOKEN_BEARER");
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_token_is_auth_error() {
        std::env::remove_var("ENT_TEST_TOKEN_MISSING");
        let provider = EnterpriseProvider::new(
            "gpt-4o-mini".to_string(),
            Some("http://localhost:9/v1".to_string()),
            manager("ENT_TEST_TOKEN_MISSING"),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider
            .complete(CompletionRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Auth(_)));
    }
}
