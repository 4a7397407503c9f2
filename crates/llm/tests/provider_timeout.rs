//! A call that exceeds the configured timeout must resolve to the
//! timeout-specific error, not a generic transport failure.

use llm::{CompletionRequest, LlmConfig, LlmProvider, ProviderFactory, ProviderKind};
use std::time::Duration;
use tokio::net::TcpListener;

/// Accepts connections and then never writes a byte, forcing the client to
/// hit its own timeout.
async fn hanging_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _hold = socket;
                tokio::time::sleep(Duration::from_secs(120)).await;
            });
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn openai_call_past_timeout_is_timeout_error() {
    let base = hanging_server().await;

    let config = LlmConfig {
        provider: ProviderKind::OpenAi,
        api_key: Some("test-api-key".to_string()),
        api_base: Some(base),
        timeout_secs: 1,
        ..Default::default()
    };

    let client = ProviderFactory::create(&config).unwrap();
    let err = client
        .complete(CompletionRequest::new("hello"))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got: {err}");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn local_call_past_timeout_is_timeout_error() {
    let base = hanging_server().await;

    let config = LlmConfig {
        provider: ProviderKind::Local,
        api_base: Some(base),
        timeout_secs: 1,
        ..Default::default()
    };

    let client = ProviderFactory::create(&config).unwrap();
    let err = client
        .complete(CompletionRequest::new("hello"))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got: {err}");
}
