//! Batching contract: inputs beyond `batch_size` are split into one
//! upstream call per chunk and the output keeps input order.

use embeddings::{EmbeddingsClient, EmbeddingsConfig, EmbeddingsProviderKind};
use mockito::Server;

fn config(base: &str, batch_size: usize) -> EmbeddingsConfig {
    EmbeddingsConfig {
        provider: EmbeddingsProviderKind::Ollama,
        api_base: Some(base.to_string()),
        batch_size,
        ..Default::default()
    }
}

#[tokio::test]
async fn splits_into_batch_size_chunks() {
    let mut server = Server::new_async().await;

    // Five inputs with batch_size 2 -> chunks of 2, 2, 1.
    let first = server
        .mock("POST", "/api/embed")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"input": ["t0", "t1"]}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embeddings": [[0.0], [1.0]]}"#)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/api/embed")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"input": ["t2", "t3"]}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embeddings": [[2.0], [3.0]]}"#)
        .create_async()
        .await;
    let third = server
        .mock("POST", "/api/embed")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"input": ["t4"]}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embeddings": [[4.0]]}"#)
        .create_async()
        .await;

    let client = EmbeddingsClient::new(&config(&server.url(), 2)).unwrap();
    let texts: Vec<String> = (0..5).map(|i| format!("t{i}")).collect();
    let vectors = client.embed_batch(&texts).await.unwrap();

    assert_eq!(
        vectors,
        vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]]
    );
    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;
}

#[tokio::test]
async fn empty_input_makes_no_calls() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/embed")
        .expect(0)
        .create_async()
        .await;

    let client = EmbeddingsClient::new(&config(&server.url(), 2)).unwrap();
    let vectors = client.embed_batch(&[]).await.unwrap();

    assert!(vectors.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_chunk_fails_the_batch() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/embed")
        .with_status(500)
        .with_body("backend down")
        .create_async()
        .await;

    let client = EmbeddingsClient::new(&config(&server.url(), 2)).unwrap();
    let err = client
        .embed_batch(&["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}
