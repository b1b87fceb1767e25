use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RagError, Result};

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
}

/// HTTP-backed embedding model, reached as its own microservice — the
/// same shape as `DmsClient`/`LlmClient`, not an in-process model.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl HttpEmbedder {
    /// Learns the vector dimension from a one-text warmup call, mirroring
    /// `SentenceTransformer(...).get_sentence_embedding_dimension()` in the
    /// system this was distilled from.
    pub async fn connect(base_url: String, model: String) -> Result<Self> {
        let client = Client::new();
        let warmup = Self::embed_batch(&client, &base_url, &model, &["warmup".to_string()]).await?;
        let dimension = warmup
            .embeddings
            .first()
            .map(|v| v.len())
            .unwrap_or(warmup.dimension);

        Ok(HttpEmbedder {
            client,
            base_url,
            model,
            dimension,
        })
    }

    async fn embed_batch(
        client: &Client,
        base_url: &str,
        model: &str,
        texts: &[String],
    ) -> Result<EmbedResponse> {
        let response = client
            .post(format!("{base_url}/embed"))
            .timeout(Duration::from_secs(60))
            .json(&EmbedRequest { model, input: texts })
            .send()
            .await
            .map_err(|e| RagError::UpstreamEmbedding {
                operation: "encode".into(),
                status: None,
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::UpstreamEmbedding {
                operation: "encode".into(),
                status: Some(status.as_u16()),
                cause: response.text().await.unwrap_or_default(),
            });
        }

        response.json().await.map_err(|e| RagError::UpstreamEmbedding {
            operation: "encode".into(),
            status: Some(status.as_u16()),
            cause: e.to_string(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = Self::embed_batch(&self.client, &self.base_url, &self.model, texts).await?;
        if response.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "embedding service returned {} vectors for {} inputs",
                response.embeddings.len(),
                texts.len()
            )));
        }
        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder {
        dim: usize,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn dimension(&self) -> usize {
            self.dim
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; self.dim]).collect())
        }
    }

    #[tokio::test]
    async fn trait_object_encodes_batch_preserving_length() {
        let embedder: Box<dyn Embedder> = Box::new(FixedEmbedder { dim: 4 });
        let out = embedder.encode(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.len() == 4));
    }
}
