use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use lawguide_common::{LawGuideError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

const HEALTH_PROBE: &str = "health check";

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier stored in the index header and compared at query time.
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Embeds a probe string and returns the vector dimension.
    async fn health_check(&self) -> Result<usize> {
        let vector = self.embed(HEALTH_PROBE).await?;
        if vector.is_empty() {
            return Err(LawGuideError::ModelUnavailable(format!(
                "embedding model '{}' returned an empty vector",
                self.model_id()
            )));
        }
        Ok(vector.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Any OpenAI-compatible `/embeddings` endpoint.
    OpenAI,
    /// Local feature-hashing embedder, no network.
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    /// Output dimension of the hashing embedder.
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            dimension: 384,
            batch_size: 64,
        }
    }
}

impl EmbeddingConfig {
    pub fn hashing(dimension: usize) -> Self {
        Self {
            provider: EmbeddingProvider::Hashing,
            dimension,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Model id this configuration produces, as recorded in index headers.
    pub fn model_id(&self) -> String {
        match self.provider {
            EmbeddingProvider::OpenAI => self.model.clone(),
            EmbeddingProvider::Hashing => HashingEmbedder::model_id_for(self.dimension),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.provider {
            EmbeddingProvider::OpenAI => {
                if self.model.trim().is_empty() {
                    return Err(LawGuideError::Configuration("embedding model is required".to_string()));
                }
                if self.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(LawGuideError::Configuration(
                        "embedding API key is required (set OPENAI_API_KEY or embedding.api_key)".to_string(),
                    ));
                }
            }
            EmbeddingProvider::Hashing => {
                if self.dimension == 0 {
                    return Err(LawGuideError::Configuration(
                        "hashing embedder dimension must be greater than zero".to_string(),
                    ));
                }
            }
        }
        if self.batch_size == 0 {
            return Err(LawGuideError::Configuration("embedding batch_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LawGuideError::Configuration("embedding API key not configured".to_string()))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.api_base.trim_end_matches('/'));

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
        })
    }

    async fn request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(inputs)
            .build()
            .map_err(|e| LawGuideError::Internal(format!("invalid embedding request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| LawGuideError::ModelUnavailable(format!("embedding request to '{}' failed: {}", self.model, e)))?;

        let mut data = response.data;
        data.sort_by_key(|entry| entry.index);
        if data.len() != expected {
            return Err(LawGuideError::ModelUnavailable(format!(
                "embedding backend returned {} vectors for {} inputs",
                data.len(),
                expected
            )));
        }
        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| LawGuideError::ModelUnavailable("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            vectors.extend(self.request(batch.to_vec()).await?);
        }
        Ok(vectors)
    }
}

/// Bag-of-words feature hashing into a fixed number of signed buckets,
/// L2-normalised. Deterministic across runs and platforms.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(LawGuideError::Configuration(
                "hashing embedder dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: Self::model_id_for(dimension),
        })
    }

    pub fn model_id_for(dimension: usize) -> String {
        format!("hashing-{}", dimension)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }

    async fn health_check(&self) -> Result<usize> {
        Ok(self.dimension)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    config.validate()?;
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAiEmbedder::new(config)?),
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(config.dimension)?),
    };
    info!("Embedding backend: {:?} ({})", config.provider, embedder.model_id());
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::scripted_server;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let a = embedder.embed("Article 21: Right to life").await.unwrap();
        let b = embedder.embed("Article 21: Right to life").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hashing_embedder_similarity() {
        let embedder = HashingEmbedder::new(1024).unwrap();
        let query = embedder.embed("What does Article 21 guarantee?").await.unwrap();
        let relevant = embedder
            .embed("Article 21: Right to life and personal liberty.")
            .await
            .unwrap();
        let unrelated = embedder.embed("Schedule seven lists union subjects.").await.unwrap();
        assert!(cosine(&query, &relevant) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_blank_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(8).unwrap();
        let v = embedder.embed("  ...  ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashingEmbedder::new(32).unwrap();
        let texts = vec!["equality before law".to_string(), "freedom of religion".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[1], embedder.embed("freedom of religion").await.unwrap());
    }

    #[test]
    fn test_config_validation() {
        assert!(EmbeddingConfig::default().validate().is_err());
        assert!(EmbeddingConfig::default()
            .with_api_key("sk-test".to_string())
            .validate()
            .is_ok());
        assert!(EmbeddingConfig::hashing(0).validate().is_err());
        assert_eq!(EmbeddingConfig::hashing(128).model_id(), "hashing-128");
    }

    fn openai_embedder(api_base: String, batch_size: usize) -> OpenAiEmbedder {
        let config = EmbeddingConfig {
            api_base,
            batch_size,
            ..EmbeddingConfig::default()
        }
        .with_api_key("sk-test".to_string());
        OpenAiEmbedder::new(&config).unwrap()
    }

    fn embeddings_body(entries: &[(u32, [f32; 2])]) -> String {
        let data: Vec<_> = entries
            .iter()
            .map(|(index, vector)| serde_json::json!({ "object": "embedding", "index": index, "embedding": vector }))
            .collect();
        serde_json::json!({
            "object": "list",
            "model": "text-embedding-3-small",
            "data": data,
            "usage": { "prompt_tokens": 4, "total_tokens": 4 }
        })
        .to_string()
    }

    fn input_count(request_body: &str) -> usize {
        let value: serde_json::Value = serde_json::from_str(request_body).unwrap();
        value["input"].as_array().unwrap().len()
    }

    #[tokio::test]
    async fn test_openai_embedder_reorders_by_index() {
        let (base, served) = scripted_server(vec![(
            "200 OK",
            embeddings_body(&[(1, [0.0, 1.0]), (0, [1.0, 0.0])]),
        )])
        .await;
        let embedder = openai_embedder(base, 8);

        let texts = vec!["Article 14".to_string(), "Article 21".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(input_count(&served.await.unwrap()[0]), 2);
    }

    #[tokio::test]
    async fn test_openai_embedder_splits_into_batches() {
        let (base, served) = scripted_server(vec![
            ("200 OK", embeddings_body(&[(0, [1.0, 0.0]), (1, [0.5, 0.5])])),
            ("200 OK", embeddings_body(&[(0, [0.0, 1.0])])),
        ])
        .await;
        let embedder = openai_embedder(base, 2);

        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0]]);
        let bodies = served.await.unwrap();
        assert_eq!(bodies.iter().map(|b| input_count(b)).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_openai_server_error_is_model_unavailable() {
        let error = r#"{"error":{"message":"internal error","type":"server_error","param":null,"code":null}}"#;
        let (base, _served) = scripted_server(vec![("500 Internal Server Error", error.to_string())]).await;
        let embedder = openai_embedder(base, 8);

        match embedder.embed("Article 21").await {
            Err(LawGuideError::ModelUnavailable(msg)) => assert!(msg.contains("text-embedding-3-small")),
            other => panic!("expected ModelUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_openai_missing_vectors_is_model_unavailable() {
        let (base, _served) = scripted_server(vec![("200 OK", embeddings_body(&[(0, [1.0, 0.0])]))]).await;
        let embedder = openai_embedder(base, 8);

        let texts = vec!["Article 14".to_string(), "Article 21".to_string()];
        match embedder.embed_batch(&texts).await {
            Err(LawGuideError::ModelUnavailable(msg)) => assert!(msg.contains("1 vectors for 2 inputs")),
            other => panic!("expected ModelUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_create_embedder_requires_credentials() {
        let result = create_embedder(&EmbeddingConfig::default());
        assert!(matches!(result, Err(LawGuideError::Configuration(_))));

        let embedder = create_embedder(&EmbeddingConfig::hashing(16)).unwrap();
        assert_eq!(embedder.model_id(), "hashing-16");
    }
}
