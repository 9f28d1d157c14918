//! Text embedding backends

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;

use crate::{config::EmbeddingSettings, OrchestraError, Result};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));
/// Scripts written without spaces between words
static UNSPACED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{Han}\p{Hiragana}\p{Katakana}\p{Thai}]+").expect("valid script regex")
});

/// Turns text into a fixed-size vector
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Offline embedder using signed feature hashing over word tokens.
///
/// Deterministic across processes, so traces persisted by one run stay
/// comparable with queries from the next.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn fnv1a(token: &str) -> u64 {
        token.bytes().fold(FNV_OFFSET, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
        })
    }

    /// Character bigrams of an unspaced run; a lone character stands alone
    fn bigrams(run: &str, features: &mut Vec<String>) {
        let chars: Vec<char> = run.chars().collect();
        if chars.len() == 1 {
            features.push(run.to_string());
        }
        features.extend(chars.windows(2).map(|pair| pair.iter().collect::<String>()));
    }

    /// Lowercased words; unspaced scripts are split into character bigrams
    pub(crate) fn features(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut features = Vec::new();

        for word in WORD.find_iter(&lowered).map(|m| m.as_str()) {
            let mut last = 0;
            for run in UNSPACED.find_iter(word) {
                if run.start() > last {
                    features.push(word[last..run.start()].to_string());
                }
                Self::bigrams(run.as_str(), &mut features);
                last = run.end();
            }
            if last < word.len() {
                features.push(word[last..].to_string());
            }
        }
        features
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for feature in Self::features(text) {
            let hash = Self::fnv1a(&feature);
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}

/// OpenAI-compatible `/embeddings` client
pub struct OpenAIEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl OpenAIEmbedder {
    pub fn new(settings: &EmbeddingSettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrchestraError::Config(e.to_string()))?;

        if settings.api_key.is_none() {
            tracing::warn!("OpenAI embedder created without API key");
        }

        Ok(Self {
            client,
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1/embeddings".to_string()),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            dimension: settings.dimension,
        })
    }

    fn build_payload(&self, text: &str) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "model": self.model,
            "input": text
        });
        // only the v3 models accept a reduced output size
        if self.model.starts_with("text-embedding-3") {
            payload["dimensions"] = serde_json::json!(self.dimension);
        }
        payload
    }

    fn parse_response(json: &serde_json::Value) -> Result<Vec<f32>> {
        let values = json["data"][0]["embedding"].as_array().ok_or_else(|| {
            OrchestraError::Embedding("response has no embedding vector".to_string())
        })?;

        values
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    OrchestraError::Embedding("embedding contains a non-numeric value".to_string())
                })
            })
            .collect()
    }

    /// Vectors of another size cannot be compared with stored traces
    fn check_dimension(&self, embedding: Vec<f32>) -> Result<Vec<f32>> {
        if embedding.len() != self.dimension {
            return Err(OrchestraError::Embedding(format!(
                "model '{}' returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimension
            )));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&self.build_payload(text));
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OrchestraError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestraError::Embedding(format!(
                "embedding API error ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OrchestraError::Embedding(e.to_string()))?;

        self.check_dimension(Self::parse_response(&json)?)
    }
}
