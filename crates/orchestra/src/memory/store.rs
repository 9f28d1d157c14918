//! Similarity stores for execution traces

use std::{cmp::Ordering, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{OrchestraError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMetadata {
    pub scenario: String,
    pub timestamp: DateTime<Utc>,
}

/// A rendered trace with its embedding, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrace {
    pub id: Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: TraceMetadata,
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrace {
    pub id: Uuid,
    pub content: String,
    pub metadata: TraceMetadata,
    pub score: f32,
}

/// Cosine similarity; zero for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank candidates by similarity; ties keep insertion order and traces
/// sharing nothing with the query are left out
fn rank<I>(query: &[f32], candidates: I, top_k: usize) -> Vec<ScoredTrace>
where
    I: IntoIterator<Item = StoredTrace>,
{
    let mut scored: Vec<ScoredTrace> = candidates
        .into_iter()
        .map(|trace| ScoredTrace {
            score: cosine_similarity(query, &trace.embedding),
            id: trace.id,
            content: trace.content,
            metadata: trace.metadata,
        })
        .filter(|hit| hit.score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    scored
}

/// Persistent nearest-neighbour store of execution traces
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    async fn insert(&self, trace: StoredTrace) -> Result<()>;

    /// Up to `top_k` traces, most similar first
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredTrace>>;

    async fn count(&self) -> Result<usize>;
}

/// Process-local store; contents vanish with the process
#[derive(Debug, Default)]
pub struct InMemoryStore {
    traces: RwLock<Vec<StoredTrace>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SimilarityStore for InMemoryStore {
    async fn insert(&self, trace: StoredTrace) -> Result<()> {
        self.traces.write().await.push(trace);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredTrace>> {
        let traces = self.traces.read().await;
        Ok(rank(embedding, traces.iter().cloned(), top_k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.traces.read().await.len())
    }
}

/// SQLite-backed store with brute-force cosine ranking
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| OrchestraError::Store(e.to_string()))?;
        tracing::info!("Memory store ready at {}", database_url);
        Ok(Self { pool })
    }

    fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<StoredTrace> {
        let id: String = row.try_get("id")?;
        let embedding: String = row.try_get("embedding")?;
        Ok(StoredTrace {
            id: Uuid::parse_str(&id).map_err(|e| OrchestraError::Store(e.to_string()))?,
            content: row.try_get("content")?,
            embedding: serde_json::from_str(&embedding)
                .map_err(|e| OrchestraError::Store(format!("corrupt embedding for {}: {}", id, e)))?,
            metadata: TraceMetadata {
                scenario: row.try_get("scenario")?,
                timestamp: row.try_get("created_at")?,
            },
        })
    }
}

#[async_trait]
impl SimilarityStore for SqliteStore {
    async fn insert(&self, trace: StoredTrace) -> Result<()> {
        let embedding = serde_json::to_string(&trace.embedding)
            .map_err(|e| OrchestraError::Store(e.to_string()))?;

        sqlx::query(
            "INSERT INTO memory_traces (id, content, embedding, scenario, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(trace.id.to_string())
        .bind(&trace.content)
        .bind(embedding)
        .bind(&trace.metadata.scenario)
        .bind(trace.metadata.timestamp)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Persisted trace {}", trace.id);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredTrace>> {
        let rows = sqlx::query(
            "SELECT id, content, embedding, scenario, created_at FROM memory_traces ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let traces = rows.iter().map(Self::decode).collect::<Result<Vec<_>>>()?;
        Ok(rank(embedding, traces, top_k))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memory_traces")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(content: &str, embedding: Vec<f32>) -> StoredTrace {
        StoredTrace {
            id: Uuid::new_v4(),
            content: content.to_string(),
            embedding,
            metadata: TraceMetadata {
                scenario: content.to_string(),
                timestamp: Utc::now(),
            },
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_in_memory_ranking() {
        let store = InMemoryStore::new();
        assert!(store.search(&[1.0, 0.0], 3).await.unwrap().is_empty());

        store.insert(trace("orthogonal", vec![0.0, 1.0])).await.unwrap();
        store.insert(trace("close", vec![0.9, 0.1])).await.unwrap();
        store.insert(trace("exact", vec![1.0, 0.0])).await.unwrap();

        let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(
            hits.iter().map(|h| h.content.as_str()).collect::<Vec<_>>(),
            vec!["exact", "close"]
        );
    }

    #[tokio::test]
    async fn test_unrelated_traces_are_not_returned() {
        let store = InMemoryStore::new();
        store.insert(trace("orthogonal", vec![0.0, 1.0])).await.unwrap();
        store.insert(trace("opposite", vec![-1.0, 0.0])).await.unwrap();

        assert!(store.search(&[1.0, 0.0], 3).await.unwrap().is_empty());
        assert!(store.search(&[0.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = InMemoryStore::new();
        store.insert(trace("first", vec![1.0, 0.0])).await.unwrap();
        store.insert(trace("second", vec![1.0, 0.0])).await.unwrap();

        let hits = store.search(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits[0].content, "first");
        assert_eq!(hits[1].content, "second");
    }

    #[tokio::test]
    async fn test_sqlite_store_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("memory.sqlite").display());

        {
            let store = SqliteStore::connect(&url).await.unwrap();
            assert_eq!(store.count().await.unwrap(), 0);
            store.insert(trace("flood response", vec![1.0, 0.0])).await.unwrap();
            store.insert(trace("budget review", vec![0.0, 1.0])).await.unwrap();
        }

        let store = SqliteStore::connect(&url).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let hits = store.search(&[0.8, 0.2], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "flood response");
        assert_eq!(hits[0].metadata.scenario, "flood response");
    }
}
