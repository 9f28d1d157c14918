//! Long-term similarity memory and run-scoped working memory

mod embedding;
mod store;
mod working;

use std::sync::Arc;

use chrono::{DateTime, Utc};
pub use embedding::{Embedder, HashingEmbedder, OpenAIEmbedder};
use serde::{Deserialize, Serialize};
pub use store::{
    cosine_similarity, InMemoryStore, ScoredTrace, SimilarityStore, SqliteStore, StoredTrace,
    TraceMetadata,
};
use ts_rs::TS;
use uuid::Uuid;
pub use working::WorkingMemory;

use crate::{agent::AgentResult, config::DEFAULT_TOP_K, Result};

/// Immutable record of one completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct MemoryTrace {
    pub id: Uuid,
    pub scenario: String,
    pub agent_order: Vec<String>,
    /// `"agent: summary"` per executed agent
    pub per_agent_summaries: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl MemoryTrace {
    pub fn new(scenario: &str, agent_order: &[String], results: &[AgentResult]) -> Self {
        Self {
            id: Uuid::new_v4(),
            scenario: scenario.to_string(),
            agent_order: agent_order.to_vec(),
            per_agent_summaries: results
                .iter()
                .map(|r| format!("{}: {}", r.agent, r.summary))
                .collect(),
            timestamp: Utc::now(),
        }
    }

    /// Text that gets embedded and returned as retrieval context
    pub fn render(&self) -> String {
        let mut text = format!(
            "Scenario: {}\nAgents: {}\nResults:",
            self.scenario,
            self.agent_order.join(", ")
        );
        for summary in &self.per_agent_summaries {
            text.push_str("\n  - ");
            text.push_str(summary);
        }
        text
    }
}

/// Coordinates the similarity store, the embedder and working memory
pub struct MemoryCoordinator {
    store: Arc<dyn SimilarityStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    session: WorkingMemory,
}

impl MemoryCoordinator {
    pub fn new(store: Arc<dyn SimilarityStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            top_k: DEFAULT_TOP_K,
            session: WorkingMemory::default(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Contents of the most similar past traces; empty on an empty store
    pub async fn retrieve_context(&self, scenario: &str) -> Result<Vec<String>> {
        if self.store.count().await? == 0 {
            tracing::info!("Memory store is empty, no context to retrieve");
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(scenario).await?;
        let hits = self.store.search(&embedding, self.top_k).await?;
        tracing::info!("Retrieved {} related trace(s) from memory", hits.len());
        for hit in &hits {
            tracing::debug!("Trace {} scored {:.3}", hit.id, hit.score);
        }

        Ok(hits.into_iter().map(|hit| hit.content).collect())
    }

    /// Persist one trace for a completed run
    pub async fn save_trace(
        &self,
        scenario: &str,
        agent_order: &[String],
        results: &[AgentResult],
    ) -> Result<MemoryTrace> {
        let trace = MemoryTrace::new(scenario, agent_order, results);
        let content = trace.render();
        let embedding = self.embedder.embed(&content).await?;

        self.store
            .insert(StoredTrace {
                id: trace.id,
                content,
                embedding,
                metadata: TraceMetadata {
                    scenario: trace.scenario.clone(),
                    timestamp: trace.timestamp,
                },
            })
            .await?;

        tracing::info!("Saved execution trace {}", trace.id);
        Ok(trace)
    }

    pub fn init_session(&mut self, scenario: &str) {
        self.session = WorkingMemory::new(scenario);
    }

    pub fn working_memory(&self) -> &WorkingMemory {
        &self.session
    }

    pub fn working_memory_mut(&mut self) -> &mut WorkingMemory {
        &mut self.session
    }

    pub fn store(&self) -> &Arc<dyn SimilarityStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> MemoryCoordinator {
        MemoryCoordinator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(HashingEmbedder::default()),
        )
    }

    fn result(agent: &str, summary: &str) -> AgentResult {
        AgentResult {
            agent: agent.into(),
            status: "completed".into(),
            summary: summary.into(),
        }
    }

    #[test]
    fn test_trace_rendering() {
        let trace = MemoryTrace::new(
            "Chemical spill",
            &["Hazmat".to_string(), "Comms".to_string()],
            &[result("Hazmat", "Area sealed"), result("Comms", "Residents alerted")],
        );

        assert_eq!(
            trace.render(),
            "Scenario: Chemical spill\nAgents: Hazmat, Comms\nResults:\n  - Hazmat: Area sealed\n  - Comms: Residents alerted"
        );
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_context() {
        assert!(coordinator().retrieve_context("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_saved_trace_is_retrievable() {
        let memory = coordinator().with_top_k(1);
        memory
            .save_trace("Warehouse fire", &["Fire".into()], &[result("Fire", "Contained")])
            .await
            .unwrap();
        memory
            .save_trace("Payroll audit", &["Audit".into()], &[result("Audit", "Reconciled")])
            .await
            .unwrap();

        let context = memory.retrieve_context("fire at the warehouse").await.unwrap();
        assert_eq!(context.len(), 1);
        assert!(context[0].starts_with("Scenario: Warehouse fire"));
    }

    #[tokio::test]
    async fn test_non_ascii_scenarios_are_retrieved_by_relevance() {
        let memory = coordinator().with_top_k(1);
        memory
            .save_trace("大阪で洪水", &["Rescue".into()], &[result("Rescue", "避難完了")])
            .await
            .unwrap();
        memory
            .save_trace(
                "東京で大地震が発生",
                &["Rescue".into()],
                &[result("Rescue", "救助隊を派遣")],
            )
            .await
            .unwrap();

        let context = memory.retrieve_context("東京で大地震が発生").await.unwrap();
        assert_eq!(context.len(), 1);
        assert!(context[0].starts_with("Scenario: 東京で大地震が発生"));

        // nothing in common with either trace
        let unrelated = memory.retrieve_context("Quarterly payroll audit").await.unwrap();
        assert!(unrelated.is_empty());
    }

    #[test]
    fn test_init_session_resets_working_memory() {
        let mut memory = coordinator();
        memory.init_session("first");
        memory
            .working_memory_mut()
            .store_agent_output("A", result("A", "done"));

        memory.init_session("second");
        assert_eq!(memory.working_memory().scenario(), "second");
        assert!(memory.working_memory().is_empty());
    }
}
