//! Composition root: long-lived collaborators shared across runs

use std::{sync::Arc, time::Duration};

use crate::{
    bridge::{spawn_orchestration, EventStream},
    brain::{create_provider, LLMProviderTrait, ReasoningService},
    cache::{CachedEmbedder, EmbeddingCache},
    config::{EmbeddingProvider, OrchestraConfig},
    events::EventEmitter,
    memory::{
        Embedder, HashingEmbedder, InMemoryStore, MemoryCoordinator, OpenAIEmbedder,
        SimilarityStore, SqliteStore,
    },
    orchestrator::{OrchestrationResult, Orchestrator},
    OrchestraError, Result,
};

/// Provider, embedder and store, built once per process.
///
/// Hands out a fresh [`Orchestrator`] for every run so concurrent runs never
/// share a registry or working memory.
#[derive(Clone)]
pub struct Runtime {
    config: Arc<OrchestraConfig>,
    provider: Arc<dyn LLMProviderTrait>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn SimilarityStore>,
}

impl Runtime {
    pub fn new(
        config: OrchestraConfig,
        provider: Arc<dyn LLMProviderTrait>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn SimilarityStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            embedder,
            store,
        }
    }

    pub async fn from_config(config: OrchestraConfig) -> Result<Self> {
        let provider = create_provider(&config.llm)?;

        let embedder: Arc<dyn Embedder> = match config.embedding.provider {
            EmbeddingProvider::Hashing => {
                Arc::new(HashingEmbedder::new(config.embedding.dimension))
            }
            EmbeddingProvider::OpenAI => {
                let remote = OpenAIEmbedder::new(
                    &config.embedding,
                    Duration::from_secs(config.llm.timeout_secs),
                )?;
                Arc::new(CachedEmbedder::new(Arc::new(remote), EmbeddingCache::default()))
            }
        };
        tracing::info!(
            "Embedding model '{}' loaded ({} dimensions)",
            embedder.name(),
            embedder.dimension()
        );

        let store: Arc<dyn SimilarityStore> = if config.memory.is_in_memory() {
            tracing::info!("Using in-process memory store");
            Arc::new(InMemoryStore::new())
        } else if config.memory.store_url.starts_with("sqlite:") {
            Arc::new(SqliteStore::connect(&config.memory.store_url).await?)
        } else {
            return Err(OrchestraError::Config(format!(
                "unsupported MEMORY_STORE_URL: {}",
                config.memory.store_url
            )));
        };

        Ok(Self::new(config, provider, embedder, store))
    }

    pub fn config(&self) -> &OrchestraConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn LLMProviderTrait> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<dyn SimilarityStore> {
        &self.store
    }

    /// A new orchestrator; `model` overrides the configured model for this run
    pub fn orchestrator(&self, model: Option<&str>) -> Orchestrator {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.llm.model.as_str());

        let reasoning = ReasoningService::new(self.provider.clone(), model)
            .with_max_tokens(self.config.llm.max_tokens);
        let memory = MemoryCoordinator::new(self.store.clone(), self.embedder.clone())
            .with_top_k(self.config.memory.top_k);

        Orchestrator::new(reasoning, memory)
    }

    /// Run a scenario to completion without progress events
    pub async fn run(&self, scenario: &str, model: Option<&str>) -> Result<OrchestrationResult> {
        self.orchestrator(model)
            .execute(scenario, &EventEmitter::disabled())
            .await
    }

    /// Run a scenario on a background task and stream its events
    pub fn stream(&self, scenario: &str, model: Option<&str>) -> EventStream {
        spawn_orchestration(self.orchestrator(model), scenario)
    }
}
