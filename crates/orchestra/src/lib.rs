//! # Orchestra - Memory-Augmented Agent Orchestration
//!
//! Turns a natural-language scenario into a set of runtime-defined agents,
//! resolves their dependency order and executes them one at a time. Each agent
//! reasons through an external LLM, sees the results of the agents that ran
//! before it, and is primed with the most similar traces of earlier runs.

pub mod agent;
pub mod brain;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod events;
pub mod graph;
pub mod memory;
pub mod orchestrator;
pub mod registry;
pub mod runtime;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod workspec;


pub use agent::{Agent, AgentResult, AgentState, ExecutionContext};
pub use brain::{
    create_provider, AgentReply, AnthropicProvider, ChatConfig, ChatMessage, ChatRequest,
    LLMProviderTrait, OpenAIProvider, ProviderError, ProviderType, ReasoningRequest,
    ReasoningService,
};
pub use bridge::{spawn_orchestration, EventStream};
pub use cache::{CacheStats, CachedEmbedder, EmbeddingCache};
pub use config::{EmbeddingProvider, EmbeddingSettings, LlmSettings, MemorySettings, OrchestraConfig};
pub use events::{EventEmitter, OrchestrationEvent};
pub use graph::{DanglingDependency, DependencyGraph};
pub use memory::{
    cosine_similarity, Embedder, HashingEmbedder, InMemoryStore, MemoryCoordinator, MemoryTrace,
    OpenAIEmbedder, ScoredTrace, SimilarityStore, SqliteStore, StoredTrace, TraceMetadata,
    WorkingMemory,
};
pub use orchestrator::{OrchestrationResult, Orchestrator};
pub use registry::AgentRegistry;
pub use runtime::Runtime;
pub use workspec::{AgentBatch, WorkSpec};

/// Main error types for orchestration runs
#[derive(Debug, thiserror::Error)]
pub enum OrchestraError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Circular dependency detected among agents: {}", agents.join(", "))]
    Cycle { agents: Vec<String> },

    #[error("Agent '{0}' is already registered")]
    DuplicateName(String),

    #[error("Agent '{0}' not found in registry")]
    NotFound(String),

    #[error("Reasoning service error: {0}")]
    ReasoningService(#[from] ProviderError),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Memory store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OrchestraError {
    /// Structural errors are raised before any agent executes
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            OrchestraError::Validation(_)
                | OrchestraError::Cycle { .. }
                | OrchestraError::DuplicateName(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OrchestraError>;
