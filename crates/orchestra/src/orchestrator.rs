//! The orchestration pipeline: analyze, register, resolve, execute, remember

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    agent::{Agent, AgentResult, ExecutionContext},
    brain::ReasoningService,
    events::EventEmitter,
    graph::DependencyGraph,
    memory::MemoryCoordinator,
    registry::AgentRegistry,
    OrchestraError, Result,
};

/// Aggregate returned by a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct OrchestrationResult {
    pub scenario: String,
    pub agents_created: usize,
    pub execution_order: Vec<String>,
    /// Rendered traces of the prior runs that primed this one
    pub memory_context_used: Vec<String>,
    pub results: Vec<AgentResult>,
}

/// Drives one scenario through the full pipeline.
///
/// Owns the registry and working memory of a single run; create one per run.
pub struct Orchestrator {
    reasoning: ReasoningService,
    memory: MemoryCoordinator,
    registry: AgentRegistry,
}

impl Orchestrator {
    pub fn new(reasoning: ReasoningService, memory: MemoryCoordinator) -> Self {
        Self {
            reasoning,
            memory,
            registry: AgentRegistry::new(),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn memory(&self) -> &MemoryCoordinator {
        &self.memory
    }

    pub fn reasoning(&self) -> &ReasoningService {
        &self.reasoning
    }

    /// Run the pipeline. Any error aborts the remaining stages and nothing is
    /// persisted for the run.
    pub async fn execute(
        &mut self,
        scenario: &str,
        events: &EventEmitter,
    ) -> Result<OrchestrationResult> {
        events.status("Initializing pipeline...");
        self.registry = AgentRegistry::new();

        events.status("Retrieving memory context...");
        let memory_context = self.memory.retrieve_context(scenario).await?;
        events.memory_retrieved(&memory_context);
        self.memory.init_session(scenario);

        events.status("Analyzing scenario with LLM...");
        let specs = self.reasoning.analyze(scenario).await?;
        events.agents_designed(&specs);

        events.status("Creating agents...");
        for spec in &specs {
            self.registry.register(Agent::new(spec.clone()))?;
        }
        tracing::info!("Created {} agent(s)", self.registry.count());

        events.status("Resolving dependencies...");
        let order = DependencyGraph::resolve(&specs)?;
        events.dependency_resolved(&order);

        let results = self
            .execute_agents(&order, &memory_context, scenario, events)
            .await?;

        events.status("Saving execution trace...");
        self.memory.save_trace(scenario, &order, &results).await?;

        let result = OrchestrationResult {
            scenario: scenario.to_string(),
            agents_created: self.registry.count(),
            execution_order: order,
            memory_context_used: memory_context,
            results,
        };
        events.orchestration_completed(&result);
        tracing::info!(
            "Orchestration completed: {} agent(s) executed",
            result.results.len()
        );
        Ok(result)
    }

    /// Execute agents one at a time in `order`, threading results forward
    pub(crate) async fn execute_agents(
        &mut self,
        order: &[String],
        memory_context: &[String],
        scenario: &str,
        events: &EventEmitter,
    ) -> Result<Vec<AgentResult>> {
        let mut context = ExecutionContext::new(scenario);
        let mut results = Vec::with_capacity(order.len());

        for name in order {
            let Some(agent) = self.registry.get_mut(name) else {
                tracing::warn!("{}, skipping", OrchestraError::NotFound(name.clone()));
                continue;
            };

            events.agent_executing(name);
            let result = agent
                .execute(&context, memory_context, &self.reasoning)
                .await?;

            self.memory
                .working_memory_mut()
                .store_agent_output(name.as_str(), result.clone());
            context.record(result.clone());
            events.agent_completed(&result);
            results.push(result);
        }

        Ok(results)
    }
}
