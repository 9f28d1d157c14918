//! Runtime agents and the shared execution context

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    brain::{ReasoningRequest, ReasoningService},
    workspec::WorkSpec,
    OrchestraError, Result,
};

/// Lifecycle of an agent within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AgentState::Pending => "pending",
            AgentState::Running => "running",
            AgentState::Completed => "completed",
            AgentState::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Outcome of one agent execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct AgentResult {
    pub agent: String,
    pub status: String,
    pub summary: String,
}

/// Scenario plus the results of every agent completed so far
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub scenario: String,
    results: HashMap<String, AgentResult>,
    completed: Vec<String>,
}

impl ExecutionContext {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            ..Default::default()
        }
    }

    /// Record a completed agent's result. Entries are never overwritten.
    pub fn record(&mut self, result: AgentResult) {
        if self.results.contains_key(&result.agent) {
            tracing::warn!("Result for agent '{}' already recorded", result.agent);
            return;
        }
        self.completed.push(result.agent.clone());
        self.results.insert(result.agent.clone(), result);
    }

    pub fn result(&self, agent: &str) -> Option<&AgentResult> {
        self.results.get(agent)
    }

    /// Results in completion order
    pub fn results(&self) -> impl Iterator<Item = &AgentResult> {
        self.completed.iter().filter_map(|name| self.results.get(name))
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

/// A unit of work created from a [`WorkSpec`]
#[derive(Debug, Clone)]
pub struct Agent {
    spec: WorkSpec,
    state: AgentState,
}

impl Agent {
    pub fn new(spec: WorkSpec) -> Self {
        Self {
            spec,
            state: AgentState::Pending,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn role(&self) -> &str {
        &self.spec.role
    }

    pub fn responsibilities(&self) -> &[String] {
        &self.spec.responsibilities
    }

    pub fn dependencies(&self) -> &[String] {
        &self.spec.dependencies
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn spec(&self) -> &WorkSpec {
        &self.spec
    }

    /// Summary used when the model does not supply a usable one
    pub fn fallback_summary(&self) -> String {
        format!(
            "{} ({}) completed: {}",
            self.spec.name,
            self.spec.role,
            self.spec.responsibilities.join(", ")
        )
    }

    /// Reason about the scenario and produce this agent's result.
    ///
    /// A reply that arrives but cannot be parsed is recovered with the
    /// fallback summary. Any other reasoning failure marks the agent
    /// `failed` and is returned to the caller.
    pub async fn execute(
        &mut self,
        context: &ExecutionContext,
        memory_context: &[String],
        reasoning: &ReasoningService,
    ) -> Result<AgentResult> {
        self.state = AgentState::Running;
        tracing::info!("Agent '{}' executing", self.spec.name);

        let upstream: Vec<_> = self
            .spec
            .dependencies
            .iter()
            .filter_map(|dep| context.result(dep).cloned())
            .collect();

        let request = ReasoningRequest {
            agent_name: self.spec.name.clone(),
            role: self.spec.role.clone(),
            responsibilities: self.spec.responsibilities.clone(),
            scenario: context.scenario.clone(),
            memory_context: memory_context.to_vec(),
            upstream,
        };

        let (status, summary) = match reasoning.reason(&request).await {
            Ok(reply) => (reply.status, reply.summary),
            Err(OrchestraError::MalformedResponse(raw)) => {
                tracing::warn!(
                    "Agent '{}' received an unparseable reply, using fallback summary: {}",
                    self.spec.name,
                    raw
                );
                (None, None)
            }
            Err(e) => {
                self.state = AgentState::Failed;
                tracing::error!("Agent '{}' failed: {}", self.spec.name, e);
                return Err(e);
            }
        };

        self.state = AgentState::Completed;
        Ok(AgentResult {
            agent: self.spec.name.clone(),
            status: status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "completed".to_string()),
            summary: summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| self.fallback_summary()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::ScriptedProvider;

    fn agent() -> Agent {
        Agent::new(
            WorkSpec::new("Dispatcher", "Routing")
                .with_responsibility("assign units")
                .with_responsibility("track ETA")
                .depends_on("Triage"),
        )
    }

    fn reasoning(provider: ScriptedProvider) -> ReasoningService {
        ReasoningService::new(Arc::new(provider), "test-model")
    }

    #[test]
    fn test_fallback_summary() {
        assert_eq!(
            agent().fallback_summary(),
            "Dispatcher (Routing) completed: assign units, track ETA"
        );
    }

    #[test]
    fn test_context_does_not_overwrite() {
        let mut ctx = ExecutionContext::new("flood");
        ctx.record(AgentResult {
            agent: "A".into(),
            status: "completed".into(),
            summary: "first".into(),
        });
        ctx.record(AgentResult {
            agent: "A".into(),
            status: "completed".into(),
            summary: "second".into(),
        });

        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.result("A").unwrap().summary, "first");
    }

    #[tokio::test]
    async fn test_execute_success() {
        let provider = ScriptedProvider::new().reply(
            "Dispatcher",
            r#"{"agent": "someone-else", "status": "done", "summary": "Units assigned"}"#,
        );
        let service = reasoning(provider);
        let mut agent = agent();

        let result = agent
            .execute(&ExecutionContext::new("flood"), &[], &service)
            .await
            .unwrap();

        assert_eq!(agent.state(), AgentState::Completed);
        assert_eq!(result.agent, "Dispatcher");
        assert_eq!(result.status, "done");
        assert_eq!(result.summary, "Units assigned");
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let provider = ScriptedProvider::new().reply("Dispatcher", r#"{"notes": "n/a"}"#);
        let service = reasoning(provider);
        let mut agent = agent();

        let result = agent
            .execute(&ExecutionContext::new("flood"), &[], &service)
            .await
            .unwrap();

        assert_eq!(result.status, "completed");
        assert_eq!(result.summary, agent.fallback_summary());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_recovered() {
        let provider = ScriptedProvider::new().reply("Dispatcher", "I cannot answer in JSON today");
        let service = reasoning(provider);
        let mut agent = agent();

        let result = agent
            .execute(&ExecutionContext::new("flood"), &[], &service)
            .await
            .unwrap();

        assert_eq!(agent.state(), AgentState::Completed);
        assert_eq!(result.summary, agent.fallback_summary());
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_agent() {
        let provider = ScriptedProvider::new().fail_for("Dispatcher");
        let service = reasoning(provider);
        let mut agent = agent();

        let err = agent
            .execute(&ExecutionContext::new("flood"), &[], &service)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestraError::ReasoningService(_)));
        assert_eq!(agent.state(), AgentState::Failed);
    }

    #[tokio::test]
    async fn test_upstream_results_reach_the_prompt() {
        let provider = Arc::new(ScriptedProvider::new());
        let service = ReasoningService::new(provider.clone(), "test-model");
        let mut ctx = ExecutionContext::new("flood");
        ctx.record(AgentResult {
            agent: "Triage".into(),
            status: "completed".into(),
            summary: "Three districts critical".into(),
        });
        let mut agent = agent();

        agent
            .execute(&ctx, &["Scenario: earlier flood".to_string()], &service)
            .await
            .unwrap();

        let prompt = provider.prompts_for("Dispatcher").pop().unwrap();
        assert!(prompt.contains("Three districts critical"));
        assert!(prompt.contains("Scenario: earlier flood"));
    }
}
