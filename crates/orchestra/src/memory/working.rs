//! Run-scoped working memory

use std::collections::HashMap;

use crate::agent::AgentResult;

/// Outputs of the agents executed in the current run. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct WorkingMemory {
    scenario: String,
    outputs: HashMap<String, AgentResult>,
    order: Vec<String>,
}

impl WorkingMemory {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            ..Default::default()
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn store_agent_output(&mut self, agent: impl Into<String>, output: AgentResult) {
        let agent = agent.into();
        if !self.outputs.contains_key(&agent) {
            self.order.push(agent.clone());
        }
        self.outputs.insert(agent, output);
    }

    pub fn get_agent_output(&self, agent: &str) -> Option<&AgentResult> {
        self.outputs.get(agent)
    }

    /// Outputs in the order they were first stored
    pub fn get_all_outputs(&self) -> Vec<&AgentResult> {
        self.order
            .iter()
            .filter_map(|name| self.outputs.get(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
