//! Name-keyed registry of the agents created for one run

use std::collections::HashMap;

use crate::{agent::Agent, OrchestraError, Result};

/// Insertion-ordered agent store with O(1) lookup by name
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    index: HashMap<String, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent; names are unique within a registry
    pub fn register(&mut self, agent: Agent) -> Result<()> {
        if self.index.contains_key(agent.name()) {
            return Err(OrchestraError::DuplicateName(agent.name().to_string()));
        }
        tracing::debug!("Registered agent '{}' ({})", agent.name(), agent.role());
        self.index.insert(agent.name().to_string(), self.agents.len());
        self.agents.push(agent);
        Ok(())
    }

    /// Absence is not an error
    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.index.get(name).map(|&idx| &self.agents[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Agent> {
        self.index.get(name).map(|&idx| &mut self.agents[idx])
    }

    /// Agents in registration order
    pub fn list(&self) -> &[Agent] {
        &self.agents
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
