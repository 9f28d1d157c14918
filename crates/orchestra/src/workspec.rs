//! Work specifications produced by scenario analysis

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::{OrchestraError, Result};

const REQUIRED_KEYS: [&str; 4] = ["name", "role", "responsibilities", "dependencies"];

/// Declarative description of one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
pub struct WorkSpec {
    /// Unique within a run
    pub name: String,
    pub role: String,
    pub responsibilities: Vec<String>,
    /// Names of agents that must complete before this one
    pub dependencies: Vec<String>,
}

impl WorkSpec {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            responsibilities: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_responsibility(mut self, responsibility: impl Into<String>) -> Self {
        self.responsibilities.push(responsibility.into());
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

/// The `{"agents": [...]}` object returned by scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentBatch {
    pub agents: Vec<WorkSpec>,
}

impl AgentBatch {
    /// JSON schema of the batch, embedded in the analysis prompt
    pub fn json_schema() -> String {
        serde_json::to_string_pretty(&schemars::schema_for!(AgentBatch)).unwrap_or_default()
    }

    /// Validate a parsed analysis response and build the batch.
    ///
    /// Rejects the whole batch on the first malformed entry so that no
    /// registry state is ever built from a partial response.
    pub fn from_value(value: Value) -> Result<Self> {
        let agents = value
            .get("agents")
            .ok_or_else(|| OrchestraError::Validation("response missing 'agents' key".into()))?;

        let entries = match agents.as_array() {
            Some(entries) if !entries.is_empty() => entries,
            _ => {
                return Err(OrchestraError::Validation(
                    "'agents' must be a non-empty list".into(),
                ))
            }
        };

        let mut specs = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            specs.push(Self::validate_entry(idx, entry)?);
        }

        Ok(Self { agents: specs })
    }

    fn validate_entry(idx: usize, entry: &Value) -> Result<WorkSpec> {
        let object = entry.as_object().ok_or_else(|| {
            OrchestraError::Validation(format!("agent at index {} is not an object", idx))
        })?;

        let label = object
            .get("name")
            .and_then(Value::as_str)
            .map(|name| format!("'{}'", name))
            .unwrap_or_else(|| format!("at index {}", idx));

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(OrchestraError::Validation(format!(
                "agent {} is missing required keys: {}",
                label,
                missing.join(", ")
            )));
        }

        for key in ["responsibilities", "dependencies"] {
            if !object[key].is_array() {
                return Err(OrchestraError::Validation(format!(
                    "agent {}: '{}' must be a list",
                    label, key
                )));
            }
        }

        let mut spec: WorkSpec = serde_json::from_value(entry.clone()).map_err(|e| {
            OrchestraError::Validation(format!("agent {} does not match schema: {}", label, e))
        })?;

        spec.name = spec.name.trim().to_string();
        if spec.name.is_empty() {
            return Err(OrchestraError::Validation(format!(
                "agent at index {} has an empty name",
                idx
            )));
        }
        spec.dependencies = spec
            .dependencies
            .into_iter()
            .map(|dep| dep.trim().to_string())
            .filter(|dep| !dep.is_empty())
            .collect();

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_valid_batch() {
        let batch = AgentBatch::from_value(json!({
            "agents": [
                {"name": "Triage", "role": "Intake", "responsibilities": ["sort"], "dependencies": []},
                {"name": "Dispatch", "role": "Routing", "responsibilities": [], "dependencies": ["Triage"]}
            ]
        }))
        .unwrap();

        assert_eq!(batch.agents.len(), 2);
        assert_eq!(batch.agents[1].dependencies, vec!["Triage".to_string()]);
    }

    #[test]
    fn test_missing_agents_key() {
        let err = AgentBatch::from_value(json!({"team": []})).unwrap_err();
        assert!(matches!(err, OrchestraError::Validation(_)));
    }

    #[test]
    fn test_empty_agents_list() {
        let err = AgentBatch::from_value(json!({"agents": []})).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_missing_required_keys_are_named() {
        let err = AgentBatch::from_value(json!({
            "agents": [{"name": "Scout", "role": "Research"}]
        }))
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("'Scout'"));
        assert!(message.contains("responsibilities"));
        assert!(message.contains("dependencies"));
    }

    #[test]
    fn test_dependencies_must_be_a_list() {
        let err = AgentBatch::from_value(json!({
            "agents": [{"name": "Scout", "role": "Research", "responsibilities": [], "dependencies": "none"}]
        }))
        .unwrap_err();

        assert!(err.to_string().contains("'dependencies' must be a list"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = AgentBatch::from_value(json!({
            "agents": [{"name": "  ", "role": "Research", "responsibilities": [], "dependencies": []}]
        }))
        .unwrap_err();

        assert!(err.is_structural());
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = AgentBatch::json_schema();
        assert!(schema.contains("responsibilities"));
        assert!(schema.contains("dependencies"));
    }
}
