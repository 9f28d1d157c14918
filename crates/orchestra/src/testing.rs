//! In-process doubles for exercising the pipeline without a network

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    brain::{
        prompts::{AGENT_NAME_MARKER, ANALYSIS_PROMPT_HEADER},
        ChatRequest, LLMProviderTrait, ProviderError, ProviderType,
    },
    config::OrchestraConfig,
    memory::{HashingEmbedder, InMemoryStore},
    runtime::Runtime,
    workspec::{AgentBatch, WorkSpec},
};

/// One request seen by a [`ScriptedProvider`]
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    /// `None` for analysis requests
    pub agent: Option<String>,
    pub prompt: String,
}

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail,
    Panic,
}

/// Provider that answers from a script keyed by agent name
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    analysis: Option<Script>,
    agents: HashMap<String, Script>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw reply for the scenario analysis request
    pub fn analysis(mut self, raw: impl Into<String>) -> Self {
        self.analysis = Some(Script::Reply(raw.into()));
        self
    }

    pub fn fail_analysis(mut self) -> Self {
        self.analysis = Some(Script::Fail);
        self
    }

    /// Raw reply for one agent's reasoning request
    pub fn reply(mut self, agent: &str, raw: impl Into<String>) -> Self {
        self.agents.insert(agent.to_string(), Script::Reply(raw.into()));
        self
    }

    /// Make one agent's request fail as if the service were unreachable
    pub fn fail_for(mut self, agent: &str) -> Self {
        self.agents.insert(agent.to_string(), Script::Fail);
        self
    }

    pub fn panic_for(mut self, agent: &str) -> Self {
        self.agents.insert(agent.to_string(), Script::Panic);
        self
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Agents that reached the provider, in call order
    pub fn reasoned_agents(&self) -> Vec<String> {
        self.calls().into_iter().filter_map(|c| c.agent).collect()
    }

    /// User prompts sent on behalf of `agent`
    pub fn prompts_for(&self, agent: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.agent.as_deref() == Some(agent))
            .map(|c| c.prompt)
            .collect()
    }

    fn agent_name(prompt: &str) -> Option<String> {
        prompt
            .lines()
            .find_map(|line| line.strip_prefix(AGENT_NAME_MARKER))
            .map(|name| name.trim().to_string())
    }

    fn default_analysis() -> String {
        analysis_json(&[WorkSpec::new("Generalist", "Handles the whole scenario")
            .with_responsibility("resolve the scenario")])
    }

    fn default_reply(agent: &str) -> String {
        serde_json::json!({
            "agent": agent,
            "status": "completed",
            "summary": format!("{} handled its part of the scenario", agent)
        })
        .to_string()
    }
}

#[async_trait]
impl LLMProviderTrait for ScriptedProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let prompt = request.user_prompt().unwrap_or_default().to_string();
        let is_analysis = request
            .system_prompt()
            .map(|s| s.starts_with(ANALYSIS_PROMPT_HEADER))
            .unwrap_or(false);
        let agent = if is_analysis {
            None
        } else {
            Self::agent_name(&prompt)
        };

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ScriptedCall {
                agent: agent.clone(),
                prompt,
            });
        }

        let script = match agent {
            None => self.analysis.clone(),
            Some(ref name) => self.agents.get(name).cloned(),
        };

        match script {
            Some(Script::Reply(raw)) => Ok(raw),
            Some(Script::Fail) => Err(ProviderError::RequestFailed(
                "connection refused".to_string(),
            )),
            Some(Script::Panic) => panic!("scripted provider panic"),
            None => Ok(match agent {
                None => Self::default_analysis(),
                Some(name) => Self::default_reply(&name),
            }),
        }
    }
}

/// Serialize specs as an analysis reply
pub fn analysis_json(specs: &[WorkSpec]) -> String {
    serde_json::to_string(&AgentBatch {
        agents: specs.to_vec(),
    })
    .unwrap_or_default()
}

/// Runtime over `provider` with in-process memory and the hashing embedder
pub fn runtime(provider: impl LLMProviderTrait + 'static) -> Runtime {
    Runtime::new(
        OrchestraConfig::in_memory(),
        Arc::new(provider),
        Arc::new(HashingEmbedder::default()),
        Arc::new(InMemoryStore::new()),
    )
}

/// Like [`runtime`] but keeps a handle on the provider for assertions
pub fn runtime_with(provider: ScriptedProvider) -> (Runtime, Arc<ScriptedProvider>) {
    let provider = Arc::new(provider);
    let runtime = Runtime::new(
        OrchestraConfig::in_memory(),
        provider.clone(),
        Arc::new(HashingEmbedder::default()),
        Arc::new(InMemoryStore::new()),
    );
    (runtime, provider)
}
