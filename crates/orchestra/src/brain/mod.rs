//! Reasoning service: scenario analysis and per-agent reasoning over an LLM

mod parser;
pub mod prompts;
pub mod providers;

use std::sync::Arc;

pub use parser::extract_json;
pub use providers::{
    create_provider, AnthropicProvider, ChatConfig, ChatMessage, ChatRequest, LLMProviderTrait,
    MessageRole, OpenAIProvider, ProviderError, ProviderType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    agent::AgentResult,
    workspec::{AgentBatch, WorkSpec},
    OrchestraError, Result,
};

pub const ANALYSIS_TEMPERATURE: f32 = 0.3;
pub const REASONING_TEMPERATURE: f32 = 0.4;

/// Everything an agent hands to the model for one reasoning step
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    pub agent_name: String,
    pub role: String,
    pub responsibilities: Vec<String>,
    pub scenario: String,
    pub memory_context: Vec<String>,
    /// Results of this agent's completed dependencies
    pub upstream: Vec<AgentResult>,
}

/// Fields read from an agent reply; absent ones are filled by the agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub agent: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
}

impl AgentReply {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object.get(key).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
        };
        Some(Self {
            agent: text("agent"),
            status: text("status"),
            summary: text("summary"),
        })
    }
}

/// Prompting and response parsing on top of an [`LLMProviderTrait`]
#[derive(Clone)]
pub struct ReasoningService {
    provider: Arc<dyn LLMProviderTrait>,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for ReasoningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningService")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ReasoningService {
    pub fn new(provider: Arc<dyn LLMProviderTrait>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 2048,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn LLMProviderTrait> {
        &self.provider
    }

    async fn complete(&self, system: String, user: String, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            config: ChatConfig {
                model: self.model.clone(),
                temperature,
                max_tokens: self.max_tokens,
            },
        };
        Ok(self.provider.generate(request).await?)
    }

    /// Ask the model to design the agent ensemble for a scenario
    pub async fn analyze(&self, scenario: &str) -> Result<Vec<WorkSpec>> {
        tracing::info!("Analyzing scenario with {} ({})", self.provider.name(), self.model);

        let raw = self
            .complete(
                prompts::analysis_system_prompt(),
                prompts::analysis_user_prompt(scenario),
                ANALYSIS_TEMPERATURE,
            )
            .await?;
        tracing::debug!("Raw analysis response: {}", raw);

        let value = extract_json(&raw).ok_or_else(|| {
            OrchestraError::MalformedResponse(format!(
                "failed to parse JSON from analysis response: {}",
                raw
            ))
        })?;

        let batch = AgentBatch::from_value(value)?;
        tracing::info!("Model proposed {} agent(s)", batch.agents.len());
        Ok(batch.agents)
    }

    /// Reason as one agent; an unparseable reply is `MalformedResponse`
    pub async fn reason(&self, request: &ReasoningRequest) -> Result<AgentReply> {
        let raw = self
            .complete(
                prompts::AGENT_SYSTEM_PROMPT.to_string(),
                prompts::agent_prompt(request),
                REASONING_TEMPERATURE,
            )
            .await?;
        tracing::debug!("Agent '{}' raw response: {}", request.agent_name, raw);

        extract_json(&raw)
            .as_ref()
            .and_then(AgentReply::from_value)
            .ok_or(OrchestraError::MalformedResponse(raw))
    }
}
