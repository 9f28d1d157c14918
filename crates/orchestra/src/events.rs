//! Progress events emitted while a run executes

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use ts_rs::TS;

use crate::{agent::AgentResult, orchestrator::OrchestrationResult, workspec::WorkSpec};

/// Events emitted during an orchestration run.
///
/// Serialized as `{"event": "<type>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    /// A pipeline stage is about to start
    Status { step: String },

    MemoryRetrieved { context: Vec<String> },

    AgentsDesigned { agents: Vec<WorkSpec> },

    DependencyResolved { order: Vec<String> },

    AgentExecuting { agent: String },

    AgentCompleted { result: AgentResult },

    OrchestrationCompleted(OrchestrationResult),

    Error { message: String },

    /// Always the last event of a run
    Done {},
}

impl OrchestrationEvent {
    /// The `event` tag of this variant
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestrationEvent::Status { .. } => "status",
            OrchestrationEvent::MemoryRetrieved { .. } => "memory_retrieved",
            OrchestrationEvent::AgentsDesigned { .. } => "agents_designed",
            OrchestrationEvent::DependencyResolved { .. } => "dependency_resolved",
            OrchestrationEvent::AgentExecuting { .. } => "agent_executing",
            OrchestrationEvent::AgentCompleted { .. } => "agent_completed",
            OrchestrationEvent::OrchestrationCompleted(_) => "orchestration_completed",
            OrchestrationEvent::Error { .. } => "error",
            OrchestrationEvent::Done {} => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, OrchestrationEvent::Done {})
    }
}

/// Sending half of a run's event channel.
///
/// A disabled emitter drops every event, for callers that only want the
/// aggregate result.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    sender: Option<mpsc::UnboundedSender<OrchestrationEvent>>,
}

impl EventEmitter {
    pub fn new(sender: mpsc::UnboundedSender<OrchestrationEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: OrchestrationEvent) {
        if let Some(ref sender) = self.sender {
            // Ignore send errors (consumer went away)
            let _ = sender.send(event);
        }
    }

    // Convenience methods for common events

    pub fn status(&self, step: &str) {
        tracing::info!("{}", step);
        self.emit(OrchestrationEvent::Status {
            step: step.to_string(),
        });
    }

    pub fn memory_retrieved(&self, context: &[String]) {
        self.emit(OrchestrationEvent::MemoryRetrieved {
            context: context.to_vec(),
        });
    }

    pub fn agents_designed(&self, agents: &[WorkSpec]) {
        self.emit(OrchestrationEvent::AgentsDesigned {
            agents: agents.to_vec(),
        });
    }

    pub fn dependency_resolved(&self, order: &[String]) {
        self.emit(OrchestrationEvent::DependencyResolved {
            order: order.to_vec(),
        });
    }

    pub fn agent_executing(&self, agent: &str) {
        self.emit(OrchestrationEvent::AgentExecuting {
            agent: agent.to_string(),
        });
    }

    pub fn agent_completed(&self, result: &AgentResult) {
        self.emit(OrchestrationEvent::AgentCompleted {
            result: result.clone(),
        });
    }

    pub fn orchestration_completed(&self, result: &OrchestrationResult) {
        self.emit(OrchestrationEvent::OrchestrationCompleted(result.clone()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(OrchestrationEvent::Error {
            message: message.into(),
        });
    }

    pub fn done(&self) {
        self.emit(OrchestrationEvent::Done {});
    }
}
