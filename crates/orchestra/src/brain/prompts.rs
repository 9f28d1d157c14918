//! Prompt templates for scenario analysis and agent reasoning

use crate::{agent::AgentResult, workspec::AgentBatch};

use super::ReasoningRequest;

/// Prefix shared by every analysis system prompt
pub const ANALYSIS_PROMPT_HEADER: &str = "You are a multi-agent system architect.";

pub const AGENT_SYSTEM_PROMPT: &str =
    "You are a specialized AI agent in a multi-agent system. Respond only with valid JSON.";

/// Marker line carrying the agent name in a reasoning prompt
pub const AGENT_NAME_MARKER: &str = "Your name: ";

pub fn analysis_system_prompt() -> String {
    format!(
        r#"{header}

Given a scenario, design a dynamic multi-agent system.

Return strictly valid JSON of the form {{"agents": [...]}} matching this JSON schema:

{schema}

IMPORTANT RULES:
- "dependencies" must ONLY contain names of OTHER agents in the list.
- Do NOT create circular dependencies. If Agent A depends on Agent B, then Agent B must NOT depend on Agent A (directly or indirectly).
- Dependencies must form a valid DAG (directed acyclic graph).
- At least one agent must have an empty dependencies list (the starting agent).
- Agent names must be unique.

Return only JSON. No explanation, no markdown, no code fences."#,
        header = ANALYSIS_PROMPT_HEADER,
        schema = AgentBatch::json_schema()
    )
}

pub fn analysis_user_prompt(scenario: &str) -> String {
    format!("Scenario:\n{}\n\nReturn only JSON.", scenario)
}

fn render_upstream(upstream: &[AgentResult]) -> String {
    if upstream.is_empty() {
        return "None".to_string();
    }
    upstream
        .iter()
        .map(|r| format!("- {} ({}): {}", r.agent, r.status, r.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn agent_prompt(request: &ReasoningRequest) -> String {
    let memory_text = if request.memory_context.is_empty() {
        "None".to_string()
    } else {
        request.memory_context.join("\n")
    };
    let responsibilities = request
        .responsibilities
        .iter()
        .map(|r| format!("- {}", r))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an AI agent executing a task in a multi-agent system.

Previous related cases:
{memory}

Current scenario:
{scenario}

Results from agents you depend on:
{upstream}

Your role: {role}
{marker}{name}

Your responsibilities:
{responsibilities}

Based on the scenario, the upstream results and any relevant past cases, describe what actions you would take to fulfill your responsibilities. Be specific and practical.

Return strictly valid JSON:
{{
  "agent": "{name}",
  "status": "completed",
  "summary": "A specific summary of actions taken by this agent"
}}

Return only JSON. No explanation, no markdown, no code fences."#,
        memory = memory_text,
        scenario = request.scenario,
        upstream = render_upstream(&request.upstream),
        role = request.role,
        marker = AGENT_NAME_MARKER,
        name = request.agent_name,
        responsibilities = responsibilities,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReasoningRequest {
        ReasoningRequest {
            agent_name: "Medic".into(),
            role: "Triage".into(),
            responsibilities: vec!["assess injuries".into(), "prioritize".into()],
            scenario: "Bus crash on highway".into(),
            memory_context: vec![],
            upstream: vec![],
        }
    }

    #[test]
    fn test_agent_prompt_without_memory() {
        let prompt = agent_prompt(&request());
        assert!(prompt.contains("Previous related cases:\nNone"));
        assert!(prompt.contains("Your name: Medic"));
        assert!(prompt.contains("- assess injuries\n- prioritize"));
        assert!(prompt.contains("Results from agents you depend on:\nNone"));
    }

    #[test]
    fn test_agent_prompt_with_upstream() {
        let mut req = request();
        req.upstream.push(AgentResult {
            agent: "Dispatch".into(),
            status: "completed".into(),
            summary: "Two ambulances en route".into(),
        });
        let prompt = agent_prompt(&req);
        assert!(prompt.contains("- Dispatch (completed): Two ambulances en route"));
    }

    #[test]
    fn test_analysis_prompts() {
        assert!(analysis_system_prompt().starts_with(ANALYSIS_PROMPT_HEADER));
        assert_eq!(
            analysis_user_prompt("Wildfire"),
            "Scenario:\nWildfire\n\nReturn only JSON."
        );
    }
}
