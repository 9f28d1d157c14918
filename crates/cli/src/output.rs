//! Terminal rendering of orchestration events

use colored::Colorize;
use orchestra::{AgentResult, OrchestrationEvent, OrchestrationResult};

/// Longest summary shown inline before truncating
const SUMMARY_WIDTH: usize = 100;

fn truncate(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        flat
    } else {
        let cut: String = flat.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Output handler for terminal display
pub struct OutputHandler {
    pub show_memory: bool,
}

impl OutputHandler {
    pub fn new(show_memory: bool) -> Self {
        Self { show_memory }
    }

    /// Human-readable lines for one event; `done` renders nothing
    pub fn render(&self, event: &OrchestrationEvent) -> Vec<String> {
        match event {
            OrchestrationEvent::Status { step } => {
                vec![format!("{} {}", "▶".bright_yellow(), step.dimmed())]
            }
            OrchestrationEvent::MemoryRetrieved { context } => {
                let mut lines = vec![format!(
                    "{} {} related case(s) recalled",
                    "ℹ".bright_blue(),
                    context.len()
                )];
                if self.show_memory {
                    for trace in context {
                        for line in trace.lines() {
                            lines.push(format!("    {}", line.dimmed()));
                        }
                    }
                }
                lines
            }
            OrchestrationEvent::AgentsDesigned { agents } => {
                let mut lines = vec![format!(
                    "{} {} agent(s) designed",
                    "✓".bright_green(),
                    agents.len()
                )];
                for spec in agents {
                    let deps = if spec.dependencies.is_empty() {
                        String::new()
                    } else {
                        format!(" ← {}", spec.dependencies.join(", "))
                    };
                    lines.push(format!(
                        "    {} {}{}",
                        spec.name.bright_white(),
                        format!("({})", spec.role).dimmed(),
                        deps.dimmed()
                    ));
                }
                lines
            }
            OrchestrationEvent::DependencyResolved { order } => vec![format!(
                "{} Execution order: {}",
                "✓".bright_green(),
                order.join(" → ").bright_white()
            )],
            OrchestrationEvent::AgentExecuting { agent } => {
                vec![format!("{} {}...", "⋯".bright_cyan(), agent.bright_white())]
            }
            OrchestrationEvent::AgentCompleted { result } => vec![self.agent_line(result)],
            OrchestrationEvent::OrchestrationCompleted(result) => self.summary_lines(result),
            OrchestrationEvent::Error { message } => {
                vec![format!("{} {}", "✗".bright_red(), message.bright_red())]
            }
            OrchestrationEvent::Done {} => Vec::new(),
        }
    }

    fn agent_line(&self, result: &AgentResult) -> String {
        format!(
            "{} {} [{}] {}",
            "✓".bright_green(),
            result.agent.bright_white(),
            result.status.cyan(),
            truncate(&result.summary, SUMMARY_WIDTH)
        )
    }

    fn summary_lines(&self, result: &OrchestrationResult) -> Vec<String> {
        vec![
            String::new(),
            format!("{}", "Orchestration complete".bright_yellow().bold()),
            format!("{}", "─".repeat(60).dimmed()),
            format!("  {} {}", "Agents:".dimmed(), result.agents_created),
            format!(
                "  {} {}",
                "Memory cases used:".dimmed(),
                result.memory_context_used.len()
            ),
        ]
    }

    pub fn print_event(&self, event: &OrchestrationEvent) {
        for line in self.render(event) {
            println!("{}", line);
        }
    }
}
