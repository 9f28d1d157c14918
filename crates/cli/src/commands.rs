//! CLI subcommand handlers

use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use futures::StreamExt;
use orchestra::{OrchestraConfig, OrchestrationEvent, Runtime};

use crate::output::OutputHandler;

/// Scenario from the argument, or all of stdin when omitted
pub fn read_scenario(arg: Option<String>) -> Result<String> {
    let scenario = match arg {
        Some(s) => s,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read scenario from stdin")?;
            buf
        }
    };

    let scenario = scenario.trim();
    if scenario.is_empty() {
        bail!("Scenario must not be empty");
    }
    Ok(scenario.to_string())
}

/// Run to completion and print the aggregate as JSON
pub async fn run(runtime: &Runtime, scenario: &str, model: Option<&str>) -> Result<()> {
    let result = runtime.run(scenario, model).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Print events as they arrive. Fails if the run reported an error.
pub async fn stream(
    runtime: &Runtime,
    scenario: &str,
    model: Option<&str>,
    human: bool,
    show_memory: bool,
) -> Result<()> {
    let output = OutputHandler::new(show_memory);
    let mut events = runtime.stream(scenario, model);
    let mut failure = None;

    let stdout = io::stdout();
    while let Some(event) = events.next().await {
        if human {
            output.print_event(&event);
        } else {
            let mut handle = stdout.lock();
            writeln!(handle, "{}", serde_json::to_string(&event)?)?;
            handle.flush()?;
        }

        if let OrchestrationEvent::Error { message } = event {
            failure = Some(message);
        }
    }

    match failure {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

/// Show the effective configuration; API keys are never printed
pub fn show_config(config: &OrchestraConfig) -> Result<()> {
    println!();
    println!("{}", "▶ Configuration".bright_yellow().bold());
    println!("{}", "─".repeat(60).dimmed());
    println!("{}", serde_json::to_string_pretty(config)?);

    let key_status = |present: bool| {
        if present {
            "set".bright_green()
        } else {
            "not set".yellow()
        }
    };
    println!();
    println!(
        "  {} {}",
        "LLM API key:".dimmed(),
        key_status(config.llm.api_key.is_some())
    );
    println!(
        "  {} {}",
        "Embedding API key:".dimmed(),
        key_status(config.embedding.api_key.is_some())
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use orchestra::testing::{runtime, ScriptedProvider};

    use super::*;

    #[test]
    fn test_read_scenario_trims_argument() {
        assert_eq!(
            read_scenario(Some("  Flood in the valley \n".to_string())).unwrap(),
            "Flood in the valley"
        );
        assert!(read_scenario(Some("   ".to_string())).is_err());
    }

    #[tokio::test]
    async fn test_stream_surfaces_run_failure() {
        let runtime = runtime(ScriptedProvider::new().fail_analysis());
        let err = stream(&runtime, "Flood", None, true, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_stream_succeeds() {
        let runtime = runtime(ScriptedProvider::new());
        assert!(stream(&runtime, "Flood", None, false, false).await.is_ok());
    }
}
