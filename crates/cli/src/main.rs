//! Orchestra CLI
//!
//! Runs a scenario through the multi-agent pipeline without the HTTP server.

mod commands;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use orchestra::{OrchestraConfig, Runtime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Orchestra CLI - memory-augmented multi-agent orchestration
#[derive(Parser)]
#[command(name = "orchestra")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Design, order and run an agent ensemble for a scenario")]
#[command(long_about = r#"
Orchestra asks a language model to design a set of cooperating agents for a
scenario, orders them by their dependencies and runs them one at a time.
Each completed run is remembered and recalled for similar scenarios.

Configuration is read from the environment (or a `.env` file):
  LLM_PROVIDER, LLM_MODEL, GROQ_API_KEY, EMBEDDING_PROVIDER, MEMORY_STORE_URL, ...

Examples:
  orchestra run "Chemical spill near the river"
  echo "Server outage in eu-west" | orchestra stream --human
  orchestra config
"#)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the aggregate result as JSON
    Run {
        /// Scenario text (read from stdin when omitted)
        scenario: Option<String>,

        /// Model to use instead of the configured one
        #[arg(short, long, env = "ORCHESTRA_MODEL")]
        model: Option<String>,
    },

    /// Stream progress events while a scenario runs
    Stream {
        /// Scenario text (read from stdin when omitted)
        scenario: Option<String>,

        /// Model to use instead of the configured one
        #[arg(short, long, env = "ORCHESTRA_MODEL")]
        model: Option<String>,

        /// Colored progress instead of JSON lines
        #[arg(long)]
        human: bool,

        /// With --human, also print the recalled cases
        #[arg(long, requires = "human")]
        show_memory: bool,
    },

    /// Show the effective configuration
    Config,
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = OrchestraConfig::from_env()?;

    match cli.command {
        Commands::Run { scenario, model } => {
            let scenario = commands::read_scenario(scenario)?;
            let runtime = Runtime::from_config(config).await?;
            commands::run(&runtime, &scenario, model.as_deref()).await
        }
        Commands::Stream {
            scenario,
            model,
            human,
            show_memory,
        } => {
            let scenario = commands::read_scenario(scenario)?;
            let runtime = Runtime::from_config(config).await?;
            commands::stream(&runtime, &scenario, model.as_deref(), human, show_memory).await
        }
        Commands::Config => commands::show_config(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("orchestra_cli={level},orchestra={level},warn", level = log_level).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "✗".bright_red(), e);
            ExitCode::FAILURE
        }
    }
}
