//! `scanstation`: drives workflows on a scanstation server.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::{Action, Context};
use error::CliError;
use rootcause::Report;
use scanstation_client::{ClientConfig, HttpApi};
use scanstation_core::{ClientMode, WorkflowId};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Scanstation workflow client
#[derive(Parser)]
#[command(name = "scanstation")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server URL (default: SCANSTATION__BASE_URL or http://127.0.0.1:5000/)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Which half of the pipeline the server runs: full, scanner or processor
    #[arg(long, global = true)]
    mode: Option<ClientMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every workflow
    List,

    /// Show a workflow and its configuration form
    Show {
        id: WorkflowId,

        /// Plugin to show options for (default: the first one)
        #[arg(long)]
        plugin: Option<String>,

        /// Include advanced options
        #[arg(long)]
        advanced: bool,

        /// Print the form as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a workflow every time it changes, until interrupted
    Watch { id: WorkflowId },

    /// Create a workflow
    Create {
        name: String,

        /// Values to set before saving, as <path>=<value>
        #[arg(long = "set", value_parser = commands::parse_assignment)]
        assignments: Vec<(String, String)>,
    },

    /// Change and save a workflow's name or configuration
    Set {
        id: WorkflowId,

        /// Values to set, as <path>=<value>
        #[arg(required = true, value_parser = commands::parse_assignment)]
        assignments: Vec<(String, String)>,
    },

    /// Request postprocessing
    Submit { id: WorkflowId },

    /// Queue a workflow for processing
    Enqueue { id: WorkflowId },

    /// Remove a workflow from the processing queue
    Dequeue { id: WorkflowId },

    /// Capture a spread
    Capture {
        id: WorkflowId,

        /// Replace the last capture
        #[arg(long)]
        retake: bool,
    },

    /// End the capture phase
    Finish { id: WorkflowId },
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Report<CliError>> {
    let mut config = ClientConfig::from_env().map_err(|e| CliError::Config {
        details: e.to_string(),
    })?;
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Report<CliError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let api = HttpApi::new(&config).map_err(|e| CliError::Config {
        details: e.to_string(),
    })?;
    tracing::debug!(base_url = %api.base_url(), mode = %config.mode, "loaded configuration");

    let ctx = Context {
        api: Arc::new(api),
        settings: config.poll,
        mode: config.mode,
    };

    let output = match cli.command {
        Commands::List => commands::list(&ctx).await?,
        Commands::Show {
            id,
            plugin,
            advanced,
            json,
        } => commands::show(&ctx, id, plugin, advanced, json).await?,
        Commands::Watch { id } => {
            commands::watch(&ctx, id, shutdown_signal(), |line| println!("{line}")).await?;
            return Ok(());
        }
        Commands::Create { name, assignments } => {
            commands::create(&ctx, &name, &assignments).await?
        }
        Commands::Set { id, assignments } => commands::set(&ctx, id, &assignments).await?,
        Commands::Submit { id } => commands::act(&ctx, id, Action::Submit).await?,
        Commands::Enqueue { id } => commands::act(&ctx, id, Action::Enqueue).await?,
        Commands::Dequeue { id } => commands::act(&ctx, id, Action::Dequeue).await?,
        Commands::Capture { id, retake } => {
            commands::act(&ctx, id, Action::Capture { retake }).await?
        }
        Commands::Finish { id } => commands::act(&ctx, id, Action::Finish).await?,
    };
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
