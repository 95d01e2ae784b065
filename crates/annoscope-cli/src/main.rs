use anyhow::{Context, Result};
use annoscope_core::config::LoggingConfig;
use annoscope_core::run::{AnnotationType, PromptReference};
use annoscope_infrastructure::ConfigService;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "annoscope")]
#[command(about = "Annoscope CLI - group annotation runs into comparable collections", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/annoscope/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List runs that can be added to a collection
    EligibleRuns {
        collection: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// List collections that can be merged into a collection
    Mergeable {
        collection: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Add runs to a collection
    AddRuns {
        collection: String,
        #[arg(required = true)]
        runs: Vec<String>,
    },
    /// Copy the runs of one or more collections into a target collection
    Merge {
        target: String,
        #[arg(required = true)]
        sources: Vec<String>,
    },
    /// Create a collection with one run per prompt and model
    Provision {
        #[arg(long)]
        project: String,
        #[arg(long)]
        name: String,
        /// Session id (repeatable)
        #[arg(long = "session", required = true)]
        sessions: Vec<String>,
        /// Prompt as <id>@<version> (repeatable)
        #[arg(long = "prompt", required = true)]
        prompts: Vec<PromptReference>,
        /// Model code (repeatable)
        #[arg(long = "model", required = true)]
        models: Vec<String>,
        /// PER_UTTERANCE or PER_SESSION
        #[arg(long)]
        annotation_type: AnnotationType,
    },
    /// Register a session so that runs can be provisioned over it
    RegisterSession {
        #[arg(long)]
        project: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "CSV")]
        file_type: String,
    },
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
/// Logs go to stderr; stdout carries command output.
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.as_str()));
    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigService::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    init_tracing(&config.logging);
    tracing::debug!(target: "config", adapter = ?config.store.adapter, "Configuration loaded");

    let app = commands::App::open(&config).await?;

    match cli.command {
        Commands::EligibleRuns {
            collection,
            page,
            page_size,
        } => app.eligible_runs(&collection, page, page_size).await?,
        Commands::Mergeable {
            collection,
            page,
            page_size,
        } => app.mergeable(&collection, page, page_size).await?,
        Commands::AddRuns { collection, runs } => app.add_runs(&collection, &runs).await?,
        Commands::Merge { target, sources } => app.merge(&target, sources).await?,
        Commands::Provision {
            project,
            name,
            sessions,
            prompts,
            models,
            annotation_type,
        } => {
            app.provision(project, name, sessions, &prompts, &models, annotation_type)
                .await?
        }
        Commands::RegisterSession {
            project,
            id,
            name,
            file_type,
        } => app.register_session(project, id, name, file_type).await?,
    }

    Ok(())
}
