//! Tally CLI - run DSL programs and natural-language requests
//!
//! Provides subcommands for executing DSL directly, asking the text
//! generator, and inspecting the stored conference state.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use tally::config::AppConfig;
use tally::engine::Domain;
use tally::pipeline::{Assistant, OllamaClient, RequestOutcome, run_dsl};
use tally::store::{JsonFileStore, StateStore};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Execute bill, ride and conference DSL programs", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of <domain>.pest grammars (overrides config)
    #[arg(long)]
    grammar_dir: Option<PathBuf>,

    /// Conference state file (overrides config)
    #[arg(long)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute DSL source directly
    Run {
        /// Domain: bill, ride or event
        #[arg(short, long)]
        domain: Domain,

        /// Read the DSL from this file instead of the argument
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Role the request runs under (event domain)
        #[arg(short, long)]
        role: Option<String>,

        /// DSL source text
        source: Option<String>,
    },

    /// Translate a natural-language request and execute it
    Ask {
        /// Domain: bill, ride or event
        #[arg(short, long)]
        domain: Domain,

        /// Role the request runs under (required for the event domain)
        #[arg(short, long)]
        role: Option<String>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// The request, in plain words
        query: String,
    },

    /// Print the stored conference state
    State,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.grammar_dir {
        config.grammar_dir = Some(dir);
    }
    if let Some(path) = cli.state {
        config.state_path = path;
    }
    let store = JsonFileStore::new(&config.state_path);

    let outcome = match cli.command {
        Commands::Run {
            domain,
            file,
            role,
            source,
        } => {
            let dsl = match (file, source) {
                (Some(path), _) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read DSL file: {:?}", path))?,
                (None, Some(text)) => text,
                (None, None) => anyhow::bail!("provide DSL source or --file"),
            };
            match run_dsl(domain, &dsl, &config.grammar_source(), &store, role.as_deref()) {
                Ok(interpreter_result) => RequestOutcome::Success {
                    llm_generated_dsl: dsl,
                    interpreter_result,
                },
                Err(err) => RequestOutcome::Error {
                    message: err.to_string(),
                    llm_generated_dsl: Some(dsl),
                },
            }
        }

        Commands::Ask {
            domain,
            role,
            model,
            query,
        } => {
            if let Some(model) = model {
                config.generator.model = model;
            }
            let assistant = Assistant::new(
                OllamaClient::new(&config.generator),
                store,
                config.grammar_source(),
            );
            assistant.process(domain, &query, role.as_deref())
        }

        Commands::State => {
            let loaded = store.load()?;
            println!("{}", serde_json::to_string_pretty(&loaded.state)?);
            eprintln!("version {}", loaded.version);
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
