//! tutor-tune - Feedback-Driven Prompt Optimization
//!
//! Entry point for the optimizer CLI. Run with `run` to optimize an agent's
//! signatures against its recorded feedback, `list`/`show` to inspect past
//! artifacts, and `init` to prepare a feedback store.

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};
use tutor_tune_core::{error::Result, AgentType};

#[derive(Parser)]
#[command(name = "tutor-tune")]
#[command(about = "Feedback-driven prompt optimization for tutoring agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Feedback store path or libsql:// URL (overrides TUTOR_TUNE_DB_URL)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Artifact directory (overrides TUTOR_TUNE_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "TUTOR_TUNE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize an agent's signatures against its feedback
    Run {
        /// Agent whose feedback to use (sage|lexi)
        #[arg(short, long)]
        agent: AgentType,

        /// Signature to optimize (maths|explain|diagnose|all)
        #[arg(short, long, default_value = "all")]
        signature: String,

        /// Reasoning engine model (overrides config)
        #[arg(short, long)]
        model: Option<String>,

        /// Write artifacts but leave feedback unprocessed
        #[arg(long)]
        dry_run: bool,
    },

    /// List archived artifacts
    List {
        /// Only show artifacts for this agent
        #[arg(short, long)]
        agent: Option<AgentType>,
    },

    /// Show the latest artifact for an agent
    Show {
        /// Agent (sage|lexi)
        #[arg(short, long)]
        agent: AgentType,

        /// Print the raw artifact JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the feedback schema and report pending feedback
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Keep our own level but quiet the database and HTTP stacks
    let filter = EnvFilter::new(format!(
        "tutor_tune={},tutor_tune_core={},libsql=warn,reqwest=warn,hyper=warn",
        level.as_str().to_lowercase(),
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Logs on stderr, summaries on stdout
        .init();

    debug!("tutor-tune v{} starting...", env!("CARGO_PKG_VERSION"));

    let overrides = cli::helpers::Overrides {
        config: cli.config,
        db_path: cli.db_path,
        output_dir: cli.output_dir,
    };

    match cli.command {
        Commands::Run {
            agent,
            signature,
            model,
            dry_run,
        } => cli::run::handle(agent, &signature, model, dry_run, overrides).await,
        Commands::List { agent } => cli::list::handle(agent, overrides).await,
        Commands::Show { agent, json } => cli::show::handle(agent, json, overrides).await,
        Commands::Init => cli::init::handle(overrides).await,
    }
}
