//! Optimization run command

use std::sync::Arc;
use tracing::{debug, info};
use tutor_tune_core::{
    config::api_key_from_env, error::Result, AgentType, LibsqlFeedbackStore, LlmConfig,
    LlmService, Optimizer, RunRequest, SignatureStatus,
};

use super::helpers::{load_config, parse_signatures, Overrides};

/// Handle the run command
///
/// Configuration problems fail before any signature is touched. Per-signature
/// failures only show up in the summary.
pub async fn handle(
    agent: AgentType,
    signature: &str,
    model: Option<String>,
    dry_run: bool,
    overrides: Overrides,
) -> Result<()> {
    let signatures = parse_signatures(signature)?;

    let mut config = load_config(&overrides)?;
    if let Some(model) = model {
        config.llm.model = model;
    }

    let credentials = config.store_credentials()?;
    let api_key = api_key_from_env()?;

    let store = LibsqlFeedbackStore::from_credentials(&credentials).await?;
    let engine = LlmService::new(LlmConfig::from_settings(&config.llm, api_key))?;
    debug!("Reasoning engine ready: {}", engine.config().model);

    let optimizer = Optimizer::new(agent, Arc::new(store), Arc::new(engine), config);
    let request = RunRequest {
        signatures,
        dry_run,
    };
    let report = optimizer.run(&request).await?;

    println!();
    println!(" Optimization summary ({}, {})", agent, optimizer.model());
    for result in report.results.values() {
        let marker = match result.status {
            SignatureStatus::Success => "✓",
            SignatureStatus::Skipped => "-",
            SignatureStatus::Error => "✗",
        };
        println!("  {} {}", marker, result.summary_line());
    }
    println!();
    println!(" Artifact: {}", report.saved.archive.display());
    println!(" Latest:   {}", report.saved.latest.display());

    match report.marked {
        Some(count) => println!(" Marked {} feedback records as processed", count),
        None => {
            info!("Dry run complete");
            println!(" Dry run: feedback left unprocessed");
        }
    }

    Ok(())
}
