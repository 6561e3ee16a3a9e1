//! Latest artifact display command

use tutor_tune_core::{error::Result, AgentType, ArtifactStore};

use super::helpers::{load_config, Overrides};

/// Handle the show command
pub async fn handle(agent: AgentType, json: bool, overrides: Overrides) -> Result<()> {
    let config = load_config(&overrides)?;
    let store = ArtifactStore::new(&config.optimizer.output_dir);

    let Some(artifact) = store.load_latest(agent).await? else {
        println!(" No optimization results for {} yet", agent);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
        return Ok(());
    }

    println!(" Agent:     {}", artifact.agent_type);
    println!(" Model:     {}", artifact.model);
    println!(
        " Generated: {}",
        artifact.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(" Version:   {}", artifact.version);
    println!();

    for result in artifact.signatures.values() {
        println!("  {}", result.summary_line());
        if let Some(prompts) = &result.optimized_prompts {
            println!("    {} stored demo(s)", prompts.demos.len());
        }
    }
    Ok(())
}
