//! Artifact listing command

use tutor_tune_core::{error::Result, AgentType, ArtifactStore};

use super::helpers::{load_config, Overrides};

/// Handle the list command
pub async fn handle(agent: Option<AgentType>, overrides: Overrides) -> Result<()> {
    let config = load_config(&overrides)?;
    let store = ArtifactStore::new(&config.optimizer.output_dir);
    let archives = store.list(agent).await?;

    if archives.is_empty() {
        println!(
            " No artifacts found in {}",
            config.optimizer.output_dir.display()
        );
        return Ok(());
    }

    println!(" {} artifact(s):", archives.len());
    for path in archives {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        println!("  {}", name);
    }
    Ok(())
}
