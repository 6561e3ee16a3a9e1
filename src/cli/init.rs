//! Feedback store initialization command

use tracing::debug;
use tutor_tune_core::{error::Result, AgentType, FeedbackStore, LibsqlFeedbackStore};

use super::helpers::{load_config, Overrides};

/// Handle the init command
///
/// Opening the store applies any pending migrations.
pub async fn handle(overrides: Overrides) -> Result<()> {
    debug!("Initializing feedback store...");

    let config = load_config(&overrides)?;
    let credentials = config.store_credentials()?;
    let store = LibsqlFeedbackStore::from_credentials(&credentials).await?;
    store.check_health().await?;

    println!(" Feedback store initialized: {}", credentials.url);
    for agent in AgentType::all() {
        let pending = store.count_unprocessed(agent).await?;
        println!("  {}: {} unprocessed feedback record(s)", agent, pending);
    }
    Ok(())
}
