//! Shared helper functions for CLI commands
//!
//! Configuration resolution and signature selection used by several
//! subcommands.

use std::path::PathBuf;
use tracing::debug;
use tutor_tune_core::{
    error::{Result, TutorError},
    OptimizerConfig, SignatureKind,
};

/// Global flags that override file and environment settings
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub db_path: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Load configuration, then apply command-line overrides on top
pub fn load_config(overrides: &Overrides) -> Result<OptimizerConfig> {
    let mut config = OptimizerConfig::load(overrides.config.as_deref())?;

    if let Some(db_path) = &overrides.db_path {
        debug!("Feedback store overridden by --db-path");
        config.store.url = Some(db_path.clone());
    }
    if let Some(output_dir) = &overrides.output_dir {
        config.optimizer.output_dir = output_dir.clone();
    }

    Ok(config)
}

/// Parse `--signature`: one name or `all`
pub fn parse_signatures(value: &str) -> Result<Vec<SignatureKind>> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(SignatureKind::all().to_vec());
    }
    value
        .parse::<SignatureKind>()
        .map(|kind| vec![kind])
        .map_err(|_| {
            TutorError::Config(format!(
                "Unknown signature '{}' (expected maths, explain, diagnose or all)",
                value
            ))
        })
}
