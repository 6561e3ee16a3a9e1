//! Configuration for tutor-tune
//!
//! Settings are read from an optional TOML file and then overridden by the
//! environment. Credentials (store token, reasoning-engine key) are only ever
//! read from the environment, never from the file.
//!
//! ```toml
//! [optimizer]
//! min_training_examples = 10
//! eval_sample_size = 20
//!
//! [bootstrap]
//! max_bootstrapped_demos = 4
//! max_labeled_demos = 8
//!
//! [llm]
//! model = "gemini/gemini-1.5-flash-latest"
//! ```

use crate::error::{Result, TutorError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Feedback store location: a local path or a `libsql://` URL
pub const DB_URL_ENV: &str = "TUTOR_TUNE_DB_URL";
/// Auth token for remote feedback stores
pub const DB_TOKEN_ENV: &str = "TUTOR_TUNE_DB_TOKEN";
/// Reasoning engine API key
pub const API_KEY_ENV: &str = "GOOGLE_AI_API_KEY";
/// Overrides the model from the config file
pub const MODEL_ENV: &str = "TUTOR_TUNE_MODEL";
/// Overrides the artifact output directory
pub const OUTPUT_DIR_ENV: &str = "TUTOR_TUNE_OUTPUT_DIR";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub optimizer: OptimizerSettings,
    pub bootstrap: BootstrapConfig,
    pub llm: LlmSettings,
    pub store: StoreSettings,
}

/// Data windows, sample caps and the under-data guard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Below this many training examples a signature is skipped
    pub min_training_examples: usize,
    pub train_since_days: i64,
    pub train_limit: usize,
    pub eval_since_days: i64,
    pub eval_limit: usize,
    /// Evaluation examples actually scored per pass
    pub eval_sample_size: usize,
    /// Training examples offered to the compile step
    pub compile_trainset_size: usize,
    /// Demos written into the artifact
    pub stored_demo_limit: usize,
    /// Records loaded per page when marking feedback processed
    pub mark_page_size: usize,
    pub output_dir: PathBuf,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            min_training_examples: 10,
            train_since_days: 30,
            train_limit: 500,
            eval_since_days: 90,
            eval_limit: 100,
            eval_sample_size: 20,
            compile_trainset_size: 100,
            stored_demo_limit: 5,
            mark_page_size: 1000,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Bootstrap few-shot search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub max_bootstrapped_demos: usize,
    pub max_labeled_demos: usize,
    pub max_rounds: usize,
    /// Minimum composite score for a run to become a demo candidate
    pub metric_threshold: f64,
    /// Candidate failures tolerated before the compile step gives up
    pub max_errors: usize,
    /// Seed for the candidate visiting order
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_bootstrapped_demos: 4,
            max_labeled_demos: 8,
            max_rounds: 1,
            metric_threshold: 0.5,
            max_errors: 10,
            seed: 0,
        }
    }
}

/// Reasoning engine settings (the key comes from the environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub api_base: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gemini/gemini-1.5-flash-latest".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// Feedback store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Local database path or `libsql://` URL
    pub url: Option<String>,
}

/// Resolved store credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub url: String,
    pub token: Option<String>,
}

impl OptimizerConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Reading config from {}", path.display());
                let content = std::fs::read_to_string(path).map_err(|e| {
                    TutorError::Config(format!(
                        "Failed to read config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text (missing keys take defaults)
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(DB_URL_ENV) {
            self.store.url = Some(url);
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            self.llm.model = model;
        }
        if let Some(dir) = non_empty_env(OUTPUT_DIR_ENV) {
            self.optimizer.output_dir = PathBuf::from(dir);
        }
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        let o = &self.optimizer;
        if o.eval_sample_size == 0 || o.compile_trainset_size == 0 || o.mark_page_size == 0 {
            return Err(TutorError::Config(
                "eval_sample_size, compile_trainset_size and mark_page_size must be positive"
                    .to_string(),
            ));
        }
        if o.train_since_days <= 0 || o.eval_since_days <= 0 {
            return Err(TutorError::Config(
                "data windows must be at least one day".to_string(),
            ));
        }

        let b = &self.bootstrap;
        if b.max_rounds == 0 {
            return Err(TutorError::Config("max_rounds must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&b.metric_threshold) {
            return Err(TutorError::Config(format!(
                "metric_threshold must be within [0, 1], got {}",
                b.metric_threshold
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(TutorError::Config(format!(
                "temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }

        Ok(())
    }

    /// Store location plus token; fails when no location is configured
    pub fn store_credentials(&self) -> Result<StoreCredentials> {
        let url = self.store.url.clone().filter(|u| !u.is_empty()).ok_or_else(|| {
            TutorError::Config(format!(
                "Feedback store not configured. Set {} (local path or libsql:// URL)",
                DB_URL_ENV
            ))
        })?;

        let token = non_empty_env(DB_TOKEN_ENV);
        if url.starts_with("libsql://") && token.is_none() {
            return Err(TutorError::Config(format!(
                "{} is required for remote feedback stores",
                DB_TOKEN_ENV
            )));
        }

        info!("Using feedback store: {}", redact(&url));
        Ok(StoreCredentials { url, token })
    }
}

/// Reasoning engine API key from the environment
pub fn api_key_from_env() -> Result<String> {
    non_empty_env(API_KEY_ENV).ok_or_else(|| {
        TutorError::Config(format!("{} environment variable required", API_KEY_ENV))
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Strip any query string so tokens in URLs never reach the logs
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [DB_URL_ENV, DB_TOKEN_ENV, API_KEY_ENV, MODEL_ENV, OUTPUT_DIR_ENV] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = OptimizerConfig::default();
        assert_eq!(config.optimizer.min_training_examples, 10);
        assert_eq!(config.optimizer.train_limit, 500);
        assert_eq!(config.optimizer.eval_limit, 100);
        assert_eq!(config.optimizer.eval_sample_size, 20);
        assert_eq!(config.optimizer.compile_trainset_size, 100);
        assert_eq!(config.optimizer.mark_page_size, 1000);
        assert_eq!(config.bootstrap.max_bootstrapped_demos, 4);
        assert_eq!(config.bootstrap.max_labeled_demos, 8);
        assert_eq!(config.bootstrap.max_rounds, 1);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_tokens, 2048);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OptimizerConfig::from_toml(
            r#"
            [optimizer]
            min_training_examples = 25

            [bootstrap]
            max_labeled_demos = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.optimizer.min_training_examples, 25);
        assert_eq!(config.optimizer.eval_sample_size, 20);
        assert_eq!(config.bootstrap.max_labeled_demos, 2);
        assert_eq!(config.bootstrap.max_bootstrapped_demos, 4);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = OptimizerConfig::default();
        config.bootstrap.metric_threshold = 1.5;
        assert!(matches!(config.validate(), Err(TutorError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_missing_store_url_is_config_error() {
        clear_env();
        let config = OptimizerConfig::load(None).unwrap();
        let err = config.store_credentials().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    #[serial]
    fn test_remote_store_requires_token() {
        clear_env();
        env::set_var(DB_URL_ENV, "libsql://feedback.example.io");
        let config = OptimizerConfig::load(None).unwrap();
        assert!(matches!(
            config.store_credentials(),
            Err(TutorError::Config(_))
        ));

        env::set_var(DB_TOKEN_ENV, "secret-token");
        let creds = config.store_credentials().unwrap();
        assert_eq!(creds.token.as_deref(), Some("secret-token"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        env::set_var(MODEL_ENV, "gemini/gemini-2.0-flash");
        env::set_var(DB_URL_ENV, "/tmp/feedback.db");
        let config = OptimizerConfig::load(None).unwrap();
        assert_eq!(config.llm.model, "gemini/gemini-2.0-flash");
        assert_eq!(config.store.url.as_deref(), Some("/tmp/feedback.db"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_api_key_required() {
        clear_env();
        assert!(matches!(api_key_from_env(), Err(TutorError::Config(_))));
        env::set_var(API_KEY_ENV, "abc");
        assert_eq!(api_key_from_env().unwrap(), "abc");
        clear_env();
    }
}
