//! Error types for the tutor-tune optimization pipeline
//!
//! Uses thiserror for structured error definitions. The variants mirror the
//! failure classes the orchestrator cares about: configuration problems abort
//! a run, compile and evaluation failures are contained per signature or per
//! example, and persistence failures block feedback consumption.

use thiserror::Error;

/// Main error type for tutor-tune operations
#[derive(Error, Debug)]
pub enum TutorError {
    /// Missing credentials or invalid settings (fatal for a run)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feedback store operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Reasoning engine request failed or returned garbage
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Bootstrap compile step failed
    #[error("Compile error: {0}")]
    Compile(String),

    /// A single evaluation example could not be scored
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Optimization artifact could not be written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Signature input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reasoning engine output lacked a declared field
    #[error("Missing output field: {0}")]
    MissingField(String),

    /// Unknown signature name
    #[error("Unknown signature: {0}")]
    UnknownSignature(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Config file parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for tutor-tune operations
pub type Result<T> = std::result::Result<T, TutorError>;

impl From<libsql::Error> for TutorError {
    fn from(err: libsql::Error) -> Self {
        TutorError::Database(err.to_string())
    }
}

/// Convert anyhow::Error to TutorError
impl From<anyhow::Error> for TutorError {
    fn from(err: anyhow::Error) -> Self {
        TutorError::Other(err.to_string())
    }
}

impl TutorError {
    /// Whether this error must abort the whole run before any signature is processed
    pub fn is_fatal(&self) -> bool {
        matches!(self, TutorError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TutorError::Config("FEEDBACK store URL not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: FEEDBACK store URL not set"
        );
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        assert!(json_err.is_err());

        let err: TutorError = json_err.unwrap_err().into();
        assert!(matches!(err, TutorError::Serialization(_)));
    }

    #[test]
    fn test_only_config_is_fatal() {
        assert!(TutorError::Config("x".into()).is_fatal());
        assert!(!TutorError::Compile("x".into()).is_fatal());
        assert!(!TutorError::Persistence("x".into()).is_fatal());
    }
}
