//! Reasoning engine
//!
//! The optimizer only sees [`ReasoningEngine`]: structured inputs in,
//! structured output fields out. [`LlmService`] implements it against the
//! Gemini `generateContent` endpoint using the chain-of-thought prompt format
//! from [`crate::services::prompt`].

use crate::config::LlmSettings;
use crate::error::{Result, TutorError};
use crate::optimizer::program::PromptProgram;
use crate::services::prompt::{parse_completion, render_prompt};
use crate::signatures::{FieldMap, SignatureSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One call to the engine
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub signature: &'static SignatureSpec,
    pub program: PromptProgram,
    /// Inputs with defaults already applied
    pub inputs: FieldMap,
    /// Overrides the configured temperature for this call
    pub temperature: Option<f32>,
}

/// Black-box callable from structured inputs to structured outputs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Returns the reasoning plus whatever output fields the engine produced
    async fn predict(&self, request: PredictRequest) -> Result<FieldMap>;
}

/// Configuration for LLM service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,

    /// Model id; a `gemini/` provider prefix is accepted and stripped
    pub model: String,

    /// Max output tokens
    pub max_tokens: usize,

    /// Default sampling temperature
    pub temperature: f32,

    pub api_base: String,
}

impl LlmConfig {
    pub fn from_settings(settings: &LlmSettings, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Model id as the API expects it
    pub fn api_model(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.model)
    }
}

/// HTTP client for the Gemini API
pub struct LlmService {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(TutorError::Config(
                "Reasoning engine API key not set".to_string(),
            ));
        }

        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn call_api(&self, prompt: &str, temperature: f32) -> Result<String> {
        debug!("Calling Gemini API ({})", self.config.api_model());

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base,
            self.config.api_model()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TutorError::LlmApi(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TutorError::LlmApi(format!("Failed to parse response: {}", e)))?;

        extract_text(api_response)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(TutorError::LlmApi("Empty response from API".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl ReasoningEngine for LlmService {
    async fn predict(&self, request: PredictRequest) -> Result<FieldMap> {
        let prompt = render_prompt(request.signature, &request.program, &request.inputs);
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        let completion = self.call_api(&prompt, temperature).await?;
        parse_completion(request.signature, &completion)
    }
}
