//! Gemini `generateContent` client for hazard analysis.
//!
//! One request per analysis:
//! - prompt and media travel inline (base64, no data-URI prefix)
//! - the response is constrained to [`response_schema`](super::prompt::response_schema)
//! - no streaming and no automatic retries; retrying is a user action
//!
//! # Configuration
//!
//! Settings come from [`crate::config`]:
//! - `SAFEVISION_GEMINI_ENDPOINT`: REST base URL
//! - `SAFEVISION_GEMINI_MODEL`: Model name
//! - `SAFEVISION_API_KEY`: API key
//! - `SAFEVISION_REQUEST_TIMEOUT`: Total request timeout (seconds)
//! - `SAFEVISION_CONNECT_TIMEOUT`: Connection timeout (seconds)

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::prompt::{build_analysis_prompt, response_schema};
use super::types::{AnalysisError, AnalysisOutcome, AnalysisResult};
use crate::capture::CapturedMedia;
use crate::config;

/// Literal the provider puts in its message when the key's project is invalid
pub const ENTITY_NOT_FOUND_MARKER: &str = "Requested entity was not found";

/// Anything that can turn captured media into a hazard report
#[async_trait]
pub trait HazardAnalyzer: Send + Sync {
    async fn analyze(&self, media: &CapturedMedia) -> AnalysisOutcome<AnalysisResult>;
}

/// Configuration for the Gemini client
#[derive(Clone)]
pub struct GeminiConfig {
    /// REST base URL
    pub endpoint: String,
    /// Model name to use
    pub model: String,
    /// API key sent as `x-goog-api-key`
    pub api_key: Option<String>,
    /// Total request timeout (seconds)
    pub request_timeout: u64,
    /// Timeout for initial connection (seconds)
    pub connect_timeout: u64,
    /// Extra context appended to the prompt
    pub site_context: Option<String>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("site_context", &self.site_context)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            endpoint: cfg.gemini.endpoint.clone(),
            model: cfg.gemini.model.clone(),
            api_key: cfg.gemini.api_key.clone(),
            request_timeout: cfg.gemini.request_timeout,
            connect_timeout: cfg.gemini.connect_timeout,
            site_context: None,
        }
    }
}

impl GeminiConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }

    pub fn site_context(mut self, context: impl Into<String>) -> Self {
        self.site_context = Some(context.into());
        self
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.endpoint.trim_end_matches('/'), self.model)
    }
}

/// HTTP client for the hosted model
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> AnalysisOutcome<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> AnalysisOutcome<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(AnalysisError::MissingApiKey)
    }

    /// Check that the key can see the configured model.
    pub async fn check_model(&self) -> AnalysisOutcome<()> {
        let key = self.api_key()?;
        let response = self
            .http
            .get(self.config.model_url())
            .header("x-goog-api-key", key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(provider_error(status.as_u16(), &body))
    }

    async fn generate(&self, media: &CapturedMedia) -> AnalysisOutcome<AnalysisResult> {
        let key = self.api_key()?;
        let url = format!("{}:generateContent", self.config.model_url());
        let prompt = build_analysis_prompt(self.config.site_context.as_deref());
        let request = build_request(&prompt, media);

        tracing::debug!(
            model = %self.config.model,
            mime_type = %media.mime_type,
            bytes = media.len(),
            "sending analysis request"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(provider_error(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::InvalidSchema(format!("unreadable provider envelope: {}", e)))?;
        let text = parsed.text();
        if text.trim().is_empty() {
            if let Some(reason) = parsed.block_reason() {
                tracing::warn!(reason, "prompt blocked by provider");
            }
            return Err(AnalysisError::EmptyResponse);
        }

        parse_analysis_result(&text)
    }
}

#[async_trait]
impl HazardAnalyzer for GeminiClient {
    async fn analyze(&self, media: &CapturedMedia) -> AnalysisOutcome<AnalysisResult> {
        let result = self.generate(media).await;
        if let Err(e) = &result {
            tracing::error!("Hazard Analysis Error: {}", e);
        }
        result
    }
}

/// Build the `generateContent` request body
pub fn build_request(prompt: &str, media: &CapturedMedia) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": prompt },
                {
                    "inlineData": {
                        "mimeType": media.mime_type,
                        "data": media.to_base64()
                    }
                }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

/// Parse model text into a report. Every field is required.
///
/// A fenced ```json block is unwrapped first.
pub fn parse_analysis_result(text: &str) -> AnalysisOutcome<AnalysisResult> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    serde_json::from_str(trimmed).map_err(|e| AnalysisError::InvalidSchema(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop a language tag (`json`, `JSON`, ...) on the fence line.
    let rest = match rest.split_once('\n') {
        Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
        _ => match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        },
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Classify a provider message.
///
/// The provider has no structured code for an invalid key project, only the
/// literal [`ENTITY_NOT_FOUND_MARKER`] inside its message. Keep the match here
/// so it can be swapped for a code once one exists.
pub fn classify_provider_message(status: u16, message: String) -> AnalysisError {
    if message.contains(ENTITY_NOT_FOUND_MARKER) {
        AnalysisError::EntityNotFound(message)
    } else {
        AnalysisError::Provider { status, message }
    }
}

fn provider_error(status: u16, body: &str) -> AnalysisError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    classify_provider_message(status, message)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}
