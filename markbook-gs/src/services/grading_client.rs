//! Grading model API client
//!
//! Wraps the generative-model REST API for the three calls the service
//! makes: exam-code identification, exam grading, and answer-key text
//! extraction. Identification and extraction run on the fast model with
//! the thinking budget pinned to zero; grading runs on the full model
//! with a JSON response schema.

use crate::config::GradingConfig;
use crate::models::{ExamDocument, GradeReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

const USER_AGENT: &str = "Markbook/0.1.0 (grading service)";

/// Sentinel code label used when no exam code could be determined
pub const UNKNOWN_CODE: &str = "UNKNOWN";

const IDENTIFY_PROMPT: &str = "Read this exam paper and find the exam code. \
    Examples: SKE 1, SKE1, SKG 2. Return only the code string, with no \
    surrounding text. If no code is visible, return 'UNKNOWN'.";

const EXTRACT_PROMPT: &str =
    "Extract the answer key content from this document as plain text.";

/// Grading client errors
#[derive(Debug, Error)]
pub enum GradingError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Model response was not valid JSON, please retry: {0}")]
    ParseError(String),

    #[error("API key not configured")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Result of an exam-code identification call
///
/// The sentinel label is shared between "the model saw no code" and "the
/// call failed", so matching behaves identically for both; the variants
/// differ only in what the attempt records and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentificationOutcome {
    /// The model reported a code string (raw, untrimmed of inner spaces)
    Identified(String),
    /// The model reported the sentinel or returned no text
    Unidentified,
    /// The identification call itself failed
    Failed(String),
}

impl IdentificationOutcome {
    /// Code label handed to the matcher.
    pub fn label(&self) -> &str {
        match self {
            Self::Identified(code) => code,
            Self::Unidentified | Self::Failed(_) => UNKNOWN_CODE,
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, Self::Identified(_))
    }
}

// generateContent wire types (camelCase per the REST API)

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

impl GenerationConfig {
    /// Fast-model config: no thinking pass, plain text out.
    fn fast() -> Self {
        Self {
            response_mime_type: None,
            response_schema: None,
            thinking_config: Some(ThinkingConfig { thinking_budget: 0 }),
        }
    }

    /// Grading config: JSON output constrained by the report schema.
    fn grading() -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(grading_response_schema()),
            thinking_config: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Response schema sent with grading requests.
///
/// Skills and corrections stay optional at the schema level; the parser
/// enforces the required skill fields.
fn grading_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER" },
            "feedback": { "type": "STRING" },
            "skills": {
                "type": "OBJECT",
                "properties": {
                    "listening": { "type": "NUMBER" },
                    "reading": { "type": "NUMBER" },
                    "writing": { "type": "NUMBER" },
                    "speaking": { "type": "NUMBER" }
                }
            },
            "corrections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "status": { "type": "STRING" },
                        "text": { "type": "STRING" }
                    }
                }
            }
        },
        "required": ["score", "feedback", "skills"]
    })
}

/// Grading persona prompt with the answer key embedded.
fn build_grading_prompt(answer_key_content: &str) -> String {
    format!(
        r#"You are an English teacher at a language school.
TASK: Grade the student's exam paper against the ANSWER KEY.

ANSWER KEY:
"""
{answer_key_content}
"""

REQUIREMENTS:
1. Compare the student's answers with the ANSWER KEY.
2. Compute an overall score (0-100).
3. Write short feedback addressed to the student.
4. Break the score down into the 4 skills (0-100): listening, reading, writing, speaking.
5. List corrections: record each question, its status (correct/incorrect) and a short explanation.

IMPORTANT: Return pure JSON matching the schema only. Do not add any text outside the JSON."#
    )
}

/// Rate limiter for outbound model calls
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Model rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Grading model API client
pub struct GradingClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
    api_base_url: String,
    grading_model: String,
    fast_model: String,
}

impl GradingClient {
    pub fn new(config: &GradingConfig) -> Result<Self, GradingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GradingError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(config.min_request_interval_ms)),
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            grading_model: config.grading_model.clone(),
            fast_model: config.fast_model.clone(),
        })
    }

    /// Whether an API key was configured at startup.
    ///
    /// The pipeline fails attempts up front when no key exists, instead
    /// of letting them die mid-workflow on the first model call.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Identify the exam-variant code printed on a paper.
    ///
    /// Never returns an error: failures collapse into the sentinel label
    /// so a flaky identification call cannot abort an attempt before
    /// matching has had its say.
    pub async fn identify_exam_code(&self, doc: &ExamDocument) -> IdentificationOutcome {
        let parts = vec![
            Part::text(IDENTIFY_PROMPT),
            Part::inline(&doc.mime_type, &doc.data),
        ];

        match self
            .generate(&self.fast_model, parts, Some(GenerationConfig::fast()))
            .await
        {
            Ok(response) => {
                let text = Self::extract_text(&response).unwrap_or_default();
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed == UNKNOWN_CODE {
                    IdentificationOutcome::Unidentified
                } else {
                    IdentificationOutcome::Identified(trimmed.to_string())
                }
            }
            Err(e) => {
                warn!("Exam code identification failed: {}", e);
                IdentificationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Grade one exam document against answer key content.
    pub async fn grade_exam(
        &self,
        doc: &ExamDocument,
        answer_key_content: &str,
    ) -> Result<GradeReport, GradingError> {
        let prompt = build_grading_prompt(answer_key_content);
        let parts = vec![Part::text(prompt), Part::inline(&doc.mime_type, &doc.data)];

        let response = self
            .generate(
                &self.grading_model,
                parts,
                Some(GenerationConfig::grading()),
            )
            .await?;

        // Absent text degrades to an empty object, which fails parsing
        // with a retryable error rather than a scoreless report
        let raw_text = Self::extract_text(&response).unwrap_or_else(|| "{}".to_string());
        GradeReport::from_model_text(&raw_text).map_err(|e| {
            error!("Grade report parse failed on raw text: {}", raw_text);
            GradingError::ParseError(e.to_string())
        })
    }

    /// Extract answer key content from an uploaded document as plain text.
    ///
    /// An empty extraction is a success; the caller decides whether an
    /// empty key is useful.
    pub async fn extract_answer_key(&self, doc: &ExamDocument) -> Result<String, GradingError> {
        let parts = vec![
            Part::text(EXTRACT_PROMPT),
            Part::inline(&doc.mime_type, &doc.data),
        ];

        let response = self
            .generate(&self.fast_model, parts, Some(GenerationConfig::fast()))
            .await?;

        Ok(Self::extract_text(&response).unwrap_or_default())
    }

    async fn generate(
        &self,
        model: &str,
        parts: Vec<Part>,
        generation_config: Option<GenerationConfig>,
    ) -> Result<GenerateContentResponse, GradingError> {
        if self.api_key.trim().is_empty() {
            return Err(GradingError::MissingApiKey);
        }

        // Rate limit
        self.rate_limiter.wait().await;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url, model
        );
        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config,
        };

        debug!(model = model, "Calling generateContent");

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| GradingError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(GradingError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GradingError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| GradingError::ParseError(e.to_string()))
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let parts = &response.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
