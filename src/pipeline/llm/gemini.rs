use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::ModelApi;
use super::ModelApiError;
use crate::models::ModelPrompt;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Error bodies are cut to this many characters before they reach logs.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Google Gemini `generateContent` over blocking HTTP.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, ModelApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelApiError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self, ModelApiError> {
        Self::new(
            &config.api_base_url,
            &config.model,
            config.api_key(),
            config.request_timeout_secs,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl ModelApi for GeminiClient {
    fn send(&self, prompt: &ModelPrompt) -> Result<String, ModelApiError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.as_str(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ModelApiError::Timeout(format!("No response after {}s", self.timeout_secs))
                } else if e.is_connect() {
                    ModelApiError::Transport(format!("Cannot connect to {}", self.base_url))
                } else {
                    ModelApiError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().map_err(|e| {
            if e.is_timeout() {
                ModelApiError::Timeout(format!("Response body not received after {}s", self.timeout_secs))
            } else {
                ModelApiError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }

        parse_generate_response(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Map a non-2xx status (and its body) onto the error taxonomy.
pub fn classify_status(status: u16, body: &str) -> ModelApiError {
    let message = error_message(body);
    match status {
        429 => ModelApiError::RateLimited(message),
        408 | 504 => ModelApiError::Timeout(message),
        401 | 403 => ModelApiError::Unauthorized(message),
        // Gemini reports a bad key as 400 INVALID_ARGUMENT
        400 if message.contains("API key not valid") => ModelApiError::Unauthorized(message),
        500..=599 => ModelApiError::Server {
            status,
            body: message,
        },
        _ => ModelApiError::MalformedRequest {
            status,
            body: message,
        },
    }
}

/// Text of the first candidate. Safety blocks surface as `Blocked`.
pub fn parse_generate_response(body: &str) -> Result<String, ModelApiError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ModelApiError::Server {
            status: 200,
            body: format!("Unparseable model response: {e}"),
        })?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ModelApiError::Blocked(reason));
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(ModelApiError::Server {
            status: 200,
            body: "Model returned no candidates".into(),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if matches!(reason, "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "RECITATION") {
                return Err(ModelApiError::Blocked(reason.to_string()));
            }
        }
    }

    Ok(text)
}

fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    message.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
