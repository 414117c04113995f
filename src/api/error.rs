//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::llm::CallError;
use crate::pipeline::{AnalysisError, PromptError};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Nothing to analyze")]
    EmptyInput,
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Model rejected the request: {0}")]
    ModelRejected(String),
    #[error("Model unavailable after {attempts} attempts")]
    ModelUnavailable { attempts: u32 },
    #[error("Model did not answer in time ({attempts} attempts)")]
    ModelTimeout { attempts: u32 },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::EmptyInput => (
                StatusCode::BAD_REQUEST,
                "EMPTY_INPUT",
                "Please upload a document, paste text, or enter a question.".to_string(),
            ),
            ApiError::UnsupportedFormat(format) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FORMAT",
                format!("Unsupported document format '{format}'. Use PDF, TXT, HTML, DOCX or XLSX."),
            ),
            ApiError::CorruptDocument(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CORRUPT_DOCUMENT",
                format!("The document could not be read: {detail}"),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::ModelRejected(detail) => (StatusCode::BAD_GATEWAY, "MODEL_ERROR", detail.clone()),
            ApiError::ModelUnavailable { attempts } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODEL_UNAVAILABLE",
                format!("The model service is busy ({attempts} attempts). Please try again later."),
            ),
            ApiError::ModelTimeout { attempts } => (
                StatusCode::GATEWAY_TIMEOUT,
                "MODEL_TIMEOUT",
                format!("The model did not answer in time ({attempts} attempts). Please try again later."),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat(format) => ApiError::UnsupportedFormat(format),
            ExtractionError::CorruptDocument(detail) => ApiError::CorruptDocument(detail),
        }
    }
}

impl From<PromptError> for ApiError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::EmptyInput => ApiError::EmptyInput,
            other @ PromptError::DocumentCount { .. } => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<CallError> for ApiError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Fatal(e) => ApiError::ModelRejected(e.to_string()),
            CallError::ExhaustedRetries { attempts, .. } => ApiError::ModelUnavailable { attempts },
            CallError::Timeout { attempts, .. } => ApiError::ModelTimeout { attempts },
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Prompt(e) => e.into(),
            AnalysisError::Extraction(e) => e.into(),
            AnalysisError::Call(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::ModelApiError;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn empty_input_returns_400() {
        let response = ApiError::from(PromptError::EmptyInput).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "EMPTY_INPUT");
    }

    #[tokio::test]
    async fn extraction_errors_map_to_415_and_422() {
        let unsupported = ApiError::from(ExtractionError::UnsupportedFormat("pptx".into()));
        assert_eq!(unsupported.into_response().status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let corrupt = ApiError::from(ExtractionError::CorruptDocument("bad zip".into()));
        assert_eq!(corrupt.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn exhausted_retries_returns_503_try_later() {
        let err: ApiError = AnalysisError::Call(CallError::ExhaustedRetries {
            attempts: 5,
            last: ModelApiError::RateLimited("quota".into()),
        })
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "MODEL_UNAVAILABLE");
        assert!(json["error"]["message"].as_str().unwrap().contains("try again later"));
    }

    #[tokio::test]
    async fn fatal_returns_502_and_timeout_504() {
        let fatal = ApiError::from(CallError::Fatal(ModelApiError::Unauthorized("bad key".into())));
        assert_eq!(fatal.into_response().status(), StatusCode::BAD_GATEWAY);

        let timeout = ApiError::from(CallError::Timeout {
            elapsed: std::time::Duration::from_secs(3),
            attempts: 2,
            last: ModelApiError::Timeout("slow".into()),
        });
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn document_count_is_bad_request() {
        let err = ApiError::from(PromptError::DocumentCount {
            mode: crate::models::AnalysisMode::Compare,
            expected: 2,
            actual: 1,
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("join error".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["message"], "An internal error occurred");
    }
}
