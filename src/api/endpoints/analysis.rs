//! Single-document analysis and two-document comparison.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{parse_language, ApiContext, DocumentPayload};
use crate::models::{AnalysisMode, AnalysisRequest, Document};
use crate::pipeline::AnalysisOutcome;

#[derive(Deserialize)]
pub struct AnalyzeBody {
    pub document: DocumentPayload,
    #[serde(default)]
    pub prompt: String,
    pub language: Option<String>,
    /// Overall budget for the model call, retries included.
    pub deadline_secs: Option<u64>,
}

#[derive(Deserialize)]
pub struct CompareBody {
    pub documents: Vec<DocumentPayload>,
    #[serde(default)]
    pub prompt: String,
    pub language: Option<String>,
    pub deadline_secs: Option<u64>,
}

/// `POST /api/analyze`: answer a question about one document.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let document = Arc::new(body.document.into_document()?);
    let request = AnalysisRequest::single(document, body.prompt)
        .with_language(parse_language(body.language.as_deref()));
    run(ctx, request, body.deadline_secs).await
}

/// `POST /api/compare`: answer a comparative question about two documents.
pub async fn compare(
    State(ctx): State<ApiContext>,
    Json(body): Json<CompareBody>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let documents = body
        .documents
        .into_iter()
        .map(|payload| payload.into_document().map(Arc::new))
        .collect::<Result<Vec<Arc<Document>>, ApiError>>()?;

    let request = AnalysisRequest {
        mode: AnalysisMode::Compare,
        documents,
        user_prompt: body.prompt,
        language: parse_language(body.language.as_deref()),
    };
    run(ctx, request, body.deadline_secs).await
}

async fn run(
    ctx: ApiContext,
    request: AnalysisRequest,
    deadline_secs: Option<u64>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let analyzer = ctx.analyzer.clone();
    let deadline = deadline_secs.map(Duration::from_secs);

    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&request, deadline))
        .await
        .map_err(|e| ApiError::Internal(format!("Analysis task failed: {e}")))??;

    Ok(Json(outcome))
}
