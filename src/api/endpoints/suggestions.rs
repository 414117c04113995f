//! Prompt suggestions and document summaries.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DocumentPayload};
use crate::pipeline::{SuggestedPrompts, SummarySection};

const DEFAULT_SUGGESTION_COUNT: usize = 3;
const MAX_SUGGESTION_COUNT: usize = 10;

#[derive(Deserialize)]
pub struct SuggestionsBody {
    /// Without a document the static prompts are returned.
    pub document: Option<DocumentPayload>,
    pub count: Option<usize>,
}

#[derive(Deserialize)]
pub struct SummaryBody {
    pub document: DocumentPayload,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub sections: Vec<SummarySection>,
}

/// `POST /api/suggestions`: follow-up questions for the loaded document.
pub async fn suggestions(
    State(ctx): State<ApiContext>,
    Json(body): Json<SuggestionsBody>,
) -> Result<Json<SuggestedPrompts>, ApiError> {
    let Some(payload) = body.document else {
        return Ok(Json(SuggestedPrompts::defaults()));
    };
    let document = payload.into_document()?;
    let count = body
        .count
        .unwrap_or(DEFAULT_SUGGESTION_COUNT)
        .clamp(1, MAX_SUGGESTION_COUNT);

    let analyzer = ctx.analyzer.clone();
    let suggested = tokio::task::spawn_blocking(move || match analyzer.document_text(&document) {
        Ok(text) => analyzer.suggest_prompts(text, count),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot read document for suggestions, using defaults");
            SuggestedPrompts::defaults()
        }
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Suggestion task failed: {e}")))?;

    Ok(Json(suggested))
}

/// `POST /api/summary`: 3–5 key sections of the document.
pub async fn summary(
    State(ctx): State<ApiContext>,
    Json(body): Json<SummaryBody>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let document = body.document.into_document()?;

    let analyzer = ctx.analyzer.clone();
    let sections = tokio::task::spawn_blocking(move || -> Result<Vec<SummarySection>, ApiError> {
        let text = analyzer.document_text(&document)?;
        Ok(analyzer.summarize(text))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Summary task failed: {e}")))??;

    Ok(Json(SummaryResponse { sections }))
}
